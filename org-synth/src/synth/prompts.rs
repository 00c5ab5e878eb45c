//! Prompt builders and system roles for every generation call
//!
//! Each builder embeds the data the model needs as JSON and ends with the
//! exact response shape the caller decodes.

use serde::Serialize;

use crate::config::{CountRange, SkillCountByRank, TeamSizeBounds, TimelineWindow};
use crate::synth::store::format_hard_skills;
use crate::synth::style_universe::STYLE_DIMENSIONS;
use crate::synth::types::{
    Employee, MajorTopic, Phase, ProjectDocument, ProjectMember, Rank, StyleVector, SubTopic,
};

pub const HR_EXPERT: &str = "你是一位专业的人力资源专家。请严格按照要求输出 JSON 格式的数据。";
pub const SKILL_EXPERT: &str = "你是一位专业的人才技能评估专家。请严格按照要求输出 JSON 格式的数据。";
pub const ORG_BEHAVIOR_EXPERT: &str = "你是一位专业的组织行为学专家。";
pub const PROJECT_EXPERT: &str =
    "你是一位专业的项目管理和组织架构专家，擅长任务拆解和团队协作。请严格按照要求输出 JSON 格式的数据。";
pub const TIMELINE_EXPERT: &str = "你是一位专业的项目管理专家。";

const JSON_ONLY: &str = "重要：只返回JSON数据，不要其他文字。";

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[derive(Serialize)]
struct EmployeeView<'a> {
    name: &'a str,
    team: &'a str,
    rank: Rank,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hard_skills: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    communication_style: Option<&'a StyleVector>,
}

impl<'a> EmployeeView<'a> {
    fn basic(e: &'a Employee) -> Self {
        Self {
            name: &e.name,
            team: &e.team,
            rank: e.rank,
            title: &e.title,
            hard_skills: None,
            communication_style: None,
        }
    }

    fn full(e: &'a Employee) -> Self {
        Self {
            hard_skills: Some(format_hard_skills(&e.hard_skills)),
            communication_style: e.communication_style.as_ref(),
            ..Self::basic(e)
        }
    }

    fn member(m: &'a ProjectMember) -> Self {
        Self {
            name: &m.user_name,
            team: &m.team,
            rank: m.rank,
            title: &m.title,
            hard_skills: Some(format_hard_skills(&m.hard_skills)),
            communication_style: Some(&m.communication_style),
        }
    }
}

fn phase_list() -> String {
    Phase::ALL
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}", i + 1, p.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn style_guide() -> String {
    STYLE_DIMENSIONS
        .iter()
        .map(|d| {
            format!(
                "- {}（{}）：{} / {} / {}",
                d.dimension,
                d.description,
                d.levels.high.label,
                d.levels.medium.label,
                d.levels.low.label
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Phases 1-3
// ============================================================================

/// Leaders the first employee batch must carry
pub struct LeaderSlots<'a> {
    pub rank_1: usize,
    pub executive_team: &'a str,
    pub rank_2: usize,
}

pub fn employee_batch(
    batch_number: usize,
    size: usize,
    teams: &[String],
    existing_names: &[String],
    leaders: Option<LeaderSlots<'_>>,
) -> String {
    let existing = if existing_names.is_empty() {
        "无".to_string()
    } else {
        existing_names.join(", ")
    };
    let composition = match leaders {
        Some(l) => format!(
            "- {} 名 Rank 1：公司最高领导，部门为「{}」\n- {} 名 Rank 2：每个部门恰好 1 人\n- {} 名 Rank 3：合理分配到各部门",
            l.rank_1,
            l.executive_team,
            l.rank_2,
            size.saturating_sub(l.rank_1 + l.rank_2)
        ),
        None => format!("- {} 名 Rank 3 普通员工，合理分配到各部门", size),
    };

    format!(
        r#"请为一家中国科技公司生成员工信息。这是第 {batch} 批，共需 {size} 名员工：
{composition}

部门列表：{teams}
已生成的员工姓名（不得重复）：{existing}

要求：姓名为真实且多样的中文姓名，职位与部门匹配。

输出格式：
{{"employees": [{{"name": "王芳", "team": "技术研发部", "rank": 3, "title": "高级软件工程师"}}]}}

{json_only}生成恰好 {size} 名员工。"#,
        batch = batch_number,
        size = size,
        composition = composition,
        teams = teams.join(", "),
        existing = existing,
        json_only = JSON_ONLY
    )
}

pub fn skill_universe(titles: &[String], teams: &[String], size: CountRange) -> String {
    format!(
        r#"请根据公司的部门与职位，构建一个硬技能全集。

部门：{teams}
职位：{titles}

要求：
1. 技能总数在 {min} 到 {max} 个之间
2. 技能之间互斥：不得出现重复，也不得出现父子关系（如 Python 与 Python3）
3. 覆盖所有职位所需的核心技能

输出格式：
{{"skill_universe": [{{"category": "软件开发", "skills": ["Java", "Kubernetes"]}}]}}

{json_only}"#,
        teams = teams.join(", "),
        titles = titles.join(", "),
        min = size.min,
        max = size.max,
        json_only = JSON_ONLY
    )
}

pub fn skill_assignment(
    employees: &[&Employee],
    universe: &[String],
    bounds: &SkillCountByRank,
) -> String {
    let views: Vec<_> = employees.iter().map(|e| EmployeeView::basic(e)).collect();
    format!(
        r#"请为以下员工分配硬技能。

技能全集（只能从中选择）：
{universe}

员工：
{employees}

要求：
1. 技能数量：Rank 1 为 {r1min}-{r1max} 个，Rank 2 为 {r2min}-{r2max} 个，Rank 3 为 {r3min}-{r3max} 个
2. 熟练度只能是 strong、medium、low 之一，每人至少一项 strong
3. 同一员工不得重复技能

输出格式：
{{"assignments": [{{"name": "王芳", "hard_skills": [{{"skill": "Java", "level": "strong"}}]}}]}}

{json_only}"#,
        universe = to_json(universe),
        employees = to_json(&views),
        r1min = bounds.rank_1.min,
        r1max = bounds.rank_1.max,
        r2min = bounds.rank_2.min,
        r2max = bounds.rank_2.max,
        r3min = bounds.rank_3.min,
        r3max = bounds.rank_3.max,
        json_only = JSON_ONLY
    )
}

pub fn style_assignment(employees: &[&Employee]) -> String {
    let views: Vec<_> = employees.iter().map(|e| EmployeeView::full(e)).collect();
    format!(
        r#"请根据员工的职级、职位与技能，推断其沟通风格。

沟通风格维度（每个维度只能取所列三个值之一，大小写必须一致）：
{guide}

员工：
{employees}

输出格式：
{{"assignments": [{{"name": "王芳", "communication_style": {{"Formality": "Semi-formal"}}, "reasoning": "..."}}]}}

每位员工必须包含全部 8 个维度。{json_only}"#,
        guide = style_guide(),
        employees = to_json(&views),
        json_only = JSON_ONLY
    )
}

// ============================================================================
// Phase 4: chain variant
// ============================================================================

/// Topic and description of an earlier project in the chain
pub struct ProjectHistory<'a> {
    pub project_number: u32,
    pub topic: &'a str,
    pub description: &'a str,
}

pub fn project_topic(
    project_number: u32,
    team: &[ProjectMember],
    history: &[ProjectHistory<'_>],
) -> String {
    let views: Vec<_> = team.iter().map(EmployeeView::member).collect();
    let history = if history.is_empty() {
        "无（这是第一个项目）".to_string()
    } else {
        history
            .iter()
            .map(|h| format!("- Project {}：{}（{}）", h.project_number, h.topic, h.description))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        r#"请为第 {number} 个项目确定主题。

已有项目：
{history}

当前团队：
{team}

要求：主题与团队能力匹配，且与已有项目形成延续但不重复。

输出格式：
{{"project_topic": "...", "project_description": "..."}}

{json_only}"#,
        number = project_number,
        history = history,
        team = to_json(&views),
        json_only = JSON_ONLY
    )
}

pub fn member_adjustment(
    topic: &str,
    description: &str,
    team: &[ProjectMember],
    pool: &[Employee],
    bounds: &TeamSizeBounds,
) -> String {
    let team_names: Vec<&str> = team.iter().map(|m| m.user_name.as_str()).collect();
    let pool: Vec<_> = pool.iter().map(EmployeeView::full).collect();
    format!(
        r#"新项目「{topic}」：{description}

当前团队成员：{team}

可选员工：
{pool}

请调整团队成员以适配新项目。调整后团队规模在 {min} 到 {max} 人之间，至少 {r1} 名 Rank 1 与 {r2} 名 Rank 2。

输出格式：
{{"member_adjustments": {{"keep_members": ["..."], "add_members": [{{"user_name": "...", "reason": "..."}}], "remove_members": [{{"user_name": "...", "reason": "..."}}]}}}}

{json_only}"#,
        topic = topic,
        description = description,
        team = team_names.join(", "),
        pool = to_json(&pool),
        min = bounds.min,
        max = bounds.max,
        r1 = bounds.rank_1_min,
        r2 = bounds.rank_2_min,
        json_only = JSON_ONLY
    )
}

pub fn style_adjustment(topic: &str, description: &str, team: &[ProjectMember]) -> String {
    let views: Vec<_> = team.iter().map(EmployeeView::member).collect();
    let seniors = team.iter().filter(|m| m.rank.is_leader()).count();
    format!(
        r#"项目「{topic}」：{description}
团队规模 {size} 人，其中 Rank 1/2 共 {seniors} 人。

请根据团队规模与上下级构成，调整每位成员在本项目中的沟通风格。

沟通风格维度：
{guide}

成员：
{team}

输出格式：
{{"adjusted_styles": [{{"user_name": "...", "adjusted_style": {{"Formality": "Formal"}}}}]}}

{json_only}"#,
        topic = topic,
        description = description,
        size = team.len(),
        seniors = seniors,
        guide = style_guide(),
        team = to_json(&views),
        json_only = JSON_ONLY
    )
}

pub fn task_breakdown(
    topic: &str,
    description: &str,
    team: &[ProjectMember],
    min_per_member: usize,
) -> String {
    let views: Vec<_> = team.iter().map(EmployeeView::member).collect();
    format!(
        r#"项目「{topic}」：{description}

团队成员：
{team}

请将项目拆解为细粒度子任务并分配给成员。每位成员至少 {min} 个子任务，任务需匹配其技能与职级。

输出格式：
{{"task_assignments": [{{"user_name": "...", "subtasks": [{{"subtask": "...", "required_skills": ["..."], "communication_requirements": "..."}}]}}]}}

{json_only}"#,
        topic = topic,
        description = description,
        team = to_json(&views),
        min = min_per_member,
        json_only = JSON_ONLY
    )
}

// ============================================================================
// Phase 4: topics variant
// ============================================================================

pub fn major_topics(count: usize, teams: &[String]) -> String {
    format!(
        r#"请为一家拥有以下部门的科技公司规划 {count} 个年度重点业务主题：{teams}

主题之间互不重叠，覆盖不同业务方向。

输出格式：
{{"major_topics": [{{"topic": "...", "description": "..."}}]}}

{json_only}"#,
        count = count,
        teams = teams.join(", "),
        json_only = JSON_ONLY
    )
}

pub fn sub_topics(major: &MajorTopic, count: usize) -> String {
    format!(
        r#"重点主题「{topic}」：{description}

请将其拆分为 {count} 个可独立立项的子主题，每个子主题由一个团队独立完成。

输出格式：
{{"sub_topics": [{{"topic": "...", "description": "...", "reasoning": "..."}}]}}

{json_only}"#,
        topic = major.topic,
        description = major.description,
        count = count,
        json_only = JSON_ONLY
    )
}

pub fn team_selection(sub_topic: &SubTopic, pool: &[Employee], bounds: &TeamSizeBounds) -> String {
    let pool: Vec<_> = pool.iter().map(EmployeeView::full).collect();
    format!(
        r#"子主题「{topic}」：{description}

可选员工：
{pool}

请为该子主题组建团队：{min} 到 {max} 人，至少 {r1} 名 Rank 1 与 {r2} 名 Rank 2。

输出格式：
{{"selected_members": [{{"user_name": "...", "selection_reason": "..."}}], "team_summary": "..."}}

{json_only}"#,
        topic = sub_topic.topic,
        description = sub_topic.description,
        pool = to_json(&pool),
        min = bounds.min,
        max = bounds.max,
        r1 = bounds.rank_1_min,
        r2 = bounds.rank_2_min,
        json_only = JSON_ONLY
    )
}

pub fn subtask_generation(sub_topic: &SubTopic, team: &[ProjectMember], min_total: usize) -> String {
    let views: Vec<_> = team.iter().map(EmployeeView::member).collect();
    format!(
        r#"子主题「{topic}」：{description}

团队成员：
{team}

请生成至少 {min} 个细粒度子任务，每个子任务标注所属阶段，阶段只能是：
{phases}

输出格式：
{{"subtasks": [{{"subtask": "...", "phase": "Strategy & Planning", "required_skills": ["..."], "reasoning": "..."}}]}}

{json_only}"#,
        topic = sub_topic.topic,
        description = sub_topic.description,
        team = to_json(&views),
        min = min_total,
        phases = phase_list(),
        json_only = JSON_ONLY
    )
}

#[derive(Serialize)]
pub struct SubtaskDraft {
    pub subtask: String,
    pub phase: Option<Phase>,
    pub required_skills: Vec<String>,
}

pub fn subtask_assignment(
    sub_topic: &SubTopic,
    team: &[ProjectMember],
    subtasks: &[SubtaskDraft],
    min_per_member: usize,
) -> String {
    let views: Vec<_> = team.iter().map(EmployeeView::member).collect();
    format!(
        r#"子主题「{topic}」：{description}

团队成员：
{team}

待分配子任务：
{subtasks}

请把全部子任务分配给团队成员：每个子任务恰好分配给一人，每位成员至少 {min} 个。

输出格式：
{{"task_assignments": [{{"user_name": "...", "assigned_subtasks": [{{"subtask": "...", "phase": "...", "required_skills": ["..."], "assignment_reason": "..."}}]}}]}}

{json_only}"#,
        topic = sub_topic.topic,
        description = sub_topic.description,
        team = to_json(&views),
        subtasks = to_json(subtasks),
        min = min_per_member,
        json_only = JSON_ONLY
    )
}

// ============================================================================
// Phase 5
// ============================================================================

#[derive(Serialize)]
struct TimelineTaskView<'a> {
    subtask_id: u32,
    user_name: &'a str,
    rank: Rank,
    subtask: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<Phase>,
    required_skills: &'a [String],
}

pub fn timeline(document: &ProjectDocument, window: &TimelineWindow) -> String {
    let tasks: Vec<_> = document
        .subtasks()
        .map(|(m, s)| TimelineTaskView {
            subtask_id: s.subtask_id,
            user_name: &m.user_name,
            rank: m.rank,
            subtask: &s.subtask,
            phase: s.phase,
            required_skills: &s.required_skills,
        })
        .collect();
    let total = tasks.len();

    format!(
        r#"# 项目信息
- 编号：{id}
- 名称：{topic}
- 描述：{description}
- 时间范围：{start} 至 {end}
- 任务总数：{total}

# 任务列表
{tasks}

请为每个子任务分配截止日期：
1. 按阶段推进：{phases}
2. 同一职级中，较早阶段的任务截止日期不得晚于较晚阶段的任务
3. 所有日期在 {start} 到 {end} 之间，格式 YYYY-MM-DD
4. 每个 subtask_id 恰好出现一次，不得遗漏

输出格式：
{{"task_timeline": [{{"subtask_id": 1, "user_name": "...", "deadline": "{start}", "phase": "...", "reasoning": "..."}}], "timeline_summary": {{"start_date": "{start}", "end_date": "{end}", "total_tasks": {total}}}}}

task_timeline 必须包含全部 {total} 个子任务。{json_only}"#,
        id = document.identifier(),
        topic = document.topic(),
        description = document.description(),
        start = window.start,
        end = window.end,
        total = total,
        tasks = to_json(&tasks),
        phases = Phase::ALL
            .iter()
            .map(|p| p.label())
            .collect::<Vec<_>>()
            .join(" → "),
        json_only = JSON_ONLY
    )
}
