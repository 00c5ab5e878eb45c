//! Phase 1: Employee roster
//!
//! Generates the roster in sequential batches. The first batch carries every
//! leader (the rank-1 executive and one rank-2 director per team); later
//! batches are staff only. The names already in use are threaded through the
//! batches so each prompt can steer the model away from collisions, and any
//! collision that still slips through is renamed locally.
//!
//! After merging, user ids and department ids are generated locally, the
//! roster is validated and written to the `Roster` store.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use org_synth_sdk::{log_file_saved, log_info, log_state_file, log_warning};

use crate::config::{OrganizationConfig, SynthConfig};
use crate::synth::prompts::{self, LeaderSlots};
use crate::synth::store::{write_employees, StoreStage};
use crate::synth::types::{Employee, Rank};
use crate::synth::validate::{enforce, validate_employees, OnViolation};
use crate::workflow_utils::{fold_batches, plan_batches, CallSpec, ExtractMode, RetryingCaller};

#[derive(Debug, Deserialize)]
struct EmployeeBatchResponse {
    employees: Vec<GeneratedEmployee>,
}

#[derive(Debug, Deserialize)]
struct GeneratedEmployee {
    name: String,
    team: String,
    rank: i64,
    title: String,
}

// ============================================================================
// Local name generation
// ============================================================================

const SURNAMES: &str = "王李张刘陈杨黄赵吴周徐孙马朱胡郭何高林罗郑梁谢宋唐许韩冯邓曹\
彭曾肖田董袁潘于蒋蔡余杜叶程苏魏吕丁任沈姚卢姜崔钟谭陆汪范金\
石廖贾夏韦付方白邹孟熊秦邱江尹薛闫段雷侯龙史陶黎贺顾毛郝龚邵\
万钱严覃武戴莫孔向汤";

const GIVEN_CHARS: &str = "伟芳娜秀敏静丽强磊军洋勇艳杰涛明超娟英华慧巧美倩妮莉峰辉\
刚平鹏宇晨帆航凯斌文博浩昊然睿轩宸泽瑞琪瑶萱怡涵晴雪梦婷欣\
雨馨悦诗嘉颖洁雅薇莹佳思宏建国志东波鑫亮玲红霞春兰燕云新琳\
婕晗曦羽昕妍彤萌蕾璐";

const NAME_ATTEMPTS: usize = 1000;

fn pick(chars: &[char], rng: &mut StdRng) -> char {
    chars[rng.gen_range(0..chars.len())]
}

/// A random Chinese name whose lowercase form is not in `taken`.
///
/// Surname plus one or two given-name characters (two in 70% of draws);
/// after [`NAME_ATTEMPTS`] collisions a numeric suffix is appended.
pub fn generate_chinese_name(taken: &HashSet<String>, rng: &mut StdRng) -> String {
    let surnames: Vec<char> = SURNAMES.chars().collect();
    let given: Vec<char> = GIVEN_CHARS.chars().collect();

    for _ in 0..NAME_ATTEMPTS {
        let mut name = String::new();
        name.push(pick(&surnames, rng));
        name.push(pick(&given, rng));
        if rng.gen_bool(0.7) {
            name.push(pick(&given, rng));
        }
        if !taken.contains(&name.to_lowercase()) {
            return name;
        }
    }

    let base = format!("{}{}", pick(&surnames, rng), pick(&given, rng));
    let mut suffix = 1;
    loop {
        let name = format!("{}{}", base, suffix);
        if !taken.contains(&name.to_lowercase()) {
            return name;
        }
        suffix += 1;
    }
}

/// Accumulator carried from batch to batch
pub struct NameState {
    /// Names in claim order, shown to the model
    pub used: Vec<String>,
    keys: HashSet<String>,
    rng: StdRng,
}

impl NameState {
    pub fn new(rng: StdRng) -> Self {
        Self {
            used: Vec::new(),
            keys: HashSet::new(),
            rng,
        }
    }

    /// Claim `name`, or a fresh generated name when it is empty or taken
    pub fn claim(&mut self, name: &str) -> String {
        let name = name.trim();
        let claimed = if name.is_empty() || self.keys.contains(&name.to_lowercase()) {
            let renamed = generate_chinese_name(&self.keys, &mut self.rng);
            log_warning!("Duplicate name '{}' renamed to '{}'", name, renamed);
            renamed
        } else {
            name.to_string()
        };
        self.keys.insert(claimed.to_lowercase());
        self.used.push(claimed.clone());
        claimed
    }

    pub fn into_rng(self) -> StdRng {
        self.rng
    }
}

// ============================================================================
// Ids
// ============================================================================

const ID_ATTEMPTS: usize = 10_000;

fn random_id(alphabet: &[char], length: usize, taken: &HashSet<String>, rng: &mut StdRng) -> Result<String> {
    for _ in 0..ID_ATTEMPTS {
        let id: String = (0..length).map(|_| pick(alphabet, rng)).collect();
        if !taken.contains(&id) {
            return Ok(id);
        }
    }
    anyhow::bail!(
        "could not generate a unique id of length {} after {} attempts",
        length,
        ID_ATTEMPTS
    )
}

/// Give every employee a unique user id and every team a unique department id.
///
/// Returns the team to department id mapping. Teams the model invented get
/// an id as well so no record is left without one.
pub fn assign_ids(
    employees: &mut [Employee],
    org: &OrganizationConfig,
    rng: &mut StdRng,
) -> Result<BTreeMap<String, String>> {
    let alphabet: Vec<char> = org.id_alphabet.chars().collect();
    if alphabet.is_empty() {
        anyhow::bail!("id alphabet is empty");
    }

    let mut dept_ids: BTreeMap<String, String> = BTreeMap::new();
    let mut taken_dept = HashSet::new();
    let teams = org
        .teams
        .iter()
        .chain(std::iter::once(&org.executive_team))
        .cloned()
        .chain(employees.iter().map(|e| e.team.clone()));
    for team in teams {
        if dept_ids.contains_key(&team) {
            continue;
        }
        let id = random_id(&alphabet, org.dept_id_length, &taken_dept, rng)?;
        taken_dept.insert(id.clone());
        dept_ids.insert(team, id);
    }

    let mut taken_user = HashSet::new();
    for employee in employees.iter_mut() {
        let id = random_id(&alphabet, org.user_id_length, &taken_user, rng)?;
        taken_user.insert(id.clone());
        employee.user_id = id;
        employee.dept_id = dept_ids.get(&employee.team).cloned().unwrap_or_default();
    }
    Ok(dept_ids)
}

// ============================================================================
// Generation
// ============================================================================

/// Generate, merge and identify the whole roster; does not validate or write
pub async fn generate_employees(
    config: &SynthConfig,
    caller: &RetryingCaller,
    rng: StdRng,
) -> Result<(Vec<Employee>, StdRng)> {
    let org = &config.organization;
    let total = org.total_employees;
    let leaders = config.leader_count();
    let batch_size = config.generation.employee_batch_size;
    let plan = plan_batches(total, batch_size, Some(batch_size.max(leaders)));

    log_info!(
        "Generating {} employees in {} batches of up to {}",
        total,
        plan.len(),
        batch_size
    );

    let (merged, state) = fold_batches(
        1,
        &plan,
        config.generation.batch_pause(),
        NameState::new(rng),
        |e: &Employee| e.name.to_lowercase(),
        move |ctx, mut state| async move {
            let leader_slots = ctx.is_first().then(|| LeaderSlots {
                rank_1: org.rank_counts.rank_1,
                executive_team: &org.executive_team,
                rank_2: org.rank_counts.rank_2,
            });
            let prompt = prompts::employee_batch(
                ctx.batch_number,
                ctx.size(),
                &org.teams,
                &state.used,
                leader_slots,
            );
            let task_id = format!("employees_batch_{}", ctx.batch_number);
            let response: EmployeeBatchResponse = caller
                .call(CallSpec {
                    task_id: &task_id,
                    system: prompts::HR_EXPERT,
                    prompt: &prompt,
                    mode: ExtractMode::Strict,
                })
                .await?;

            if response.employees.len() != ctx.size() {
                log_warning!(
                    "Batch {} returned {} employees, expected {}",
                    ctx.batch_number,
                    response.employees.len(),
                    ctx.size()
                );
            }

            let mut records = Vec::with_capacity(response.employees.len());
            for generated in response.employees {
                let rank = match u8::try_from(generated.rank)
                    .map_err(|e| e.to_string())
                    .and_then(Rank::try_from)
                {
                    Ok(rank) => rank,
                    Err(e) => {
                        log_warning!("Dropping '{}': {}", generated.name, e);
                        continue;
                    }
                };
                let name = state.claim(&generated.name);
                let team = if rank == Rank::Executive {
                    org.executive_team.clone()
                } else {
                    generated.team.trim().to_string()
                };
                records.push(Employee {
                    name,
                    user_id: String::new(),
                    team,
                    dept_id: String::new(),
                    rank,
                    title: generated.title.trim().to_string(),
                    hard_skills: Vec::new(),
                    communication_style: None,
                });
            }
            Ok::<_, anyhow::Error>((records, state))
        },
    )
    .await
    .context("Employee generation aborted")?;

    if merged.len() != total {
        log_warning!("Merged {} employees, expected {}", merged.len(), total);
    }

    let mut rng = state.into_rng();
    let mut employees = merged.into_items();
    let dept_ids = assign_ids(&mut employees, org, &mut rng)?;
    for (team, id) in &dept_ids {
        log_info!("  {}: {}", team, id);
    }
    Ok((employees, rng))
}

/// Run Phase 1 end to end; returns the roster and the store path
pub async fn run(
    config: &SynthConfig,
    caller: &RetryingCaller,
    rng: StdRng,
) -> Result<(Vec<Employee>, StdRng, PathBuf)> {
    let (employees, rng) = generate_employees(config, caller, rng).await?;

    let policy = if config.generation.strict_validation {
        OnViolation::Abort
    } else {
        OnViolation::Warn
    };
    enforce(
        "employee roster",
        &validate_employees(&employees, config),
        policy,
    )
    .context("Employee roster failed validation")?;

    let path = config.output.roster_path();
    write_employees(&path, &employees, StoreStage::Roster)?;
    log_file_saved!(path.display());
    log_state_file!(1, path.display(), "Employee roster");

    Ok((employees, rng, path))
}
