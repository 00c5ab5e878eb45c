//! The fixed communication-style universe
//!
//! Eight dimensions, three ranked levels each. Hardcoded, never generated;
//! used as the generation guide in prompts and as the vocabulary the style
//! validators check against.

use serde::Serialize;
use std::collections::BTreeMap;

use super::types::StyleVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleLevel {
    pub label: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleLevels {
    pub high: StyleLevel,
    pub medium: StyleLevel,
    pub low: StyleLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleDimension {
    pub dimension: &'static str,
    pub description: &'static str,
    pub levels: StyleLevels,
}

impl StyleDimension {
    /// Labels ordered high, medium, low
    pub fn labels(&self) -> [&'static str; 3] {
        [
            self.levels.high.label,
            self.levels.medium.label,
            self.levels.low.label,
        ]
    }

    /// Exact, case-sensitive vocabulary check
    pub fn allows(&self, label: &str) -> bool {
        self.labels().iter().any(|l| *l == label)
    }
}

const fn level(label: &'static str, description: &'static str) -> StyleLevel {
    StyleLevel { label, description }
}

pub static STYLE_DIMENSIONS: [StyleDimension; 8] = [
    StyleDimension {
        dimension: "Formality",
        description: "正式程度",
        levels: StyleLevels {
            high: level("Formal", "使用正式语言，遵循商务礼仪，注重称谓和头衔"),
            medium: level("Semi-formal", "适度正式，根据场合调整语气，保持专业但不僵化"),
            low: level("Casual", "轻松随意，使用口语化表达，注重亲和力"),
        },
    },
    StyleDimension {
        dimension: "Verbosity",
        description: "话语详细程度",
        levels: StyleLevels {
            high: level("Detailed", "提供全面的背景信息，详细解释每个步骤和原因"),
            medium: level("Moderate", "平衡信息量，提供必要细节但不冗余"),
            low: level("Concise", "直击要点，精简表达，省略不必要的细节"),
        },
    },
    StyleDimension {
        dimension: "Humor",
        description: "幽默感使用",
        levels: StyleLevels {
            high: level("Frequent", "经常使用幽默、玩笑和轻松的表达方式"),
            medium: level("Occasional", "偶尔使用幽默，视场合和对象调整"),
            low: level("Minimal", "很少使用幽默，保持严肃和专业的沟通方式"),
        },
    },
    StyleDimension {
        dimension: "Jargon_Usage",
        description: "专业术语使用",
        levels: StyleLevels {
            high: level("Technical", "大量使用行业术语和技术语言，假设对方具备专业知识"),
            medium: level("Balanced", "适度使用专业术语，同时提供必要的解释"),
            low: level("Plain", "使用通俗易懂的语言，避免专业术语，强调清晰性"),
        },
    },
    StyleDimension {
        dimension: "Emoji_Usage",
        description: "表情符号使用",
        levels: StyleLevels {
            high: level("Frequent", "经常使用表情符号增强情感表达"),
            medium: level("Occasional", "偶尔使用表情符号，保持适度"),
            low: level("Rare", "很少或从不使用表情符号，保持正式文字沟通"),
        },
    },
    StyleDimension {
        dimension: "Directness",
        description: "表达直接程度",
        levels: StyleLevels {
            high: level("Direct", "直接表达观点和需求，不绕弯子"),
            medium: level("Balanced", "在直接和委婉之间找到平衡，根据情况调整"),
            low: level("Indirect", "委婉表达，注重礼貌和他人感受，避免冲突"),
        },
    },
    StyleDimension {
        dimension: "Warmth",
        description: "情感温度",
        levels: StyleLevels {
            high: level("Warm", "热情友好，表现出强烈的个人关怀和情感投入"),
            medium: level("Friendly", "友好亲切，保持专业的同时表现出善意"),
            low: level("Neutral", "中立客观，保持情感距离，注重事实和逻辑"),
        },
    },
    StyleDimension {
        dimension: "Questioning_Style",
        description: "提问方式",
        levels: StyleLevels {
            high: level("Probing", "深入探究，追问细节，挑战假设，寻求深层理解"),
            medium: level("Clarifying", "澄清确认，确保理解准确，避免误解"),
            low: level("Accepting", "接受为主，较少质疑，倾向于相信和接受他人的观点"),
        },
    },
];

pub fn dimension(name: &str) -> Option<&'static StyleDimension> {
    STYLE_DIMENSIONS.iter().find(|d| d.dimension == name)
}

pub fn dimension_names() -> impl Iterator<Item = &'static str> {
    STYLE_DIMENSIONS.iter().map(|d| d.dimension)
}

/// Allowed labels per dimension, for membership checks
pub fn vocabulary() -> BTreeMap<&'static str, [&'static str; 3]> {
    STYLE_DIMENSIONS
        .iter()
        .map(|d| (d.dimension, d.labels()))
        .collect()
}

/// A style vector using the medium label of every dimension
pub fn neutral_style() -> StyleVector {
    STYLE_DIMENSIONS
        .iter()
        .map(|d| (d.dimension.to_string(), d.levels.medium.label.to_string()))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct UniverseMetadata {
    pub version: &'static str,
    pub generated_at: String,
    pub principle: &'static str,
}

/// On-disk form of the universe
#[derive(Debug, Serialize)]
pub struct StyleUniverseDocument {
    pub communication_style_universe: &'static [StyleDimension],
    pub total_dimensions: usize,
    pub metadata: UniverseMetadata,
}

impl StyleUniverseDocument {
    pub fn new() -> Self {
        Self {
            communication_style_universe: &STYLE_DIMENSIONS,
            total_dimensions: STYLE_DIMENSIONS.len(),
            metadata: UniverseMetadata {
                version: "1.0",
                generated_at: chrono::Local::now().to_rfc3339(),
                principle: "mutually exclusive dimensions, no parent/child relations, three levels each",
            },
        }
    }
}

impl Default for StyleUniverseDocument {
    fn default() -> Self {
        Self::new()
    }
}
