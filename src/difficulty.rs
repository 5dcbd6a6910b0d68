//! Question difficulty estimation.
//!
//! Two independent paths share one response shape: a parametric item-response
//! (IRT) model when fitted parameters exist for the question id, and a
//! lexical-complexity proxy computed from the question text alone otherwise.
//! This estimator never touches the embedding/gate pipeline.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::text::{round3, tokenize_alnum};

/// Fitted item-response parameters for one question.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DifficultyItem {
    pub qid: i64,
    /// Discrimination; defaults to 1.0 when the fit did not produce one.
    #[serde(default = "default_discrimination")]
    pub a: f64,
    /// Difficulty location on the latent scale.
    pub b: f64,
}

fn default_discrimination() -> f64 {
    1.0
}

/// Difficulty band with fixed thresholds at 0.33 and 0.66.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DifficultyBucket {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for DifficultyBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyBucket::Easy => write!(f, "Easy"),
            DifficultyBucket::Medium => write!(f, "Medium"),
            DifficultyBucket::Hard => write!(f, "Hard"),
        }
    }
}

/// Normalized difficulty for one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DifficultyEstimate {
    pub qid: Option<i64>,
    pub has_irt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b: Option<f64>,
    pub difficulty_norm: f64,
    pub bucket: DifficultyBucket,
}

/// Phrases whose presence marks an analytically demanding task.
const TASK_VERBS: [&str; 4] = ["prove", "derive", "construct", "show that"];

pub struct DifficultyEstimator {
    items: HashMap<i64, DifficultyItem>,
}

impl DifficultyEstimator {
    pub fn new(items: Vec<DifficultyItem>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.qid, item)).collect(),
        }
    }

    /// Estimator with no fitted items; every call takes the lexical path.
    pub fn empty() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Normalized difficulty in `[0, 1]` for a question, from the IRT item
    /// when one exists for `qid`, otherwise from the lexical proxy.
    pub fn estimate(&self, question_text: &str, qid: Option<i64>) -> DifficultyEstimate {
        if let Some(item) = qid.and_then(|q| self.items.get(&q)) {
            let norm = sigmoid(item.b);
            return DifficultyEstimate {
                qid,
                has_irt: true,
                a: Some(item.a),
                b: Some(item.b),
                difficulty_norm: round3(norm),
                bucket: bucket(norm),
            };
        }

        let norm = lex_complexity(question_text);
        DifficultyEstimate {
            qid,
            has_irt: false,
            a: None,
            b: None,
            difficulty_norm: round3(norm),
            bucket: bucket(norm),
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Lexical difficulty proxy in `[0, 1]`: answer length, type/token diversity,
/// and the presence of demanding task verbs. Verbs are matched against the
/// raw text so phrasing like "show that" survives tokenization.
pub(crate) fn lex_complexity(question_text: &str) -> f64 {
    let tokens = tokenize_alnum(question_text);
    let count = tokens.len();
    let unique = tokens.iter().collect::<HashSet<_>>().len();
    let ratio = unique as f64 / (count as f64 + 1e-6);

    let length_component = 0.25 * (count.min(40) as f64 / 40.0);
    let diversity_component = 0.35 * (1.0 - ratio).max(0.0);
    let verb_component = if TASK_VERBS.iter().any(|v| question_text.contains(v)) {
        0.4
    } else {
        0.0
    };

    (length_component + diversity_component + verb_component).clamp(0.0, 1.0)
}

fn bucket(x: f64) -> DifficultyBucket {
    if x < 0.33 {
        DifficultyBucket::Easy
    } else if x < 0.66 {
        DifficultyBucket::Medium
    } else {
        DifficultyBucket::Hard
    }
}
