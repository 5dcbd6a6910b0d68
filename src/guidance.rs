//! Guidance capability interface.
//!
//! Networked providers (LLM-backed suggestion generators) are layered outside
//! this crate; the core exposes one deterministic local implementation so a
//! guidance string is always available.

use std::sync::Arc;

use crate::encoder::TextEncoder;
use crate::text::{clean_text, cosine_sim, round4};

/// Similarity threshold below which the student answer is treated as far
/// from the ideal answer.
const LOW_SIMILARITY: f32 = 0.65;

/// Label substrings that indicate a concept-confusion misconception worth a
/// targeted contrast tip.
const CONTRAST_KEYWORDS: [&str; 8] = [
    "epsilon", "dfa", "nfa", "regex", "star", "union", "concat", "equiv",
];

/// A source of improvement suggestions for a graded answer. Implementations
/// must be deterministic or handle their own failure modes; callers treat the
/// returned string as final.
pub trait GuidanceProvider: Send + Sync {
    fn suggest(&self, question: &str, ideal: &str, user: &str, label: &str) -> String;
}

/// Deterministic template-based guidance built from answer-to-ideal
/// similarity and the predicted label.
pub struct LocalGuidance {
    encoder: Arc<dyn TextEncoder>,
}

impl LocalGuidance {
    pub fn new(encoder: Arc<dyn TextEncoder>) -> Self {
        LocalGuidance { encoder }
    }

    fn similarity(&self, a: &str, b: &str) -> f32 {
        let vecs = self.encoder.encode_batch(&[clean_text(a), clean_text(b)]);
        round4(cosine_sim(&vecs[0], &vecs[1]))
    }
}

impl GuidanceProvider for LocalGuidance {
    fn suggest(&self, _question: &str, ideal: &str, user: &str, label: &str) -> String {
        let sim = self.similarity(user, ideal);
        let lower = label.to_lowercase();

        let mut tips = vec!["Start by restating the key term from the question in one line."];
        if sim < LOW_SIMILARITY {
            tips.push("Add a precise definition and one verifying example.");
        }
        if CONTRAST_KEYWORDS.iter().any(|k| lower.contains(k)) {
            tips.push(
                "Address the specific confusion noted in the label; contrast the two concepts explicitly.",
            );
        }
        tips.push("Finish with a short check: why your answer satisfies the definition or rule.");
        tips.join(" ")
    }
}
