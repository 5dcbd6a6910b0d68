//! Misconception analysis: the supervised and unsupervised branches.
//!
//! Both branches consume the same attenuated representation: text is
//! cleaned, encoded, then passed through the shared feature gate before any
//! branch-specific computation. Similarity deliberately bypasses the gate so
//! the reported closeness reflects the raw semantic space.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapt::reconcile;
use crate::classifier::ClassifierArtifact;
use crate::cluster::{self, ClusterOutcome, ClusterParams};
use crate::encoder::TextEncoder;
use crate::gate::FeatureGate;
use crate::text::{clean_text, cosine_sim, round3, round4};

/// Label substrings that mark a prediction as misconception-like for the
/// risk heuristic.
const RISK_KEYWORDS: [&str; 5] = ["miscon", "error", "wrong", "confuse", "noise"];

/// Output of the supervised branch. `explanation` is present only when the
/// branch ran in a degraded mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MisconceptionPrediction {
    pub label: String,
    pub confidence: f64,
    pub risk: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl MisconceptionPrediction {
    fn degraded(explanation: &str) -> Self {
        MisconceptionPrediction {
            label: "unknown".to_string(),
            confidence: 0.5,
            risk: 0.4,
            explanation: Some(explanation.to_string()),
        }
    }
}

/// Shared analysis core for one process: encoder, gate, fixed classifier and
/// per-question label reference. All artifact state is loaded once and never
/// mutated, so a single instance can serve concurrent callers.
pub struct MisconceptionAnalyzer {
    encoder: Arc<dyn TextEncoder>,
    gate: FeatureGate,
    classifier: Option<ClassifierArtifact>,
    label_ref: HashMap<i64, Vec<String>>,
}

impl MisconceptionAnalyzer {
    pub fn new(
        encoder: Arc<dyn TextEncoder>,
        gate: FeatureGate,
        classifier: Option<ClassifierArtifact>,
        label_ref: HashMap<i64, Vec<String>>,
    ) -> Self {
        debug!(
            gate_active = gate.is_active(),
            classifier_loaded = classifier.is_some(),
            label_ref_questions = label_ref.len(),
            "analyzer constructed"
        );
        MisconceptionAnalyzer {
            encoder,
            gate,
            classifier,
            label_ref,
        }
    }

    pub fn gate_active(&self) -> bool {
        self.gate.is_active()
    }

    pub fn classifier_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    /// Clean, encode and gate a batch of texts. Every downstream consumer of
    /// the learned representation goes through here.
    fn embed_clean(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let cleaned: Vec<String> = texts.iter().map(|t| clean_text(t)).collect();
        let vecs = self.encoder.encode_batch(&cleaned);
        self.gate.transform_batch(&vecs)
    }

    /// Cosine similarity between two texts over the raw (non-gated) encoder
    /// space, rounded to 4 decimals.
    pub fn similarity(&self, a_text: &str, b_text: &str) -> f32 {
        let vecs = self
            .encoder
            .encode_batch(&[clean_text(a_text), clean_text(b_text)]);
        round4(cosine_sim(&vecs[0], &vecs[1]))
    }

    /// Supervised branch: predicts a misconception label with confidence and
    /// a derived risk. Total over its inputs; artifact problems surface as
    /// degraded predictions, never as errors.
    pub fn predict_label(&self, user_answer: &str, qid: Option<i64>) -> MisconceptionPrediction {
        let vec = self
            .embed_clean(&[user_answer.to_string()])
            .into_iter()
            .next()
            .unwrap_or_default();

        let clf = match &self.classifier {
            Some(clf) => clf,
            None => return MisconceptionPrediction::degraded("No classifier artifact found."),
        };

        // Legacy artifacts may expect a different width than the gated
        // embedding; tiling is allowed on this path.
        let vec_for_pred = match clf.expected_input_dim() {
            Some(d) if d != vec.len() => reconcile(&vec, d, true),
            _ => vec,
        };

        let (label, conf) = match clf.predict_proba(&vec_for_pred) {
            Some(proba) => {
                let (idx, best) = proba
                    .iter()
                    .copied()
                    .enumerate()
                    .fold((0usize, f32::MIN), |acc, (i, p)| {
                        if p > acc.1 {
                            (i, p)
                        } else {
                            acc
                        }
                    });
                (clf.classes()[idx].clone(), best as f64)
            }
            None => match clf.predict(&vec_for_pred) {
                Some(label) => (label, 0.6),
                None => {
                    return MisconceptionPrediction::degraded("Classifier prediction failed.")
                }
            },
        };

        let (label, risk) = self.risk_for(label, conf, qid);
        MisconceptionPrediction {
            label,
            confidence: round3(conf),
            risk: round3(risk),
            explanation: None,
        }
    }

    /// Risk heuristic plus out-of-distribution annotation. Each step is a
    /// floor applied in order (base, keyword, OOD); risk only rises.
    fn risk_for(&self, mut label: String, conf: f64, qid: Option<i64>) -> (String, f64) {
        let mut risk = 0.2;
        let lower = label.to_lowercase();
        if RISK_KEYWORDS.iter().any(|k| lower.contains(k)) {
            risk = (1.0 - conf + 0.4).max(0.4).min(1.0);
        }
        if let Some(qid) = qid {
            if let Some(known) = self.label_ref.get(&qid) {
                if !known.iter().any(|l| l == &label) {
                    label = format!("{label} (unseen@qid)");
                    risk = risk.max(0.5);
                }
            }
        }
        (label, risk)
    }

    /// Unsupervised branch: density-based grouping over gated embeddings.
    /// An empty batch short-circuits before any encoding happens.
    pub fn cluster_unsupervised(&self, texts: &[String], params: &ClusterParams) -> ClusterOutcome {
        if texts.is_empty() {
            return ClusterOutcome {
                cluster_labels: Vec::new(),
                exemplars: Default::default(),
                fsag_active: self.gate.is_active(),
                note: Some("empty input".to_string()),
            };
        }

        let mut rows = self.embed_clean(texts);
        if params.scale_before {
            cluster::standardize_in_place(&mut rows);
        }
        let labels = cluster::dbscan(&rows, params.eps, params.min_samples);
        let exemplars = cluster::exemplars(&labels, texts);

        ClusterOutcome {
            cluster_labels: labels,
            exemplars,
            fsag_active: self.gate.is_active(),
            note: Some(
                "Clustering performed on gated embeddings (domain-agnostic, density-based)."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierArtifact;
    use crate::encoder::{EncoderConfig, HashEncoder};
    use crate::gate::GateWeights;

    fn encoder(dim: usize) -> Arc<dyn TextEncoder> {
        Arc::new(HashEncoder::new(&EncoderConfig {
            dim,
            normalize: true,
        }))
    }

    /// An encoder that must never run; used to show empty batches
    /// short-circuit before encoding.
    struct PanicEncoder;

    impl TextEncoder for PanicEncoder {
        fn encode_batch(&self, _texts: &[String]) -> Vec<Vec<f32>> {
            panic!("encoder invoked for an empty batch");
        }

        fn dim(&self) -> usize {
            8
        }
    }

    fn linear_two_class(dim: usize) -> ClassifierArtifact {
        // Positive margin on the first feature selects the misconception
        // class via the binary sigmoid path.
        ClassifierArtifact::Linear {
            classes: vec!["ok".to_string(), "misconception_confuse".to_string()],
            coef: vec![{
                let mut w = vec![0.0; dim];
                w[0] = 4.0;
                w
            }],
            intercept: vec![0.0],
            n_features_in: Some(dim),
        }
    }

    #[test]
    fn missing_classifier_returns_degraded_prediction() {
        let an = MisconceptionAnalyzer::new(encoder(16), FeatureGate::Inactive, None, HashMap::new());
        let pred = an.predict_label("some answer", None);
        assert_eq!(pred.label, "unknown");
        assert_eq!(pred.confidence, 0.5);
        assert_eq!(pred.risk, 0.4);
        assert!(pred.explanation.is_some());
    }

    #[test]
    fn keyword_label_raises_risk_by_formula() {
        let clf = ClassifierArtifact::NearestCentroid {
            classes: vec!["misconception_noise".to_string()],
            centroids: vec![vec![0.0; 16]],
            n_features_in: None,
        };
        let an = MisconceptionAnalyzer::new(
            encoder(16),
            FeatureGate::Inactive,
            Some(clf),
            HashMap::new(),
        );
        let pred = an.predict_label("dfa accepts epsilon", None);
        // No probability output: confidence fixed at 0.6, so risk is
        // min(1.0, max(0.4, 1.0 - 0.6 + 0.4)) = 0.8.
        assert_eq!(pred.confidence, 0.6);
        assert_eq!(pred.risk, 0.8);
        assert!(pred.explanation.is_none());
    }

    #[test]
    fn low_confidence_keyword_label_saturates_risk() {
        // Zero coefficients give a uniform softmax: confidence 1/3 on the
        // first class. 1.0 - 1/3 + 0.4 exceeds 1.0 and must clamp there.
        let clf = ClassifierArtifact::Linear {
            classes: vec![
                "misconception_noise".to_string(),
                "ok".to_string(),
                "other".to_string(),
            ],
            coef: vec![vec![0.0; 8]; 3],
            intercept: vec![0.0; 3],
            n_features_in: Some(8),
        };
        let an = MisconceptionAnalyzer::new(
            encoder(8),
            FeatureGate::Inactive,
            Some(clf),
            HashMap::new(),
        );
        let pred = an.predict_label("any answer", None);
        assert_eq!(pred.label, "misconception_noise");
        assert_eq!(pred.confidence, 0.333);
        assert_eq!(pred.risk, 1.0);
    }

    #[test]
    fn risk_is_clamped_at_one() {
        let an = MisconceptionAnalyzer::new(
            encoder(8),
            FeatureGate::Inactive,
            Some(linear_two_class(8)),
            HashMap::new(),
        );
        // Whatever the confidence, risk never exceeds 1.0.
        let pred = an.predict_label("anything", None);
        assert!(pred.risk <= 1.0);
        assert!(pred.risk >= 0.2);
    }

    #[test]
    fn unseen_label_is_annotated_and_risk_floored() {
        let mut label_ref = HashMap::new();
        label_ref.insert(42_i64, vec!["ok".to_string()]);
        let clf = ClassifierArtifact::NearestCentroid {
            classes: vec!["brand_new".to_string()],
            centroids: vec![vec![0.0; 8]],
            n_features_in: None,
        };
        let an =
            MisconceptionAnalyzer::new(encoder(8), FeatureGate::Inactive, Some(clf), label_ref);
        let pred = an.predict_label("answer", Some(42));
        assert_eq!(pred.label, "brand_new (unseen@qid)");
        assert!(pred.risk >= 0.5);
    }

    #[test]
    fn known_label_for_qid_is_not_annotated() {
        let mut label_ref = HashMap::new();
        label_ref.insert(42_i64, vec!["brand_new".to_string()]);
        let clf = ClassifierArtifact::NearestCentroid {
            classes: vec!["brand_new".to_string()],
            centroids: vec![vec![0.0; 8]],
            n_features_in: None,
        };
        let an =
            MisconceptionAnalyzer::new(encoder(8), FeatureGate::Inactive, Some(clf), label_ref);
        let pred = an.predict_label("answer", Some(42));
        assert_eq!(pred.label, "brand_new");
        assert_eq!(pred.risk, 0.2);
    }

    #[test]
    fn qid_without_reference_entry_is_ignored() {
        let clf = ClassifierArtifact::NearestCentroid {
            classes: vec!["whatever".to_string()],
            centroids: vec![vec![0.0; 8]],
            n_features_in: None,
        };
        let an = MisconceptionAnalyzer::new(
            encoder(8),
            FeatureGate::Inactive,
            Some(clf),
            HashMap::new(),
        );
        let pred = an.predict_label("answer", Some(999));
        assert_eq!(pred.label, "whatever");
    }

    #[test]
    fn classifier_width_mismatch_is_reconciled() {
        // Encoder emits 8 dims, classifier expects 16: tiling applies.
        let an = MisconceptionAnalyzer::new(
            encoder(8),
            FeatureGate::Inactive,
            Some(linear_two_class(16)),
            HashMap::new(),
        );
        let pred = an.predict_label("an answer of ordinary length", None);
        assert!(pred.explanation.is_none());
        assert!(pred.confidence > 0.0 && pred.confidence < 1.0);
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        let an = MisconceptionAnalyzer::new(encoder(32), FeatureGate::Inactive, None, HashMap::new());
        let ab = an.similarity("a dfa accepts strings", "an nfa accepts strings");
        let ba = an.similarity("an nfa accepts strings", "a dfa accepts strings");
        assert_eq!(ab, ba);
        assert!((-1.0..=1.0).contains(&ab));
        assert_eq!(an.similarity("same text", "same text"), 1.0);
    }

    #[test]
    fn similarity_bypasses_gate() {
        // A gate that zeroes everything must not affect similarity.
        let dim = 4;
        let weights = GateWeights {
            w1: vec![vec![0.0; dim]; dim],
            b1: vec![0.0; dim],
            w2: vec![vec![0.0; dim]; dim],
            b2: vec![-10.0; dim],
        };
        let gate = FeatureGate::from_weights(weights).unwrap();
        let gated = MisconceptionAnalyzer::new(encoder(dim), gate, None, HashMap::new());
        let plain = MisconceptionAnalyzer::new(encoder(dim), FeatureGate::Inactive, None, HashMap::new());
        assert_eq!(
            gated.similarity("closure under union", "pumping lemma"),
            plain.similarity("closure under union", "pumping lemma")
        );
    }

    #[test]
    fn empty_cluster_input_never_encodes() {
        let an = MisconceptionAnalyzer::new(
            Arc::new(PanicEncoder),
            FeatureGate::Inactive,
            None,
            HashMap::new(),
        );
        let out = an.cluster_unsupervised(&[], &ClusterParams::default());
        assert!(out.cluster_labels.is_empty());
        assert!(out.exemplars.is_empty());
        assert_eq!(out.note.as_deref(), Some("empty input"));
    }

    #[test]
    fn cluster_outcome_reports_gate_state() {
        let an = MisconceptionAnalyzer::new(encoder(8), FeatureGate::Inactive, None, HashMap::new());
        let texts: Vec<String> = (0..3).map(|i| format!("answer number {i}")).collect();
        let out = an.cluster_unsupervised(&texts, &ClusterParams::default());
        assert!(!out.fsag_active);
        assert_eq!(out.cluster_labels.len(), texts.len());
    }
}
