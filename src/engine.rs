//! The assembled analysis engine.
//!
//! Ties the analyzer, difficulty estimator and guidance provider together
//! behind one object that an outer serving layer can hold for the process
//! lifetime. Construction is where artifacts are read; after that the engine
//! is immutable and safe to share across threads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analyzer::{MisconceptionAnalyzer, MisconceptionPrediction};
use crate::artifacts;
use crate::cluster::{ClusterOutcome, ClusterParams};
use crate::config::MisconConfig;
use crate::difficulty::{DifficultyEstimate, DifficultyEstimator};
use crate::encoder::{HashEncoder, TextEncoder};
use crate::guidance::{GuidanceProvider, LocalGuidance};
use crate::text::round3;

/// One freeform analysis request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRequest {
    pub question_text: String,
    pub ideal_answer_text: String,
    pub user_answer_text: String,
    #[serde(default)]
    pub qid: Option<i64>,
}

/// Pairwise similarities reported alongside an analysis, rounded to
/// 3 decimals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimilarityBreakdown {
    pub user_vs_ideal: f64,
    pub question_vs_ideal: f64,
}

/// Full output of one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub similarity: SimilarityBreakdown,
    pub misconception: MisconceptionPrediction,
    pub difficulty: DifficultyEstimate,
    /// Blend of answer-to-ideal similarity and misconception risk,
    /// in `[0, 1]`, rounded to 3 decimals.
    pub answer_score: f64,
    pub guidance: String,
}

/// Health snapshot for an outer serving layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineStatus {
    pub ok: bool,
    pub classifier_loaded: bool,
    pub difficulty_items: usize,
    pub fsag_active: bool,
}

/// Weight of the similarity term in the answer score; the risk term gets
/// the remainder.
const SCORE_SIMILARITY_WEIGHT: f64 = 0.65;

pub struct AnalysisEngine {
    analyzer: MisconceptionAnalyzer,
    difficulty: DifficultyEstimator,
    guidance: Box<dyn GuidanceProvider>,
    cluster_defaults: ClusterParams,
}

impl AnalysisEngine {
    /// Builds an engine from configuration: constructs the fallback hash
    /// encoder and reads every artifact from the configured directory.
    /// Artifact problems degrade features rather than failing construction.
    pub fn from_config(config: &MisconConfig) -> Self {
        let encoder: Arc<dyn TextEncoder> = Arc::new(HashEncoder::new(&config.encoder));
        Self::with_encoder(config, encoder)
    }

    /// Same as [`from_config`](Self::from_config), but with a caller-supplied
    /// encoder (e.g. a real embedding model wired in by the serving layer).
    pub fn with_encoder(config: &MisconConfig, encoder: Arc<dyn TextEncoder>) -> Self {
        let dir = config.artifacts_dir.as_path();
        let gate = artifacts::load_gate(dir);
        let classifier = artifacts::load_classifier(dir);
        let label_ref = artifacts::load_label_reference(dir);
        let items = artifacts::load_difficulty_items(dir);

        info!(
            artifacts_dir = %dir.display(),
            gate_active = gate.is_active(),
            classifier_loaded = classifier.is_some(),
            irt_items = items.len(),
            "analysis engine ready"
        );

        let analyzer = MisconceptionAnalyzer::new(encoder.clone(), gate, classifier, label_ref);
        AnalysisEngine {
            analyzer,
            difficulty: DifficultyEstimator::new(items),
            guidance: Box::new(LocalGuidance::new(encoder)),
            cluster_defaults: config.cluster.clone(),
        }
    }

    /// Replaces the guidance provider, e.g. with an LLM-backed strategy
    /// supplied by the serving layer.
    pub fn with_guidance(mut self, guidance: Box<dyn GuidanceProvider>) -> Self {
        self.guidance = guidance;
        self
    }

    pub fn analyzer(&self) -> &MisconceptionAnalyzer {
        &self.analyzer
    }

    pub fn difficulty(&self) -> &DifficultyEstimator {
        &self.difficulty
    }

    /// Supervised prediction for one answer.
    pub fn predict_misconception(
        &self,
        user_answer: &str,
        qid: Option<i64>,
    ) -> MisconceptionPrediction {
        self.analyzer.predict_label(user_answer, qid)
    }

    /// Unsupervised grouping with the configured defaults.
    pub fn cluster(&self, texts: &[String]) -> ClusterOutcome {
        self.analyzer.cluster_unsupervised(texts, &self.cluster_defaults)
    }

    /// Unsupervised grouping with per-request parameters.
    pub fn cluster_with(&self, texts: &[String], params: &ClusterParams) -> ClusterOutcome {
        self.analyzer.cluster_unsupervised(texts, params)
    }

    /// Difficulty estimate for one question.
    pub fn estimate_difficulty(&self, question_text: &str, qid: Option<i64>) -> DifficultyEstimate {
        self.difficulty.estimate(question_text, qid)
    }

    /// Full analysis of one answer: similarities, misconception prediction,
    /// difficulty, a blended answer score and a guidance string.
    pub fn analyze(&self, req: &AnalysisRequest) -> AnalysisReport {
        let sim_ui = self
            .analyzer
            .similarity(&req.user_answer_text, &req.ideal_answer_text) as f64;
        let sim_qi = self
            .analyzer
            .similarity(&req.question_text, &req.ideal_answer_text) as f64;

        let misconception = self.analyzer.predict_label(&req.user_answer_text, req.qid);
        let difficulty = self.difficulty.estimate(&req.question_text, req.qid);

        // Bare catch-all labels carry no keyword-derived risk, so fall back
        // to inverted confidence for them.
        let mis_risk = if misconception.label == "noise" || misconception.label == "misc" {
            1.0 - misconception.confidence
        } else {
            misconception.risk
        }
        .clamp(0.0, 1.0);

        let answer_score = round3(
            SCORE_SIMILARITY_WEIGHT * sim_ui + (1.0 - SCORE_SIMILARITY_WEIGHT) * (1.0 - mis_risk),
        );

        let guidance = self.guidance.suggest(
            &req.question_text,
            &req.ideal_answer_text,
            &req.user_answer_text,
            &misconception.label,
        );

        AnalysisReport {
            similarity: SimilarityBreakdown {
                user_vs_ideal: round3(sim_ui),
                question_vs_ideal: round3(sim_qi),
            },
            misconception,
            difficulty,
            answer_score,
            guidance,
        }
    }

    /// Health snapshot; `ok` is always true once construction returned.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            ok: true,
            classifier_loaded: self.analyzer.classifier_loaded(),
            difficulty_items: self.difficulty.item_count(),
            fsag_active: self.analyzer.gate_active(),
        }
    }
}
