//! Misconception analysis core.
//!
//! Takes a student's free-text answer, embeds it with an opaque text encoder,
//! attenuates the embedding with a learned feature gate, and runs two
//! branches over the shared representation: a supervised classifier that
//! predicts a misconception label with confidence and risk, and an
//! unsupervised density-based clustering pass that discovers recurring
//! answer themes. A difficulty estimator (fitted IRT items with a lexical
//! fallback) and a deterministic guidance provider round out the engine.
//!
//! All model artifacts load fail-soft at startup: a missing or corrupt file
//! degrades the corresponding feature (identity gate, "unknown" predictions,
//! lexical-only difficulty) instead of failing construction. Artifacts are
//! never mutated afterwards, so one [`AnalysisEngine`] serves concurrent
//! callers without locking.
//!
//! ```
//! use miscon::{AnalysisEngine, AnalysisRequest, MisconConfig};
//!
//! let engine = AnalysisEngine::from_config(&MisconConfig::default());
//! let report = engine.analyze(&AnalysisRequest {
//!     question_text: "Define a regular language.".to_string(),
//!     ideal_answer_text: "A language accepted by some finite automaton.".to_string(),
//!     user_answer_text: "A language a DFA accepts.".to_string(),
//!     qid: None,
//! });
//! assert!((0.0..=1.0).contains(&report.answer_score));
//! ```

pub mod adapt;
pub mod analyzer;
pub mod artifacts;
pub mod classifier;
pub mod cluster;
pub mod config;
pub mod difficulty;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod gate;
pub mod guidance;
pub mod text;

pub use analyzer::{MisconceptionAnalyzer, MisconceptionPrediction};
pub use classifier::ClassifierArtifact;
pub use cluster::{ClusterOutcome, ClusterParams};
pub use config::MisconConfig;
pub use difficulty::{DifficultyBucket, DifficultyEstimate, DifficultyEstimator, DifficultyItem};
pub use encoder::{EncoderConfig, HashEncoder, TextEncoder};
pub use engine::{AnalysisEngine, AnalysisReport, AnalysisRequest, EngineStatus, SimilarityBreakdown};
pub use error::{ArtifactError, ConfigError};
pub use gate::{FeatureGate, GateWeights};
pub use guidance::{GuidanceProvider, LocalGuidance};
