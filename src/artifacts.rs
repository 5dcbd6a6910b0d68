//! Fail-soft artifact loading.
//!
//! Every artifact is read once at construction time from a single artifacts
//! directory. A missing file is a normal deployment state; a corrupt or
//! shape-invalid file is logged and treated the same way. Either case leaves
//! the owning component in its degraded mode for the process lifetime: the
//! gate stays identity, the classifier answers "unknown", the label reference
//! is empty, and difficulty estimation falls back to the lexical proxy.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::classifier::ClassifierArtifact;
use crate::difficulty::DifficultyItem;
use crate::error::ArtifactError;
use crate::gate::{FeatureGate, GateWeights};

pub const GATE_WEIGHTS_FILE: &str = "fsag_weights.json";
pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const LABEL_REFERENCE_FILE: &str = "label_reference.json";
pub const IRT_ITEMS_FILE: &str = "irt_items.json";

/// One previously observed `(qid, label)` pair.
#[derive(Debug, Clone, Deserialize)]
struct LabelRow {
    qid: i64,
    label: String,
}

/// Loads the gate weight bundle; any failure leaves the gate inactive.
pub fn load_gate(dir: &Path) -> FeatureGate {
    let path = dir.join(GATE_WEIGHTS_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "gate weights absent; gate inactive");
        return FeatureGate::Inactive;
    }
    match try_load_gate(&path) {
        Ok(gate) => gate,
        Err(err) => {
            warn!(path = %path.display(), %err, "gate weights rejected; gate inactive");
            FeatureGate::Inactive
        }
    }
}

fn try_load_gate(path: &Path) -> Result<FeatureGate, ArtifactError> {
    let raw = fs::read_to_string(path)?;
    let weights: GateWeights = serde_json::from_str(&raw)?;
    FeatureGate::from_weights(weights)
}

/// Loads the classifier; any failure degrades the supervised branch.
pub fn load_classifier(dir: &Path) -> Option<ClassifierArtifact> {
    let path = dir.join(CLASSIFIER_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "classifier absent; supervised branch degraded");
        return None;
    }
    match try_load_classifier(&path) {
        Ok(clf) => Some(clf),
        Err(err) => {
            warn!(path = %path.display(), %err, "classifier rejected; supervised branch degraded");
            None
        }
    }
}

fn try_load_classifier(path: &Path) -> Result<ClassifierArtifact, ArtifactError> {
    let raw = fs::read_to_string(path)?;
    let clf: ClassifierArtifact = serde_json::from_str(&raw)?;
    clf.validate()?;
    Ok(clf)
}

/// Loads the per-question label reference, collapsed into sorted unique
/// label sets. Failures yield an empty reference.
pub fn load_label_reference(dir: &Path) -> HashMap<i64, Vec<String>> {
    let path = dir.join(LABEL_REFERENCE_FILE);
    if !path.exists() {
        return HashMap::new();
    }
    match try_load_label_reference(&path) {
        Ok(map) => map,
        Err(err) => {
            warn!(path = %path.display(), %err, "label reference rejected; using empty reference");
            HashMap::new()
        }
    }
}

fn try_load_label_reference(path: &Path) -> Result<HashMap<i64, Vec<String>>, ArtifactError> {
    let raw = fs::read_to_string(path)?;
    let rows: Vec<LabelRow> = serde_json::from_str(&raw)?;
    let mut sets: HashMap<i64, BTreeSet<String>> = HashMap::new();
    for row in rows {
        sets.entry(row.qid).or_default().insert(row.label);
    }
    Ok(sets
        .into_iter()
        .map(|(qid, labels)| (qid, labels.into_iter().collect()))
        .collect())
}

/// Loads fitted IRT items. Failures yield an empty collection, so difficulty
/// estimation falls back to the lexical proxy for every question.
pub fn load_difficulty_items(dir: &Path) -> Vec<DifficultyItem> {
    let path = dir.join(IRT_ITEMS_FILE);
    if !path.exists() {
        return Vec::new();
    }
    match try_load_difficulty_items(&path) {
        Ok(items) => items,
        Err(err) => {
            warn!(path = %path.display(), %err, "IRT items rejected; lexical fallback only");
            Vec::new()
        }
    }
}

fn try_load_difficulty_items(path: &Path) -> Result<Vec<DifficultyItem>, ArtifactError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
