//! Density-based clustering over gated embeddings.
//!
//! The unsupervised branch discovers recurring answer themes without labels.
//! Points are grouped with DBSCAN under Euclidean distance; anything not
//! reachable from a core point is noise. Cluster ids are assigned in order of
//! the first core point encountered in input order, so the whole routine is
//! deterministic for a fixed input, gate, and parameter set.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Parameters for one clustering request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterParams {
    /// Neighborhood radius.
    #[serde(default = "default_eps")]
    pub eps: f32,

    /// Minimum neighborhood size (the point itself counts) for a core point.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Standardize each feature across the batch before clustering.
    #[serde(default = "default_scale_before")]
    pub scale_before: bool,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            min_samples: default_min_samples(),
            scale_before: default_scale_before(),
        }
    }
}

fn default_eps() -> f32 {
    0.5
}

fn default_min_samples() -> usize {
    8
}

fn default_scale_before() -> bool {
    true
}

impl ClusterParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.eps > 0.0) || !self.eps.is_finite() {
            return Err(ConfigError::Validation(
                "cluster.eps must be a positive finite number".to_string(),
            ));
        }
        if self.min_samples == 0 {
            return Err(ConfigError::Validation(
                "cluster.min_samples must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of one clustering request over a batch of texts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterOutcome {
    /// One label per input text, in input order; `-1` means noise.
    pub cluster_labels: Vec<i32>,
    /// First member (in input order) of each non-noise cluster.
    pub exemplars: BTreeMap<i32, String>,
    /// Whether the shared feature gate was active for this batch.
    pub fsag_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Standardizes each feature across the batch: subtract the batch mean,
/// divide by the batch standard deviation. Constant features are centered and
/// left unscaled.
pub(crate) fn standardize_in_place(rows: &mut [Vec<f32>]) {
    let n = rows.len();
    if n == 0 {
        return;
    }
    let width = rows.iter().map(Vec::len).min().unwrap_or(0);
    for j in 0..width {
        let mean = rows.iter().map(|r| r[j]).sum::<f32>() / n as f32;
        let var = rows.iter().map(|r| (r[j] - mean) * (r[j] - mean)).sum::<f32>() / n as f32;
        let std = var.sqrt();
        let denom = if std > 1e-12 { std } else { 1.0 };
        for row in rows.iter_mut() {
            row[j] = (row[j] - mean) / denom;
        }
    }
}

/// DBSCAN over row vectors. Returns one label per row; `-1` marks noise.
pub(crate) fn dbscan(rows: &[Vec<f32>], eps: f32, min_samples: usize) -> Vec<i32> {
    let n = rows.len();
    let eps_sq = eps * eps;

    let neighbors: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| dist_sq(&rows[i], &rows[j]) <= eps_sq)
                .collect()
        })
        .collect();
    let core: Vec<bool> = neighbors.iter().map(|ns| ns.len() >= min_samples).collect();

    let mut labels = vec![-1i32; n];
    let mut assigned = vec![false; n];
    let mut next_id = 0i32;

    for seed in 0..n {
        if assigned[seed] || !core[seed] {
            continue;
        }
        // Grow one cluster from this core point; border points join the first
        // cluster that reaches them.
        let mut queue = VecDeque::new();
        assigned[seed] = true;
        labels[seed] = next_id;
        queue.push_back(seed);
        while let Some(p) = queue.pop_front() {
            for &q in &neighbors[p] {
                if !assigned[q] {
                    assigned[q] = true;
                    labels[q] = next_id;
                    if core[q] {
                        queue.push_back(q);
                    }
                }
            }
        }
        next_id += 1;
    }

    labels
}

fn dist_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// First member per non-noise cluster id, in input order.
pub(crate) fn exemplars(labels: &[i32], texts: &[String]) -> BTreeMap<i32, String> {
    let mut map = BTreeMap::new();
    for (label, text) in labels.iter().zip(texts.iter()) {
        if *label >= 0 {
            map.entry(*label).or_insert_with(|| text.clone());
        }
    }
    map
}
