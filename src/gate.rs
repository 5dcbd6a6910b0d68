//! Feature-Selective Attenuation Gate (FSAG).
//!
//! A small two-layer gating block sitting between the encoder and every
//! downstream consumer. It learns a per-feature multiplicative attenuation
//! that suppresses low-utility embedding dimensions, so the supervised
//! classifier and the unsupervised clustering branch share one denoised
//! representation space. With no trained weights the gate is a behavioral
//! no-op and the pipeline runs unmodified.

use serde::Deserialize;
use tracing::debug;

use crate::adapt::{reconcile, reconcile_filled};
use crate::error::ArtifactError;

/// Trained gate weights: two affine layers, hidden then gate.
///
/// `w1` is `hidden × in`, `w2` is `gate_width × hidden`; biases match the
/// first dimension of their layer.
#[derive(Debug, Clone, Deserialize)]
pub struct GateWeights {
    pub w1: Vec<Vec<f32>>,
    pub b1: Vec<f32>,
    pub w2: Vec<Vec<f32>>,
    pub b2: Vec<f32>,
}

impl GateWeights {
    /// Checks the shape invariants the transform relies on. Runs once at
    /// load time; weights are immutable afterwards.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let hidden = self.w1.len();
        if hidden == 0 {
            return Err(ArtifactError::Shape("w1 must have at least one row".into()));
        }
        let in_dim = self.w1[0].len();
        if in_dim == 0 {
            return Err(ArtifactError::Shape("w1 rows must be non-empty".into()));
        }
        if self.w1.iter().any(|row| row.len() != in_dim) {
            return Err(ArtifactError::Shape("w1 rows have inconsistent widths".into()));
        }
        if self.b1.len() != hidden {
            return Err(ArtifactError::Shape(format!(
                "b1 length {} does not match hidden width {hidden}",
                self.b1.len()
            )));
        }
        let gate_width = self.w2.len();
        if gate_width == 0 {
            return Err(ArtifactError::Shape("w2 must have at least one row".into()));
        }
        if self.w2.iter().any(|row| row.len() != hidden) {
            return Err(ArtifactError::Shape(format!(
                "w2 rows must have width {hidden} (hidden)"
            )));
        }
        if self.b2.len() != gate_width {
            return Err(ArtifactError::Shape(format!(
                "b2 length {} does not match gate width {gate_width}",
                self.b2.len()
            )));
        }
        Ok(())
    }

    fn in_dim(&self) -> usize {
        self.w1.first().map_or(0, Vec::len)
    }
}

/// The gate itself: either untrained (identity) or carrying validated
/// weights. Loaded once at construction, immutable thereafter.
#[derive(Debug, Clone, Default)]
pub enum FeatureGate {
    #[default]
    Inactive,
    Active(GateWeights),
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn silu(x: f32) -> f32 {
    x * sigmoid(x)
}

fn affine(rows: &[Vec<f32>], bias: &[f32], x: &[f32]) -> Vec<f32> {
    rows.iter()
        .zip(bias.iter())
        .map(|(row, b)| row.iter().zip(x.iter()).map(|(w, v)| w * v).sum::<f32>() + b)
        .collect()
}

impl FeatureGate {
    /// Builds an active gate after shape validation.
    pub fn from_weights(weights: GateWeights) -> Result<Self, ArtifactError> {
        weights.validate()?;
        debug!(
            hidden = weights.w1.len(),
            in_dim = weights.in_dim(),
            gate_width = weights.w2.len(),
            "feature gate active"
        );
        Ok(FeatureGate::Active(weights))
    }

    pub fn is_active(&self) -> bool {
        matches!(self, FeatureGate::Active(_))
    }

    /// Applies the gating transform to one embedding, preserving its width.
    /// Identity when inactive.
    pub fn transform(&self, h: &[f32]) -> Vec<f32> {
        match self {
            FeatureGate::Inactive => h.to_vec(),
            FeatureGate::Active(w) => apply(w, h).0,
        }
    }

    /// Batch form of [`transform`](Self::transform); one output row per input
    /// row, each preserving its own width.
    pub fn transform_batch(&self, hs: &[Vec<f32>]) -> Vec<Vec<f32>> {
        hs.iter().map(|h| self.transform(h)).collect()
    }

    /// Gate activations alone, for introspection. All ones when inactive;
    /// always the same shape as `h`.
    pub fn gates(&self, h: &[f32]) -> Vec<f32> {
        match self {
            FeatureGate::Inactive => vec![1.0; h.len()],
            FeatureGate::Active(w) => apply(w, h).1,
        }
    }
}

/// Returns `(h_tilde, gates)`, both with `h`'s original width.
fn apply(w: &GateWeights, h: &[f32]) -> (Vec<f32>, Vec<f32>) {
    // Input-side drift: zero padding keeps unseen weight columns inert.
    let h_use = reconcile(h, w.in_dim(), false);

    let u: Vec<f32> = affine(&w.w1, &w.b1, &h_use).into_iter().map(silu).collect();
    let g_raw: Vec<f32> = affine(&w.w2, &w.b2, &u).into_iter().map(sigmoid).collect();

    // Output-side drift: pad with ones so untouched features pass through.
    let g = reconcile_filled(&g_raw, h.len(), 1.0);
    let h_tilde = h.iter().zip(g.iter()).map(|(x, gx)| x * gx).collect();
    (h_tilde, g)
}
