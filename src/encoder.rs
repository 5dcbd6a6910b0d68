//! Text encoder boundary.
//!
//! The core treats the embedding producer as an opaque function
//! `text -> fixed-length real vector`. Deployments wire in a real model
//! behind [`TextEncoder`]; when none is available, [`HashEncoder`] provides a
//! deterministic stand-in so the rest of the pipeline still produces
//! reproducible, non-trivial vectors.

use fxhash::hash64;
use serde::{Deserialize, Serialize};

use crate::text::l2_normalize_in_place;

/// Opaque embedding producer shared by both inference branches.
///
/// Implementations must return one vector per input, all of the same length
/// for the lifetime of the encoder instance.
pub trait TextEncoder: Send + Sync {
    /// Embed a batch of already-cleaned texts.
    fn encode_batch(&self, texts: &[String]) -> Vec<Vec<f32>>;

    /// Embedding width produced by this encoder.
    fn dim(&self) -> usize;
}

/// Encoder configuration (dimension of the produced vectors and whether they
/// are L2-normalized).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncoderConfig {
    #[serde(default = "default_dim")]
    pub dim: usize,

    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            dim: default_dim(),
            normalize: true,
        }
    }
}

fn default_dim() -> usize {
    384
}

fn default_normalize() -> bool {
    true
}

/// Deterministic fallback encoder used when no real model is wired in.
/// Generates sinusoid values derived from a hash of the input text to
/// guarantee reproducible vectors with minimal CPU cost.
#[derive(Debug, Clone)]
pub struct HashEncoder {
    dim: usize,
    normalize: bool,
}

impl HashEncoder {
    pub fn new(cfg: &EncoderConfig) -> Self {
        Self {
            dim: cfg.dim.max(1),
            normalize: cfg.normalize,
        }
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let h = hash64(text.as_bytes());
        for (idx, value) in v.iter_mut().enumerate() {
            *value = ((h >> (idx % 32)) as f32 * 0.0001).sin();
        }
        if self.normalize {
            l2_normalize_in_place(&mut v);
        }
        v
    }
}

impl Default for HashEncoder {
    fn default() -> Self {
        Self::new(&EncoderConfig::default())
    }
}

impl TextEncoder for HashEncoder {
    fn encode_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.encode_one(t)).collect()
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_encoder_deterministic() {
        let enc = HashEncoder::default();
        let a = enc.encode_batch(&["big cat".to_string()]);
        let b = enc.encode_batch(&["big cat".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn hash_encoder_distinguishes_texts() {
        let enc = HashEncoder::default();
        let out = enc.encode_batch(&["hello".to_string(), "world".to_string()]);
        assert_ne!(out[0], out[1]);
    }

    #[test]
    fn hash_encoder_respects_dim() {
        let enc = HashEncoder::new(&EncoderConfig {
            dim: 64,
            normalize: false,
        });
        let out = enc.encode_batch(&["text".to_string()]);
        assert_eq!(out[0].len(), 64);
        assert_eq!(enc.dim(), 64);
    }

    #[test]
    fn hash_encoder_normalizes_to_unit_length() {
        let enc = HashEncoder::new(&EncoderConfig {
            dim: 32,
            normalize: true,
        });
        let out = enc.encode_batch(&["normalize me".to_string()]);
        let norm: f32 = out[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_dim_clamped_to_one() {
        let enc = HashEncoder::new(&EncoderConfig {
            dim: 0,
            normalize: false,
        });
        assert_eq!(enc.dim(), 1);
    }
}
