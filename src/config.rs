//! YAML configuration file support.
//!
//! One file configures the whole analysis engine: the encoder, the artifacts
//! directory the fail-soft loaders read from, and the default clustering
//! parameters.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "cs-theory-course"
//!
//! encoder:
//!   dim: 384
//!   normalize: true
//!
//! artifacts_dir: "./artifacts"
//!
//! cluster:
//!   eps: 0.5
//!   min_samples: 8
//!   scale_before: true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterParams;
use crate::encoder::EncoderConfig;
use crate::error::ConfigError;

/// Top-level configuration for the analysis engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MisconConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional configuration name/description.
    #[serde(default)]
    pub name: Option<String>,

    /// Encoder configuration.
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Directory the artifact loaders read from.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Default clustering parameters; per-request parameters override these.
    #[serde(default)]
    pub cluster: ClusterParams,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("./artifacts")
}

impl MisconConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: MisconConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigError::UnsupportedVersion(v.to_string())),
        }?;

        if self.encoder.dim == 0 {
            return Err(ConfigError::Validation(
                "encoder.dim must be >= 1".to_string(),
            ));
        }
        self.cluster.validate()?;

        Ok(())
    }
}

impl Default for MisconConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            encoder: EncoderConfig::default(),
            artifacts_dir: default_artifacts_dir(),
            cluster: ClusterParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_fills_defaults() {
        let cfg = MisconConfig::from_yaml("version: \"1.0\"").unwrap();
        assert_eq!(cfg.encoder.dim, 384);
        assert!(cfg.encoder.normalize);
        assert_eq!(cfg.artifacts_dir, PathBuf::from("./artifacts"));
        assert_eq!(cfg.cluster.eps, 0.5);
        assert_eq!(cfg.cluster.min_samples, 8);
        assert!(cfg.cluster.scale_before);
    }

    #[test]
    fn full_yaml_round_trips() {
        let yaml = r#"
version: "1"
name: "automata-course"
encoder:
  dim: 128
  normalize: false
artifacts_dir: "/var/lib/miscon"
cluster:
  eps: 0.8
  min_samples: 4
  scale_before: false
"#;
        let cfg = MisconConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.name.as_deref(), Some("automata-course"));
        assert_eq!(cfg.encoder.dim, 128);
        assert!(!cfg.encoder.normalize);
        assert_eq!(cfg.artifacts_dir, PathBuf::from("/var/lib/miscon"));
        assert_eq!(cfg.cluster.eps, 0.8);
        assert_eq!(cfg.cluster.min_samples, 4);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let err = MisconConfig::from_yaml("version: \"2.0\"").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion(_)));
    }

    #[test]
    fn invalid_cluster_params_are_rejected() {
        let yaml = "version: \"1.0\"\ncluster:\n  eps: -1.0\n";
        assert!(MisconConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn zero_encoder_dim_is_rejected() {
        let yaml = "version: \"1.0\"\nencoder:\n  dim: 0\n";
        assert!(MisconConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(MisconConfig::from_yaml("version: [unclosed").is_err());
    }
}
