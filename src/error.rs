use thiserror::Error;

/// Errors that can occur when loading the YAML configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Why an artifact failed to load.
///
/// This type stays internal to the loading layer: loaders log the failure and
/// hand back the owning component's degraded state. It never crosses the
/// inference API, whose operations are infallible by contract.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse artifact JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("shape invariant violated: {0}")]
    Shape(String),
}
