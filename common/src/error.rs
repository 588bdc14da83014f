use thiserror::Error;

/// Configuration errors, fatal at startup (exit code 1).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(String),
    #[error("invalid value for environment variable {0}")]
    InvalidVar(String),
}
