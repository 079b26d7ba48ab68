use std::fmt;

use thiserror::Error;

/// High-level error type shared across terraviz components.
///
/// Only structurally broken inputs end up here. Per-resource resolution
/// problems are recorded as [`crate::Diagnostic`]s and never abort a run.
#[derive(Debug, Error)]
pub enum TerravizError {
    #[error("structural error: {0}")]
    Structural(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("plan error: {0}")]
    Plan(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for TerravizError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl TerravizError {
    pub fn context<T: fmt::Display>(self, ctx: T) -> Self {
        match self {
            TerravizError::Structural(msg) => TerravizError::Structural(format!("{ctx}: {msg}")),
            TerravizError::Configuration(msg) => {
                TerravizError::Configuration(format!("{ctx}: {msg}"))
            }
            TerravizError::Plan(msg) => TerravizError::Plan(format!("{ctx}: {msg}")),
            TerravizError::Render(msg) => TerravizError::Render(format!("{ctx}: {msg}")),
            TerravizError::Serialization(msg) => {
                TerravizError::Serialization(format!("{ctx}: {msg}"))
            }
            TerravizError::Io(err) => TerravizError::Io(err),
        }
    }
}
