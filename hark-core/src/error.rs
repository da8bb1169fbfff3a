use thiserror::Error;

/// Unified error type for hark.
#[derive(Error, Debug)]
pub enum HarkError {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarkError {
    /// Short machine-readable label, used as a structured `tracing` field.
    pub fn kind(&self) -> &'static str {
        match self {
            HarkError::Serialize(_) => "serialize",
            HarkError::Config(_) => "config",
            HarkError::Io(_) => "io",
        }
    }
}
