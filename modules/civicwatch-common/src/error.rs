use thiserror::Error;

#[derive(Error, Debug)]
pub enum CivicError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Rule configuration error: {0}")]
    RuleConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CivicError>;
