use thiserror::Error;

/// Errors raised by aggregators, the registry and the executor.
///
/// Poisoning is not an error: a poisoned accumulator keeps absorbing and
/// merging and reports `null` from `finish`.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("function not found: {0}")]
    FunctionNotFound(String),

    #[error("{name}: expected {expected}, got {got}")]
    FunctionArgMismatch { name: String, expected: String, got: String },

    #[error("{name}: invalid argument: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("{name}: invalid partial state: {message}")]
    InvalidPartial { name: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AggregateError>;

impl AggregateError {
    pub fn invalid_argument(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument { name: name.to_string(), message: message.into() }
    }

    pub fn arg_mismatch(name: &str, expected: &str, got: impl Into<String>) -> Self {
        Self::FunctionArgMismatch { name: name.to_string(), expected: expected.to_string(), got: got.into() }
    }
}
