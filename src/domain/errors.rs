use thiserror::Error;

/// Errors raised while building rules or flows.
///
/// Validating a value never produces one of these; validation failures are
/// plain messages in a `ValidationResult`.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Unknown step: {0}")]
    UnknownStep(usize),
    #[error("Unknown option for {field}: {value}")]
    UnknownOption { field: String, value: String },
}

pub type DomainResult<T> = Result<T, DomainError>;
