pub mod notify;
pub mod payment;
pub mod pii;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
    #[error("Payment provider error: {0}")]
    ProviderError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
