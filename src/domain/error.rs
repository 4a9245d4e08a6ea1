use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("operation not permitted: {message}")]
    InvalidOperation { message: String },
}

impl DomainError {
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
