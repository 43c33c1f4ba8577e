use miette::Diagnostic;
use thiserror::Error;

/// Core error type shared by podling crates that do not need a runtime- or
/// transport-specific variant set of their own.
#[derive(Error, Debug, Diagnostic)]
pub enum CoreError {
    #[error("invalid resource quantity: {reason}")]
    #[diagnostic(
        code(podling::invalid_quantity),
        help("use a plain integer, or a suffix like 'm' for CPU millicores and 'Ki'/'Mi'/'Gi' for memory")
    )]
    InvalidQuantity { reason: String },

    #[error("invalid {field}: {reason}")]
    #[diagnostic(code(podling::invalid_spec))]
    InvalidSpec { field: String, reason: String },

    #[error("serialization error: {message}")]
    #[diagnostic(code(podling::serialization_error))]
    SerializationError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn invalid_quantity(reason: impl Into<String>) -> Self {
        Self::InvalidQuantity {
            reason: reason.into(),
        }
    }

    pub fn invalid_spec(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CoreError::invalid_quantity("negative cpu");
        assert!(matches!(err, CoreError::InvalidQuantity { .. }));
    }
}
