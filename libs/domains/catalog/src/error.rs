use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// A domain constraint on the input was violated. Nothing was written.
    #[error("Validation failed for `{field}`: {message}")]
    Validation {
        field: String,
        value: String,
        message: String,
    },

    #[error("Cannot decrease amount by {requested}, only {available} in stock")]
    DecrementExceedsStock { requested: i64, available: i64 },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn validation(
        field: impl Into<String>,
        value: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        CatalogError::Validation {
            field: field.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    pub fn storage(details: impl Into<String>) -> Self {
        CatalogError::StorageUnavailable(details.into())
    }

    /// HTTP status the transport layer answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::Validation { .. } => StatusCode::BAD_REQUEST,
            CatalogError::DecrementExceedsStock { .. } => StatusCode::BAD_REQUEST,
            CatalogError::StorageUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients. Storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            CatalogError::Validation { message, .. } => message.clone(),
            CatalogError::DecrementExceedsStock { .. } => self.to_string(),
            CatalogError::StorageUnavailable(_) => "Internal server error.".to_string(),
        }
    }
}

impl From<mongodb::error::Error> for CatalogError {
    fn from(err: mongodb::error::Error) -> Self {
        CatalogError::StorageUnavailable(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CatalogError {
    fn from(errors: validator::ValidationErrors) -> Self {
        for (field, field_errors) in errors.field_errors() {
            if let Some(error) = field_errors.first() {
                let value = error
                    .params
                    .get("value")
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                return CatalogError::validation(field.to_string(), value, message);
            }
        }
        CatalogError::validation("input", "", errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let validation = CatalogError::validation("amount", -1, "Amount cannot be negative");
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);

        let exceeded = CatalogError::DecrementExceedsStock {
            requested: 15,
            available: 10,
        };
        assert_eq!(exceeded.status_code(), StatusCode::BAD_REQUEST);

        let storage = CatalogError::storage("connection reset");
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_public_message_hides_storage_details() {
        let storage = CatalogError::storage("mongodb://admin:secret@db");
        assert_eq!(storage.public_message(), "Internal server error.");

        let exceeded = CatalogError::DecrementExceedsStock {
            requested: 15,
            available: 10,
        };
        assert!(exceeded.public_message().contains("15"));
        assert!(exceeded.public_message().contains("10"));
    }
}
