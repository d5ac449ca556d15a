//! Service-level errors with status mapping for the request layer.

use serde::Serialize;

use crate::db::DatabaseError;
use crate::models::ParameterError;
use crate::summary::SummaryError;

/// Error body handed to clients: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl ServiceError {
    /// HTTP status the request layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::InvalidInput(_) => 400,
            ServiceError::Forbidden(_) => 403,
            ServiceError::NotFound(_) => 404,
            ServiceError::Database(_) => 500,
        }
    }

    /// Client-facing body. Database details stay in the logs.
    pub fn body(&self) -> ErrorBody {
        let error = match self {
            ServiceError::Database(e) => {
                tracing::error!(error = %e, "Service database error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        ErrorBody { error }
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, .. } => {
                ServiceError::NotFound(format!("Invalid {entity_type}"))
            }
            other => ServiceError::Database(other),
        }
    }
}

impl From<ParameterError> for ServiceError {
    fn from(err: ParameterError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<SummaryError> for ServiceError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::Database(e) => e.into(),
        }
    }
}
