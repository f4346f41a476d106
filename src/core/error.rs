use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input. Raised before any side effect happened.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Blob store upload/delete failure. Compensation was already attempted.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record store failure, possibly after assets were uploaded.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A compensating delete failed while handling `primary`.
    /// `secondary` lists the storage ids left behind for manual reconciliation.
    #[error("{primary}; compensation failed: {secondary}")]
    Compensation {
        primary: Box<AppError>,
        secondary: String,
    },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// The original failure, unwrapping any compensation report.
    pub fn primary(&self) -> &AppError {
        match self {
            AppError::Compensation { primary, .. } => primary.primary(),
            other => other,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Compensation { primary, .. } => primary.status_code(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, errors) = match self {
            AppError::Validation(ref msg) => (msg.clone(), Some(vec![msg.clone()])),
            AppError::NotFound(ref msg) | AppError::BadRequest(ref msg) => (msg.clone(), None),
            AppError::Storage(ref msg) => {
                tracing::error!("Storage error: {}", msg);
                (msg.clone(), None)
            }
            AppError::Persistence(ref msg) => {
                tracing::error!("Persistence error: {}", msg);
                (msg.clone(), None)
            }
            AppError::Compensation {
                ref primary,
                ref secondary,
            } => {
                tracing::error!(
                    "Compensation failed: primary={}, orphans={}",
                    primary,
                    secondary
                );
                (
                    primary.to_string(),
                    Some(vec![format!("Compensation failed: {}", secondary)]),
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
        };

        let body = Json(ApiResponse::<()>::error(Some(message), errors));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_unwraps_nested_compensation() {
        let err = AppError::Compensation {
            primary: Box::new(AppError::Compensation {
                primary: Box::new(AppError::Storage("upload timed out".to_string())),
                secondary: "a/1.png".to_string(),
            }),
            secondary: "a/2.png".to_string(),
        };

        assert!(matches!(err.primary(), AppError::Storage(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Persistence("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
