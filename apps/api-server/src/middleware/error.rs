//! Error handling middleware - `{"error": "..."}` responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use counsel_core::error::DomainError;
use counsel_core::ports::EmbeddingError;
use counsel_shared::ErrorResponse;
use std::fmt;

/// Application-level error type rendered as an `ErrorResponse` body.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    RateLimited { retry_after_secs: u64 },
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::RateLimited { retry_after_secs } => {
                write!(f, "Rate limited for {}s", retry_after_secs)
            }
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        let error = match self {
            AppError::BadRequest(detail) => ErrorResponse::new(detail.clone()),
            AppError::RateLimited { retry_after_secs } => {
                builder
                    .insert_header((header::RETRY_AFTER, retry_after_secs.to_string()))
                    .insert_header(("X-RateLimit-Remaining", "0"));
                ErrorResponse::rate_limited()
            }
            AppError::Internal(detail) => {
                // Log internal errors
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
        };

        builder.json(error)
    }
}

// Conversion from domain errors
impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::NotFound { entity_type, id } => {
                AppError::BadRequest(format!("{} with id {} not found", entity_type, id))
            }
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<EmbeddingError> for AppError {
    fn from(err: EmbeddingError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_rate_limited_response_carries_retry_after() {
        let response = AppError::RateLimited {
            retry_after_secs: 42,
        }
        .error_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");

        let body = to_bytes(response.into_body()).await.unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error, ErrorResponse::rate_limited());
    }

    #[actix_web::test]
    async fn test_internal_error_hides_detail() {
        let response = AppError::from(EmbeddingError::Upstream("secret upstream body".into()))
            .error_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body()).await.unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error, ErrorResponse::internal_error());
    }
}
