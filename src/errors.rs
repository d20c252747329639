use actix_web::HttpResponse;
use thiserror::Error;

/// Error taxonomy for the HTTP surface. Every handler failure is one of
/// these variants; the `ResponseError` impl translates them to a status
/// code and a `{"error": <message>}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid credentials.")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<diesel::result::Error> for ApiError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => ApiError::Conflict(info.message().to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(e: r2d2::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::NotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "error": self.to_string()
            })),
            ApiError::Unauthorized => HttpResponse::Unauthorized().json(serde_json::json!({
                "error": self.to_string()
            })),
            ApiError::Conflict(_) => HttpResponse::Conflict().json(serde_json::json!({
                "error": self.to_string()
            })),
            ApiError::BadRequest(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": self.to_string()
            })),
            ApiError::Internal(detail) => {
                // The detail stays in the log; clients get a fixed message.
                log::error!("internal error: {}", detail);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Internal server error"
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::ResponseError;

    #[test]
    fn not_found_returns_404() {
        let resp = ApiError::NotFound("Product not found.".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unauthorized_returns_401() {
        let resp = ApiError::Unauthorized.error_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn conflict_returns_409() {
        let resp = ApiError::Conflict("Username is already taken.".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn bad_request_returns_400() {
        let resp = ApiError::BadRequest("Quantity must be at least 1.".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = ApiError::Internal("something went wrong".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_display_carries_message() {
        assert_eq!(
            ApiError::NotFound("Cart not found.".to_string()).to_string(),
            "Cart not found."
        );
    }

    #[test]
    fn unauthorized_display() {
        assert_eq!(ApiError::Unauthorized.to_string(), "Invalid credentials.");
    }

    #[test]
    fn diesel_not_found_maps_to_internal() {
        // Handlers use `.optional()` for absence; a raw NotFound reaching
        // the conversion means a query bug, not a missing entity.
        let err: ApiError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
