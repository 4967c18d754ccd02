use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Error taxonomy shared by every component. Validation problems carry
/// enough detail to correct the request; collaborator failures surface as
/// `Upstream` and leave the ledger untouched.
#[derive(Debug, Display)]
pub enum ApiError {
    /// Entity absent, or owned by another tenant (indistinguishable).
    #[display(fmt = "not found")]
    NotFound,
    /// Write collision on the (funcionario_id, data_hora) composite key.
    #[display(fmt = "duplicate record")]
    DuplicateKey,
    #[display(fmt = "invalid input: {}", _0)]
    InvalidInput(String),
    #[display(fmt = "upstream unavailable: {}", _0)]
    Upstream(String),
    #[display(fmt = "internal server error")]
    Internal,
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::DuplicateKey => StatusCode::CONFLICT,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string()
        }))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        // MySQL integrity-constraint violations (duplicate composite key)
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return ApiError::DuplicateKey;
            }
        }

        if matches!(e, sqlx::Error::RowNotFound) {
            return ApiError::NotFound;
        }

        tracing::error!(error = %e, "Database error");
        ApiError::Internal
    }
}
