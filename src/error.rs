use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

/// Result wrapper for persistence operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the subscription and weather stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write, e.g. a duplicate (email, city) pair
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("Malformed stored record: {0}")]
    MalformedRecord(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db_error) if db_error.is_unique_violation() => {
                Self::UniqueViolation(db_error.message().to_string())
            }
            _ => Self::Database(e),
        }
    }
}

/// Errors raised while resolving current weather
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    // Provider errors
    #[error("Weather provider error: {0}")]
    Provider(String),
    #[error("Malformed weather response: {0}")]
    MalformedResponse(String),
    #[error("Weather request failed: {0}")]
    Request(#[from] reqwest::Error),
    // Snapshot persistence errors
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result wrapper for REST handlers
pub type RestResult<T> = std::result::Result<T, RestError>;

/// Errors returned by REST endpoints, rendered as `{"error": ..., "message": ...}`
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InternalError(String),
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.to_string(),
        }))
    }
}
