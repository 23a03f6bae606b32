use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::store::StoreError;

#[derive(Debug)]
pub enum ShortenerError {
    /// Input rejected before the store was touched.
    Validation(&'static str),
    /// The requested short id belongs to another record.
    IdentifierTaken,
    /// Every generated id collided.
    AllocationExhausted,
    /// Shared-secret check failed.
    Forbidden,
    Store(StoreError),
}

impl IntoResponse for ShortenerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message),
            Self::IdentifierTaken => (StatusCode::CONFLICT, "Short ID is already taken"),
            Self::AllocationExhausted => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Could not allocate a short ID, try again",
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Access denied"),
            Self::Store(err) => {
                tracing::error!(err = ?err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ShortenerError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
