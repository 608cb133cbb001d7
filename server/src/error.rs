use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Error taxonomy for the location API.
///
/// Per-subscriber send failures are deliberately absent: they are handled
/// inside the broadcast loop (close + unsubscribe) and never surface to
/// the HTTP caller.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid location update: {0}")]
    Validation(String),

    #[error("no known location for this entity")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
