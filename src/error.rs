use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failure taxonomy shared by the store, the services, and the handlers.
///
/// Mutations abort on any error with no partial writes; only the summary
/// recompute is allowed to fail after a committed mutation, and that path
/// surfaces staleness to the caller instead of returning an error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("backend call failed: {0}")]
    Transport(anyhow::Error),

    #[error("malformed response from {0}")]
    Parse(&'static str),
}

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidArgument(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Parse(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Transport(e.into())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Transport(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::NotFound("record").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::invalid("quantity must be at least 1").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Transport(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Parse("food search").status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(AppError::NotFound("record").to_string(), "record not found");
        assert_eq!(
            AppError::invalid("name must not be empty").to_string(),
            "name must not be empty"
        );
    }
}
