use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use dearly_types::api::ErrorBody;

/// Every way a request can fail. The `code()` string is part of the API;
/// clients map it to user-facing text.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    EmailInUse,
    #[error("Password must be at least 8 characters")]
    WeakPassword,
    #[error("Email address is not valid")]
    InvalidEmail,
    #[error("Missing or invalid token")]
    Unauthorized,
    #[error("You do not have access to this resource")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Upstream request failed: {0}")]
    Upstream(String),
    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::EmailInUse | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::WeakPassword | Self::InvalidEmail | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "auth/invalid-credentials",
            Self::EmailInUse => "auth/email-already-in-use",
            Self::WeakPassword => "auth/weak-password",
            Self::InvalidEmail => "auth/invalid-email",
            Self::Unauthorized => "auth/unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound(_) => "not-found",
            Self::Conflict(_) => "conflict",
            Self::BadRequest(_) => "bad-request",
            Self::Upstream(_) => "upstream",
            Self::Internal(_) => "internal",
        }
    }
}

/// Storage errors become 500s, except constraint violations which mean the
/// request raced another write of the same record.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if dearly_db::is_unique_violation(&err) {
            Self::Conflict("A conflicting record already exists".into())
        } else {
            Self::Internal(err)
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {}", err);
        Self::Internal(anyhow::anyhow!("background task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!("Internal error: {:#}", e);
        }
        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
