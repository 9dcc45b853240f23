use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong while serving a chat, catalog or stream request.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Caller input is malformed; fixable by the caller.
    #[error("{0}")]
    Validation(String),

    /// The model runtime could not be reached (refused, timed out, aborted).
    #[error("model runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("model '{0}' not found in runtime")]
    ModelNotFound(String),

    /// The runtime answered, but not in a way we understand.
    #[error("unexpected runtime response: {0}")]
    RuntimeProtocol(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[cfg(test)]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::RuntimeUnavailable(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::RuntimeProtocol(message.into())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            ChatError::RuntimeUnavailable(err.to_string())
        } else if err.is_decode() || err.is_body() || err.is_status() {
            ChatError::RuntimeProtocol(err.to_string())
        } else if err.is_request() {
            ChatError::RuntimeUnavailable(err.to_string())
        } else {
            ChatError::RuntimeProtocol(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::RuntimeProtocol(err.to_string())
    }
}

impl ResponseError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            ChatError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "detail": self.to_string() }))
    }
}
