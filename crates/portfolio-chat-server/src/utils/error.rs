use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Reply sent whenever the pipeline cannot produce an answer.
pub const APOLOGY_REPLY: &str = "I'm having trouble right now. Please try again.";

/// Failures while fetching or parsing the portfolio document.
/// Absorbed by `PortfolioCache`; never surfaced to HTTP callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("portfolio fetch timed out")]
    Timeout,

    #[error("portfolio fetch failed: {0}")]
    Network(String),

    #[error("portfolio source returned status {0}")]
    Status(u16),

    #[error("portfolio content malformed: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() || err.is_body() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Failures of the text-generation backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("LLM API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse LLM response: {0}")]
    Malformed(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("No choices returned from LLM")]
    Empty,
}

/// Errors that can reach the chat request boundary.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl ChatError {
    /// Text shown to the end user. Raw error detail stays in the logs.
    pub fn user_reply(&self) -> &'static str {
        match self {
            ChatError::Generation(
                GenerationError::Transport(_)
                | GenerationError::Status { .. }
                | GenerationError::Malformed(_)
                | GenerationError::Stream(_)
                | GenerationError::Empty,
            ) => APOLOGY_REPLY,
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BadRequest", msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", APOLOGY_REPLY.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_generation_failure_maps_to_apology() {
        let errors = vec![
            GenerationError::Transport("connection refused".into()),
            GenerationError::Status { status: 500, body: "stack trace".into() },
            GenerationError::Malformed("bad json".into()),
            GenerationError::Stream("reset".into()),
            GenerationError::Empty,
        ];

        for err in errors {
            let reply = ChatError::from(err).user_reply();
            assert_eq!(reply, APOLOGY_REPLY);
            assert!(!reply.contains("stack trace"));
        }
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let response = ApiError::InternalError("db password leaked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bad_request_status() {
        let response = ApiError::BadRequest("message must not be empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
