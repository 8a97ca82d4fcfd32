use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quay_core::conversation::ConversationError;
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error rendered as `{"error": ...}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::GATEWAY_TIMEOUT,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ConversationError> for ApiError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::Validation(message) => Self::bad_request(message),
            ConversationError::Model(model) if model.is_timeout() => {
                Self::gateway_timeout(model.to_string())
            }
            ConversationError::Model(model) => Self::internal(model.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), error = %self.message, "chat request failed");
        } else {
            warn!(status = self.status.as_u16(), error = %self.message, "chat request rejected");
        }
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quay_core::llm::ModelError;

    use super::*;

    #[test]
    fn conversation_errors_map_to_statuses() {
        let cases = [
            (
                ConversationError::Validation("bad history".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ConversationError::Model(ModelError::Timeout(Duration::from_secs(60))),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ConversationError::Model(ModelError::Auth("invalid key".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ConversationError::Model(ModelError::EmptyResponse),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
