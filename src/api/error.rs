//! Uniform JSON error responses for the bridge API.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// HTTP status plus JSON `{code, message}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code: code.to_owned(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// The concurrent-session bound was reached; the client should retry later.
pub fn session_limit_reached() -> ApiError {
    ApiError::new(
        StatusCode::SERVICE_UNAVAILABLE,
        "session_limit_reached",
        "too many concurrent streaming sessions",
    )
}

impl From<kafka_bridge_client::Error> for ApiError {
    fn from(err: kafka_bridge_client::Error) -> Self {
        use kafka_bridge_client::Error;
        match err {
            Error::Config(message) => bad_request(message),
            // Broker-side failures surface as an upstream error; details are
            // logged server-side.
            err => {
                tracing::error!(error = %err, "kafka operation failed");
                ApiError::new(StatusCode::BAD_GATEWAY, "kafka_error", err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafka_bridge_client::Error;

    #[test]
    fn config_errors_map_to_bad_request() {
        let api: ApiError = Error::Config("at least one topic is required".to_owned()).into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.body.code, "validation_error");
    }

    #[test]
    fn non_config_errors_map_to_bad_gateway() {
        let api: ApiError = Error::StreamClosed.into();
        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
        assert_eq!(api.body.code, "kafka_error");
    }
}
