use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bundle::BundleError;
use serde_json::json;

/// API error response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl From<BundleError> for ApiError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::NotFound(name) => ApiError::not_found(format!("No such entry: {}", name)),
            e @ (BundleError::MalformedEncoding(_)
            | BundleError::CorruptCompressedStream(_)
            | BundleError::SizeMismatch { .. }) => {
                ApiError::internal_error(format!("Corrupt entry: {}", e))
            }
            BundleError::Io(e) => ApiError::internal_error(format!("Read error: {}", e)),
        }
    }
}
