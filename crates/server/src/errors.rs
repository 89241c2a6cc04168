use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::errors::RelayError;
use tracing::error;

/// HTTP face of a [`RelayError`].
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            RelayError::NotFound(_) | RelayError::UnknownSlot(_) => StatusCode::NOT_FOUND,
            RelayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.0.code();
        // storage details (paths, io errors) stay in the log
        let msg = match &self.0 {
            RelayError::Storage(detail) => {
                error!(error = %detail, "storage failure");
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({"error": code, "message": msg}))).into_response()
    }
}
