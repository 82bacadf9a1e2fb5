//! HTTP mapping for `RelayError` (non-WS handlers and upgrade rejections).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use relayhub_core::error::RelayError;

#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::AuthFailed => StatusCode::UNAUTHORIZED,
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::Timeout => StatusCode::REQUEST_TIMEOUT,
            RelayError::Store(_) | RelayError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::UnsupportedVersion | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
