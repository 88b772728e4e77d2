//! JSON error responses.

use crate::error::LingoError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

/// A [`LingoError`] rendered as `{error, kind}`.
#[derive(Debug)]
pub struct ApiError(pub LingoError);

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

impl From<LingoError> for ApiError {
    fn from(err: LingoError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_user_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.0.kind(), error = %self.0, "Request failed");
        } else {
            warn!(kind = self.0.kind(), error = %self.0, "Rejected request");
        }

        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let bad_url = ApiError(LingoError::InvalidUrl("nope".to_string()));
        assert_eq!(bad_url.status(), StatusCode::BAD_REQUEST);

        let timeout = ApiError(LingoError::UpstreamTimeout("llama-cli".to_string()));
        assert_eq!(timeout.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
