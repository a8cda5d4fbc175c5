//! Conversion of domain errors into JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::error::AppError;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidSelection(_) | AppError::InvalidPlaylistUrl(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        warn!("Request failed: {}", self);
        (self.status_code(), Json(json!({ "error": self.user_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_failures_map_to_500() {
        let error = AppError::Api {
            status: 404,
            message: "Failed to fetch track from Spotify".into(),
        };
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::Auth("nope".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_bad_input_maps_to_400() {
        assert_eq!(
            AppError::InvalidSelection("no field sets selected".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
