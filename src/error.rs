use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport failure that survived every retry attempt.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid playlist URL: {0}")]
    InvalidPlaylistUrl(String),

    #[error("Invalid field selection: {0}")]
    InvalidSelection(String),
}

impl AppError {
    /// Message forwarded to the user, without status decorations.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_user_message_drops_status() {
        let error = AppError::Api {
            status: 404,
            message: "Failed to fetch track from Spotify".to_string(),
        };

        assert_eq!(error.user_message(), "Failed to fetch track from Spotify");
        assert_eq!(
            error.to_string(),
            "Failed to fetch track from Spotify (status 404)"
        );
    }

    #[test]
    fn test_auth_error_display() {
        let error = AppError::Auth("token endpoint returned 400".into());
        assert_eq!(
            error.user_message(),
            "Authentication failed: token endpoint returned 400"
        );
    }
}
