use thiserror::Error;

/// Fallback text when the backend gives us nothing usable
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors raised at the remote adapter boundary
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Please sign in to continue")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Non-success status with the backend's message, if it sent one
    #[error("Request failed ({status}): {}", message.as_deref().unwrap_or(GENERIC_MESSAGE))]
    Remote { status: u16, message: Option<String> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build an error from a failed response status and its body
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .filter(|m| !m.trim().is_empty());

        let quota = message
            .as_deref()
            .map(|m| m.to_ascii_lowercase().contains("quota"))
            .unwrap_or(false);

        match status {
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound(message.unwrap_or_else(|| "resource".to_string())),
            413 | 507 => ApiError::QuotaExceeded(message.unwrap_or_else(|| "payload too large".to_string())),
            _ if quota => ApiError::QuotaExceeded(message.unwrap_or_default()),
            _ => ApiError::Remote { status, message },
        }
    }

    /// Text suitable for a toast or inline banner
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Please sign in to continue.".to_string(),
            ApiError::NotFound(_) => "We couldn't find what you were looking for.".to_string(),
            ApiError::QuotaExceeded(_) => {
                "Storage limit reached. Try fewer or smaller media files.".to_string()
            }
            ApiError::Remote { message: Some(m), .. } => m.clone(),
            _ => GENERIC_MESSAGE.to_string(),
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, ApiError::QuotaExceeded(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
