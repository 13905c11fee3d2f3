use thiserror::Error;

/// Transport-level failures surfaced by the API client.
///
/// Validation problems never become an `AppError` - they are caught before a
/// request is issued and handled by the dialogue layer.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Parse(String),
}

impl AppError {
    /// The message shown to the user: the server-provided one when the
    /// backend sent it, a generic fallback otherwise.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Auth(_) => "Your session has expired. Please log in again.".to_string(),
            AppError::BadRequest(msg) | AppError::Server { message: msg, .. }
                if !msg.is_empty() =>
            {
                msg.clone()
            }
            AppError::Timeout(_) => {
                "The request timed out. Please check your connection and try again.".to_string()
            }
            _ => "Something went wrong. Please try again later.".to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Auth(_))
    }
}
