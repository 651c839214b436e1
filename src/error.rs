#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("start.gg API error: {0}")]
    StartGg(String),

    /// `status` is set when Discord answered with a non-success HTTP status.
    #[error("Discord error: {message}")]
    Discord { status: Option<u16>, message: String },
}

impl AppError {
    /// A Discord failure that never got an HTTP status (transport, decoding).
    pub fn discord(message: impl Into<String>) -> Self {
        AppError::Discord {
            status: None,
            message: message.into(),
        }
    }

    /// A non-success response from the Discord API.
    pub fn discord_api(status: reqwest::StatusCode, body: &str) -> Self {
        AppError::Discord {
            status: Some(status.as_u16()),
            message: format!("Discord API error ({}): {}", status, body),
        }
    }

    /// HTTP status of a rejected Discord request, if any.
    pub fn discord_status(&self) -> Option<u16> {
        match self {
            AppError::Discord { status, .. } => *status,
            _ => None,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
