//! Errors raised while talking to the statistics backend or the geocoder.

use thiserror::Error;
use weatherprob_core::{AppError, NetworkError};

/// The two failure classes a view distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or incomplete input; nothing was sent.
    Validation,
    /// The request was sent and failed.
    Request,
}

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("{0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// A 2xx body carrying an `error` field.
    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    Parse(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl StatsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::Request,
        }
    }

    /// The single message shown to the user for this failure.
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Api(msg) | Self::Parse(msg) => msg.clone(),
            Self::Http { message, .. } => message.clone(),
            Self::Network(e) => e.to_string(),
            Self::Cancelled => "Request cancelled".to_string(),
        }
    }

    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Network(e) => e.user_message().to_string(),
            Self::Http { status, .. } if *status >= 500 => {
                "The weather service failed to process this request.".to_string()
            }
            Self::Http { message, .. } => format!("Request rejected: {}", message),
            Self::Api(msg) => format!("Weather service error: {}", msg),
            Self::Parse(_) => "Received an unexpected response from the weather service.".to_string(),
            Self::Cancelled => "Request cancelled".to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::Validation(msg) => AppError::Validation(msg),
            StatsError::Network(e) => AppError::Network(e),
            StatsError::Http { status, message } => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            StatsError::Api(msg) => AppError::Service(msg),
            StatsError::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
            StatsError::Cancelled => AppError::Other(anyhow::anyhow!("Request cancelled")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(
            StatsError::Validation("pick a place".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(StatsError::Api("no data".into()).kind(), ErrorKind::Request);
        assert_eq!(StatsError::Network(NetworkError::Timeout).kind(), ErrorKind::Request);
    }

    #[test]
    fn test_detail_prefers_server_message() {
        let err = StatsError::Http {
            status: 400,
            message: "Missing required parameters".into(),
        };
        assert_eq!(err.detail(), "Missing required parameters");
        assert!(err.user_message().contains("Missing required parameters"));
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = StatsError::Http {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert!(matches!(
            app,
            AppError::Network(NetworkError::ServerError { status: 502, .. })
        ));

        let app: AppError = StatsError::Validation("missing".into()).into();
        assert!(app.is_validation());
    }
}
