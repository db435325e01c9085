use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout error after {0:?}")]
    TimeoutError(Duration),

    #[error("HTTP status {status} from {url}")]
    StatusError { status: u16, url: String },

    #[error("Failed to decode response from {url}: {reason}")]
    DecodeError { url: String, reason: String },

    #[error("Failed to build request: {0}")]
    RequestError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum HttpErrorType {
    NetworkError,
    TimeoutError,
    ServerError,
    ClientError,
    DecodeError,
    RequestError,
}

impl HttpError {
    pub fn error_type(&self) -> HttpErrorType {
        match self {
            HttpError::NetworkError(_) => HttpErrorType::NetworkError,
            HttpError::TimeoutError(_) => HttpErrorType::TimeoutError,
            HttpError::StatusError { status, .. } if *status >= 500 => HttpErrorType::ServerError,
            HttpError::StatusError { .. } => HttpErrorType::ClientError,
            HttpError::DecodeError { .. } => HttpErrorType::DecodeError,
            HttpError::RequestError(_) => HttpErrorType::RequestError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.error_type(),
            HttpErrorType::NetworkError | HttpErrorType::TimeoutError | HttpErrorType::ServerError
        )
    }
}
