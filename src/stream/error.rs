use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("Invalid endpoint configuration: {0}")]
    InvalidEndpoint(String),

    #[error("Connection failed: {0}")]
    ConnectError(String),

    #[error("Subscribe failed: {0}")]
    SubscribeError(String),

    #[error("Stream transport error: {0}")]
    TransportError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamErrorType {
    InvalidEndpoint,
    ConnectError,
    SubscribeError,
    TransportError,
}

impl StreamError {
    pub fn error_type(&self) -> StreamErrorType {
        match self {
            StreamError::InvalidEndpoint(_) => StreamErrorType::InvalidEndpoint,
            StreamError::ConnectError(_) => StreamErrorType::ConnectError,
            StreamError::SubscribeError(_) => StreamErrorType::SubscribeError,
            StreamError::TransportError(_) => StreamErrorType::TransportError,
        }
    }

    /// Transient errors send the subscriber into backoff; the rest end the run.
    pub fn is_transient(&self) -> bool {
        !matches!(self.error_type(), StreamErrorType::InvalidEndpoint)
    }
}
