pub mod client;
pub mod error;
pub mod retry;

pub use client::HttpClient;
pub use error::{HttpError, HttpErrorType};
pub use retry::{RetryConfig, RetryHandler};
