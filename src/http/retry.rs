use std::future::Future;

use tokio::time::Duration;

use super::error::{HttpError, HttpErrorType};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub retry_on_errors: Vec<HttpErrorType>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            retry_on_errors: vec![
                HttpErrorType::NetworkError,
                HttpErrorType::TimeoutError,
                HttpErrorType::ServerError,
            ],
        }
    }
}

impl RetryConfig {
    /// One retry after the first attempt.
    pub fn for_get() -> Self {
        Self {
            max_attempts: 2,
            ..Self::default()
        }
    }

    /// Three retries after the first attempt.
    pub fn for_post() -> Self {
        Self {
            max_attempts: 4,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryHandler {
    config: RetryConfig,
}

impl RetryHandler {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub async fn retry<F, Fut, T>(&self, operation: F) -> Result<T, HttpError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, HttpError>>,
    {
        let mut attempts = 0;
        let mut delay = self.config.initial_delay;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !self.should_retry(&error) || attempts >= self.config.max_attempts {
                        return Err(error);
                    }

                    log::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempts,
                        self.config.max_attempts,
                        error,
                        delay
                    );

                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(
                        delay.mul_f64(self.config.backoff_factor),
                        self.config.max_delay,
                    );
                }
            }
        }
    }

    fn should_retry(&self, error: &HttpError) -> bool {
        self.config.retry_on_errors.contains(&error.error_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_exhausted() {
        let handler = RetryHandler::new(RetryConfig::for_post());
        let calls = AtomicU32::new(0);

        let result: Result<(), HttpError> = handler
            .retry(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(HttpError::NetworkError("reset".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let handler = RetryHandler::new(RetryConfig::for_get());
        let calls = AtomicU32::new(0);

        let result = handler
            .retry(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(HttpError::StatusError { status: 502, url: "u".into() })
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let handler = RetryHandler::new(RetryConfig::for_post());
        let calls = AtomicU32::new(0);

        let result: Result<(), HttpError> = handler
            .retry(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(HttpError::StatusError { status: 404, url: "u".into() })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
