use std::time::Duration;

use log::warn;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

use super::error::HttpError;
use super::retry::{RetryConfig, RetryHandler};
use crate::config::HttpConfig;

const API_KEY_HEADER: &str = "x-api-key";

/// JSON over HTTP. Failures surface as `None` after retries are spent.
#[derive(Clone)]
pub struct HttpClient {
    http_client: reqwest::Client,
    api_key: Option<Zeroizing<String>>,
    timeout: Duration,
    get_retry: RetryHandler,
    post_retry: RetryHandler,
}

impl HttpClient {
    pub fn new(config: &HttpConfig, api_key: Option<Zeroizing<String>>) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| HttpError::RequestError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            timeout: config.timeout,
            get_retry: RetryHandler::new(RetryConfig::for_get()),
            post_retry: RetryHandler::new(RetryConfig::for_post()),
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        match self.get_retry.retry(|| self.send_get::<T>(url)).await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("GET {} failed: {}", url, err);
                None
            }
        }
    }

    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Option<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match self.post_retry.retry(|| self.send_post::<B, T>(url, body)).await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("POST {} failed: {}", url, err);
                None
            }
        }
    }

    async fn send_get<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let response = self
            .authorized(self.http_client.get(url))
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        Self::decode(url, response).await
    }

    async fn send_post<B, T>(&self, url: &str, body: &B) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .authorized(self.http_client.post(url))
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        Self::decode(url, response).await
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.as_str()),
            None => request,
        }
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T, HttpError> {
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::StatusError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.json::<T>().await.map_err(|e| HttpError::DecodeError {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn map_error(&self, error: reqwest::Error) -> HttpError {
        if error.is_timeout() {
            HttpError::TimeoutError(self.timeout)
        } else if error.is_builder() {
            HttpError::RequestError(error.to_string())
        } else {
            HttpError::NetworkError(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn content_length(head: &str) -> usize {
        head.lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Answer a single request with `status` and `body`, returning the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let read = socket.read(&mut chunk).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..read]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    if request.len() >= end + 4 + content_length(&text[..end]) {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (url, handle)
    }

    fn config() -> HttpConfig {
        HttpConfig {
            timeout: Duration::from_millis(200),
            user_agent: "outflow-test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_absent() {
        let client = HttpClient::new(&config(), None).unwrap();
        let value: Option<serde_json::Value> = client.get_json("not a url").await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_post_json_sends_body_and_key() {
        let (url, server) = serve_once("200 OK", r#"{"accepted":true}"#).await;
        let client = HttpClient::new(&config(), Some(Zeroizing::new("secret".to_string()))).unwrap();

        let reply: Option<serde_json::Value> = client
            .post_json(&format!("{}/wallets", url), &json!({"address": "W"}))
            .await;
        assert_eq!(reply, Some(json!({"accepted": true})));

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /wallets HTTP/1.1"));
        assert!(lower.contains("x-api-key: secret"));
        assert!(lower.contains("accept: application/json"));
        assert!(request.ends_with(r#"{"address":"W"}"#));
    }

    #[tokio::test]
    async fn test_post_json_client_error_is_absent() {
        let (url, server) = serve_once("404 Not Found", r#"{"error":"unknown"}"#).await;
        let client = HttpClient::new(&config(), None).unwrap();

        let reply: Option<serde_json::Value> = client.post_json(&url, &json!({})).await;
        assert!(reply.is_none());
        assert!(server.await.unwrap().starts_with("POST / HTTP/1.1"));
    }
}
