use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;

use crate::config::PriceFeedConfig;

/// Single read of the latest SOL/USD price.
pub trait PriceOracle: Send + Sync {
    fn current_price(&self) -> f64;
}

#[derive(Debug, Deserialize)]
struct TickerMessage {
    #[serde(rename = "type")]
    kind: String,
    price: Option<String>,
}

/// Coinbase ticker feed. Reads zero until the first tick arrives.
#[derive(Debug, Clone)]
pub struct SolPriceFeed {
    url: String,
    product_id: String,
    reconnect_delay: Duration,
    price_bits: Arc<AtomicU64>,
}

impl SolPriceFeed {
    pub fn new(config: &PriceFeedConfig) -> Self {
        Self {
            url: config.url.clone(),
            product_id: config.product_id.clone(),
            reconnect_delay: config.reconnect_delay,
            price_bits: Arc::new(AtomicU64::new(0f64.to_bits())),
        }
    }

    pub fn spawn(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let feed = self.clone();
        tokio::spawn(async move { feed.run(shutdown).await })
    }

    async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.stream_once() => match result {
                    Ok(()) => warn!("Price feed closed by remote"),
                    Err(e) => error!("Price feed error: {}", e),
                },
            }
            info!("Reconnecting price feed in {:?}", self.reconnect_delay);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
        info!("Price feed stopped");
    }

    async fn stream_once(&self) -> Result<(), WsError> {
        let (socket, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = socket.split();

        let subscribe = json!({
            "type": "subscribe",
            "product_ids": [self.product_id],
            "channels": ["ticker"],
        });
        write.send(Message::Text(subscribe.to_string().into())).await?;
        info!("Subscribed to {} ticker at {}", self.product_id, self.url);

        while let Some(message) = read.next().await {
            match message? {
                Message::Text(text) => {
                    self.apply_message(&text);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok(())
    }

    /// Record the price carried by a ticker message.
    pub fn apply_message(&self, text: &str) -> Option<f64> {
        let message: TickerMessage = serde_json::from_str(text).ok()?;
        if message.kind != "ticker" {
            return None;
        }
        let price = message
            .price?
            .parse::<f64>()
            .ok()
            .filter(|price| price.is_finite() && *price > 0.0)?;
        self.price_bits.store(price.to_bits(), Ordering::Relaxed);
        Some(price)
    }
}

impl PriceOracle for SolPriceFeed {
    fn current_price(&self) -> f64 {
        f64::from_bits(self.price_bits.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> SolPriceFeed {
        SolPriceFeed::new(&PriceFeedConfig {
            url: "wss://ws-feed.exchange.coinbase.com".to_string(),
            product_id: "SOL-USD".to_string(),
            reconnect_delay: Duration::from_secs(5),
        })
    }

    #[test]
    fn test_ticker_updates_price() {
        let feed = feed();
        assert_eq!(feed.current_price(), 0.0);

        let tick = r#"{"type":"ticker","product_id":"SOL-USD","price":"187.42","sequence":1}"#;
        assert_eq!(feed.apply_message(tick), Some(187.42));
        assert_eq!(feed.current_price(), 187.42);
        assert_eq!(feed.clone().current_price(), 187.42);
    }

    #[test]
    fn test_non_ticker_messages_ignored() {
        let feed = feed();
        let ack = r#"{"type":"subscriptions","channels":[{"name":"ticker","product_ids":["SOL-USD"]}]}"#;
        assert_eq!(feed.apply_message(ack), None);
        assert_eq!(feed.apply_message("not json"), None);
        assert_eq!(feed.apply_message(r#"{"type":"ticker","price":"abc"}"#), None);
        assert_eq!(feed.current_price(), 0.0);
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let handle = feed().spawn(shutdown);
        handle.await.unwrap();
    }
}
