use async_trait::async_trait;

use super::types::{Holdings, PnlResponse, WalletStats};
use crate::http::HttpClient;

/// External wallet data. `None` covers transport, status and decode failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletDataProvider: Send + Sync {
    async fn wallet_stats(&self, address: &str) -> Option<WalletStats>;
    async fn holdings(&self, address: &str) -> Option<Holdings>;
    async fn pnl(&self, address: &str) -> Option<PnlResponse>;
}

pub struct HttpWalletProvider {
    http: HttpClient,
    stats_url: String,
    tracker_url: String,
}

impl HttpWalletProvider {
    pub fn new(http: HttpClient, stats_url: &str, tracker_url: &str) -> Self {
        Self {
            http,
            stats_url: stats_url.trim_end_matches('/').to_string(),
            tracker_url: tracker_url.trim_end_matches('/').to_string(),
        }
    }

    fn stats_endpoint(&self, address: &str) -> String {
        format!("{}/wallet/stats?address={}", self.stats_url, address)
    }

    fn holdings_endpoint(&self, address: &str) -> String {
        format!("{}/wallet/{}/basic", self.tracker_url, address)
    }

    fn pnl_endpoint(&self, address: &str) -> String {
        format!("{}/pnl/{}?showHistoricPnL=true", self.tracker_url, address)
    }
}

#[async_trait]
impl WalletDataProvider for HttpWalletProvider {
    async fn wallet_stats(&self, address: &str) -> Option<WalletStats> {
        self.http.get_json(&self.stats_endpoint(address)).await
    }

    async fn holdings(&self, address: &str) -> Option<Holdings> {
        self.http.get_json(&self.holdings_endpoint(address)).await
    }

    async fn pnl(&self, address: &str) -> Option<PnlResponse> {
        self.http.get_json(&self.pnl_endpoint(address)).await
    }
}
