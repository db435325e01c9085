use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, QualifierMode};
use crate::dex::AmmDecoder;
use crate::feed::SolPriceFeed;
use crate::http::{HttpClient, HttpError};
use crate::stream::{StreamSubscriber, SubscriptionRequest, TradePipeline, TransactionSource};
use crate::strategy::{
    HttpWalletProvider,
    PnlStrategy,
    QualificationStrategy,
    StatsStrategy,
    WalletDataProvider,
    WalletQualifier,
};
use crate::whale::{DedupStore, OutflowDecoder};

/// Everything shared by the pipeline, built once at startup.
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub outflow_seen: DedupStore,
    pub processed_wallets: DedupStore,
    pub http: HttpClient,
    pub price_feed: SolPriceFeed,
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Result<Self, HttpError> {
        let http = HttpClient::new(&config.http, config.qualifier.tracker_api_key.clone())?;
        let price_feed = SolPriceFeed::new(&config.price_feed);
        Ok(Self {
            config: Arc::new(config),
            outflow_seen: DedupStore::new(),
            processed_wallets: DedupStore::new(),
            http,
            price_feed,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn provider(&self) -> Arc<dyn WalletDataProvider> {
        let qualifier = &self.config.qualifier;
        Arc::new(HttpWalletProvider::new(
            self.http.clone(),
            &qualifier.stats_api_url,
            &qualifier.tracker_api_url,
        ))
    }

    pub fn qualifier(&self, provider: Arc<dyn WalletDataProvider>) -> WalletQualifier {
        let qualifier = &self.config.qualifier;
        let strategy: Arc<dyn QualificationStrategy> = match qualifier.mode {
            QualifierMode::Stats => Arc::new(StatsStrategy::new(provider, qualifier.stats.clone())),
            QualifierMode::Pnl => Arc::new(PnlStrategy::new(
                provider,
                Arc::new(self.price_feed.clone()),
                qualifier.pnl.clone(),
                qualifier.free_plan_delay,
            )),
        };
        WalletQualifier::new(qualifier.min_candidate_sol, self.processed_wallets.clone(), strategy)
            .with_shutdown(self.shutdown.clone())
    }

    pub fn pipeline(&self, provider: Arc<dyn WalletDataProvider>) -> TradePipeline {
        TradePipeline::new(
            OutflowDecoder::new(&self.config.outflow, self.outflow_seen.clone()),
            AmmDecoder::new(),
            self.qualifier(provider),
            self.shutdown.clone(),
        )
    }

    pub fn subscriber(
        &self,
        source: Arc<dyn TransactionSource>,
        provider: Arc<dyn WalletDataProvider>,
    ) -> StreamSubscriber {
        StreamSubscriber::new(
            source,
            SubscriptionRequest::from_config(&self.config.stream),
            self.config.stream.reconnect_delay,
            Arc::new(self.pipeline(provider)),
            self.shutdown.clone(),
        )
    }
}
