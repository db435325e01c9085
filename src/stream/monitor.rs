use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::envelope::{FilterTag, FilteredEnvelope};
use super::error::StreamError;
use super::request::SubscriptionRequest;
use super::source::TransactionSource;
use crate::dex::{AmmDecoder, DecodedTransaction};
use crate::strategy::{QualifiedWallet, WalletQualifier};
use crate::whale::{OutflowCandidate, OutflowDecoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Subscribed,
    Streaming,
    Backoff,
    Stopped,
}

#[derive(Debug)]
pub enum RunOutcome {
    Qualified(Box<QualifiedWallet>),
    Cancelled,
}

/// Lets at most one pipeline run at a time. Busy means drop, never queue.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn try_admit(&self) -> Option<OwnedSemaphorePermit> {
        self.permits.clone().try_acquire_owned().ok()
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Work done for one admitted transaction.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    async fn handle(&self, tag: FilterTag, transaction: DecodedTransaction) -> Option<QualifiedWallet>;
}

/// Decode by filter tag, then qualify the resulting candidate.
pub struct TradePipeline {
    outflow: OutflowDecoder,
    amm: AmmDecoder,
    qualifier: WalletQualifier,
    shutdown: CancellationToken,
}

impl TradePipeline {
    pub fn new(
        outflow: OutflowDecoder,
        amm: AmmDecoder,
        qualifier: WalletQualifier,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            outflow,
            amm,
            qualifier,
            shutdown,
        }
    }

    async fn candidate(&self, tag: FilterTag, transaction: &DecodedTransaction) -> Option<OutflowCandidate> {
        match tag {
            FilterTag::HotWallet => match self.outflow.decode(transaction).await {
                Ok(candidate) => Some(candidate),
                Err(skip) => {
                    debug!("Skipped {}: {}", transaction.explorer_url(), skip);
                    None
                }
            },
            FilterTag::Raydium => match self.amm.decode(transaction) {
                Ok(trade) if trade.is_buy => {
                    info!(
                        "{} bought {} for {} SOL (first buy: {}) | {}",
                        trade.owner_address,
                        trade.mint_address,
                        trade.sol_amount,
                        trade.is_first_buy,
                        transaction.explorer_url()
                    );
                    Some(OutflowCandidate::from(trade))
                }
                Ok(trade) => {
                    debug!("Ignoring sell by {} | {}", trade.owner_address, transaction.explorer_url());
                    None
                }
                Err(skip) => {
                    debug!("Skipped {}: {}", transaction.explorer_url(), skip);
                    None
                }
            },
        }
    }
}

#[async_trait]
impl EnvelopeHandler for TradePipeline {
    async fn handle(&self, tag: FilterTag, transaction: DecodedTransaction) -> Option<QualifiedWallet> {
        if self.shutdown.is_cancelled() {
            return None;
        }

        let candidate = self.candidate(tag, &transaction).await?;
        let result = self.qualifier.qualify(&candidate).await;
        match result.metrics {
            Some(metrics) if result.status => {
                info!(
                    "Wallet {} qualified after receiving {} SOL | {}",
                    candidate.to_address,
                    candidate.sol_amount,
                    transaction.explorer_url()
                );
                Some(QualifiedWallet { candidate, metrics })
            }
            _ => {
                info!("{} | {}", result.reason, transaction.explorer_url());
                None
            }
        }
    }
}

/// Holds one subscription open, reconnecting after a fixed delay, until a
/// wallet qualifies or the shutdown token fires.
pub struct StreamSubscriber {
    source: Arc<dyn TransactionSource>,
    request: SubscriptionRequest,
    reconnect_delay: Duration,
    gate: AdmissionGate,
    handler: Arc<dyn EnvelopeHandler>,
    shutdown: CancellationToken,
    state: StreamState,
    in_flight: Option<JoinHandle<()>>,
    results_tx: mpsc::UnboundedSender<QualifiedWallet>,
    results_rx: mpsc::UnboundedReceiver<QualifiedWallet>,
}

impl StreamSubscriber {
    pub fn new(
        source: Arc<dyn TransactionSource>,
        request: SubscriptionRequest,
        reconnect_delay: Duration,
        handler: Arc<dyn EnvelopeHandler>,
        shutdown: CancellationToken,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            source,
            request,
            reconnect_delay,
            gate: AdmissionGate::new(),
            handler,
            shutdown,
            state: StreamState::Connecting,
            in_flight: None,
            results_tx,
            results_rx,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub async fn run(&mut self) -> Result<RunOutcome, StreamError> {
        let shutdown = self.shutdown.clone();
        loop {
            self.state = StreamState::Connecting;
            let result = tokio::select! {
                _ = shutdown.cancelled() => None,
                result = self.stream_once() => Some(result),
            };
            let Some(result) = result else {
                return Ok(self.finish().await);
            };

            match result {
                Ok(()) => warn!("Stream closed by remote"),
                Err(e) if !e.is_transient() => {
                    error!("Fatal stream error: {}", e);
                    shutdown.cancel();
                    self.finish().await;
                    return Err(e);
                }
                Err(e) => error!("Stream error: {}", e),
            }

            self.state = StreamState::Backoff;
            warn!("Restarting stream in {:?}", self.reconnect_delay);
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(self.finish().await),
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    async fn stream_once(&mut self) -> Result<(), StreamError> {
        let mut subscription = self.source.subscribe(&self.request).await?;
        self.state = StreamState::Subscribed;
        info!("Subscribed with {} transaction filter(s)", self.request.filters.len());

        while let Some(message) = subscription.next_message().await {
            self.state = StreamState::Streaming;
            self.dispatch(message?);
        }
        Ok(())
    }

    fn dispatch(&mut self, envelope: FilteredEnvelope) {
        let tag = envelope.tag();
        let (Some(tag), Some(transaction)) = (tag, envelope.transaction) else {
            return;
        };

        let Some(permit) = self.gate.try_admit() else {
            debug!("Pipeline busy, dropping {}", transaction.signature);
            return;
        };

        let handler = Arc::clone(&self.handler);
        let results = self.results_tx.clone();
        let shutdown = self.shutdown.clone();
        // The gate guarantees any previous task is done with its work.
        self.in_flight = Some(tokio::spawn(async move {
            let _permit = permit;
            if let Some(wallet) = handler.handle(tag, transaction).await {
                let _ = results.send(wallet);
                shutdown.cancel();
            }
        }));
    }

    /// Wait for the admitted pipeline, then report what it produced.
    async fn finish(&mut self) -> RunOutcome {
        self.state = StreamState::Stopped;
        if let Some(task) = self.in_flight.take() {
            if let Err(e) = task.await {
                error!("Pipeline task failed: {}", e);
            }
        }
        match self.results_rx.try_recv() {
            Ok(wallet) => RunOutcome::Qualified(Box::new(wallet)),
            Err(_) => RunOutcome::Cancelled,
        }
    }
}
