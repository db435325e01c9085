use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use super::types::{QualificationResult, WalletMetrics};
use crate::whale::{DedupStore, InsertOutcome, OutflowCandidate};

/// One way of scoring a wallet. `Err` carries the disqualification reason.
#[async_trait]
pub trait QualificationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn evaluate(&self, candidate: &OutflowCandidate) -> Result<WalletMetrics, String>;
}

/// Ordered filter chain in front of the configured strategy.
#[derive(Clone)]
pub struct WalletQualifier {
    min_candidate_sol: f64,
    processed: DedupStore,
    strategy: Arc<dyn QualificationStrategy>,
    shutdown: CancellationToken,
}

impl WalletQualifier {
    pub fn new(min_candidate_sol: f64, processed: DedupStore, strategy: Arc<dyn QualificationStrategy>) -> Self {
        Self {
            min_candidate_sol,
            processed,
            strategy,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop claiming wallets once `shutdown` is cancelled.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub async fn qualify(&self, candidate: &OutflowCandidate) -> QualificationResult {
        let wallet = &candidate.to_address;

        if candidate.sol_amount < self.min_candidate_sol {
            return QualificationResult::fail(format!(
                "Wallet {} does not meet SOL amount criteria: sol_amount {} < {}",
                wallet, candidate.sol_amount, self.min_candidate_sol
            ));
        }

        if self.shutdown.is_cancelled() {
            return QualificationResult::fail(format!("Wallet {} not processed: shutting down", wallet));
        }

        // Claim the wallet before any network call.
        if self.processed.insert(wallet).await == InsertOutcome::AlreadyExists {
            return QualificationResult::fail(format!("Wallet {} was already processed", wallet));
        }

        debug!("Processing wallet {} with {} strategy", wallet, self.strategy.name());
        match self.strategy.evaluate(candidate).await {
            Ok(metrics) => {
                info!("Qualified wallet: {}", wallet);
                QualificationResult::pass(metrics)
            }
            Err(reason) => QualificationResult::fail(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::types::WalletStats;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingStrategy {
        calls: AtomicUsize,
        pass: bool,
    }

    #[async_trait]
    impl QualificationStrategy for CountingStrategy {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn evaluate(&self, _candidate: &OutflowCandidate) -> Result<WalletMetrics, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.pass {
                Ok(WalletMetrics::Stats(WalletStats::default()))
            } else {
                Err("winrate 0.1 < 0.5".to_string())
            }
        }
    }

    fn candidate(address: &str, sol_amount: f64) -> OutflowCandidate {
        OutflowCandidate {
            txn: "sig".to_string(),
            sol_amount,
            to_address: address.to_string(),
        }
    }

    fn qualifier(pass: bool) -> (WalletQualifier, Arc<CountingStrategy>) {
        let strategy = Arc::new(CountingStrategy {
            calls: AtomicUsize::new(0),
            pass,
        });
        (WalletQualifier::new(1.0, DedupStore::new(), strategy.clone()), strategy)
    }

    #[tokio::test]
    async fn test_second_call_already_processed() {
        for pass in [true, false] {
            let (qualifier, _) = qualifier(pass);
            let first = qualifier.qualify(&candidate("A", 5.0)).await;
            assert_eq!(first.status, pass);

            let second = qualifier.qualify(&candidate("A", 5.0)).await;
            assert!(!second.status);
            assert!(second.reason.contains("already processed"));
            assert!(second.metrics.is_none());
        }
    }

    #[tokio::test]
    async fn test_small_amount_rejected_before_claim() {
        let (qualifier, strategy) = qualifier(true);
        let result = qualifier.qualify(&candidate("A", 0.5)).await;
        assert!(!result.status);
        assert!(result.reason.contains("sol_amount 0.5 < 1"));
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 0);

        // The wallet was not claimed by the rejected call.
        assert!(qualifier.qualify(&candidate("A", 5.0)).await.status);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_qualify_evaluates_once() {
        let (qualifier, strategy) = qualifier(true);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let qualifier = qualifier.clone();
                tokio::spawn(async move { qualifier.qualify(&candidate("A", 5.0)).await })
            })
            .collect();

        let mut evaluated = 0;
        for handle in handles {
            let result = handle.await.unwrap();
            if !result.reason.contains("already processed") {
                evaluated += 1;
            }
        }
        assert_eq!(evaluated, 1);
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reason_passed_through() {
        let (qualifier, _) = qualifier(false);
        let result = qualifier.qualify(&candidate("B", 5.0)).await;
        assert_eq!(result.reason, "winrate 0.1 < 0.5");
    }

    #[tokio::test]
    async fn test_cancelled_qualifier_claims_nothing() {
        let strategy = Arc::new(CountingStrategy {
            calls: AtomicUsize::new(0),
            pass: true,
        });
        let processed = DedupStore::new();
        let shutdown = CancellationToken::new();
        let qualifier = WalletQualifier::new(1.0, processed.clone(), strategy.clone()).with_shutdown(shutdown.clone());

        shutdown.cancel();
        let result = qualifier.qualify(&candidate("A", 5.0)).await;
        assert!(!result.status);
        assert!(result.reason.contains("shutting down"));
        assert!(processed.is_empty().await);
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 0);
    }
}
