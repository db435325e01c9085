use log::info;

use super::cache::{DedupStore, InsertOutcome};
use super::types::{OutflowCandidate, Skip};
use crate::config::OutflowConfig;
use crate::constants::{COMPUTE_BUDGET_PROGRAM, LAMPORTS_PER_SOL};
use crate::dex::DecodedTransaction;

// The monitored hot wallet sits at index 0 and the receiver at index 2.
const SENDER_INDEX: usize = 0;
const COUNTERPARTY_INDEX: usize = 2;

/// Detects large SOL transfers out of the monitored hot wallet.
#[derive(Debug, Clone)]
pub struct OutflowDecoder {
    sol_threshold: f64,
    seen_destinations: DedupStore,
}

impl OutflowDecoder {
    pub fn new(config: &OutflowConfig, seen_destinations: DedupStore) -> Self {
        Self {
            sol_threshold: config.sol_threshold,
            seen_destinations,
        }
    }

    pub async fn decode(&self, transaction: &DecodedTransaction) -> Result<OutflowCandidate, Skip> {
        if transaction.failed {
            return Err(Skip::Failed);
        }
        if !transaction.pre_token_balances.is_empty() {
            return Err(Skip::TokenTransfer);
        }

        let (Some(destination), Some(pre), Some(post)) = (
            transaction.account_key(COUNTERPARTY_INDEX),
            transaction.pre_balances.get(COUNTERPARTY_INDEX),
            transaction.post_balances.get(COUNTERPARTY_INDEX),
        ) else {
            return Err(Skip::MissingCounterparty);
        };

        let sol_amount = (*post as i128 - *pre as i128) as f64 / LAMPORTS_PER_SOL;
        if sol_amount <= self.sol_threshold {
            return Err(Skip::BelowThreshold {
                amount: sol_amount,
                threshold: self.sol_threshold,
            });
        }
        if destination == COMPUTE_BUDGET_PROGRAM {
            return Err(Skip::ComputeBudgetDestination);
        }
        if self.seen_destinations.insert(destination).await == InsertOutcome::AlreadyExists {
            return Err(Skip::AlreadySeen(destination.to_string()));
        }

        info!("{}", transaction.explorer_url());
        info!(
            "from {} => {} sent {} SOL",
            transaction.account_key(SENDER_INDEX).unwrap_or_default(),
            destination,
            sol_amount
        );

        Ok(OutflowCandidate {
            txn: transaction.signature.clone(),
            sol_amount,
            to_address: destination.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::TokenBalance;

    const HOT_WALLET: &str = "5tzFkiKscXHK5ZXCGbXZxdw7gTjjD1mBwuoFbhUvuAi9";
    const RECEIVER: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

    fn decoder(threshold: f64) -> OutflowDecoder {
        OutflowDecoder::new(&OutflowConfig { sol_threshold: threshold }, DedupStore::new())
    }

    fn transfer(pre: u64, post: u64, receiver: &str) -> DecodedTransaction {
        DecodedTransaction {
            signature: "5sig".to_string(),
            account_keys: vec![
                HOT_WALLET.to_string(),
                "11111111111111111111111111111111".to_string(),
                receiver.to_string(),
            ],
            pre_balances: vec![100_000_000_000, 1, pre],
            post_balances: vec![98_000_000_000, 1, post],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sol_delta_in_whole_sol() {
        let candidate = decoder(1.0)
            .decode(&transfer(5_000_000_000, 7_000_000_000, RECEIVER))
            .await
            .unwrap();
        assert_eq!(candidate.sol_amount, 2.0);
        assert_eq!(candidate.to_address, RECEIVER);
        assert_eq!(candidate.txn, "5sig");
    }

    #[tokio::test]
    async fn test_threshold_is_exclusive() {
        let result = decoder(2.0)
            .decode(&transfer(5_000_000_000, 7_000_000_000, RECEIVER))
            .await;
        assert!(matches!(result, Err(Skip::BelowThreshold { .. })));
    }

    #[tokio::test]
    async fn test_destination_recorded_once() {
        let decoder = decoder(1.0);
        let tx = transfer(0, 3_000_000_000, RECEIVER);
        assert!(decoder.decode(&tx).await.is_ok());
        assert_eq!(
            decoder.decode(&tx).await,
            Err(Skip::AlreadySeen(RECEIVER.to_string()))
        );
    }

    #[tokio::test]
    async fn test_rejected_transfer_does_not_record() {
        let store = DedupStore::new();
        let decoder = OutflowDecoder::new(&OutflowConfig { sol_threshold: 10.0 }, store.clone());
        let _ = decoder.decode(&transfer(0, 3_000_000_000, RECEIVER)).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_compute_budget_destination() {
        let result = decoder(1.0)
            .decode(&transfer(0, 3_000_000_000, COMPUTE_BUDGET_PROGRAM))
            .await;
        assert_eq!(result, Err(Skip::ComputeBudgetDestination));
    }

    #[tokio::test]
    async fn test_token_transfer_skipped() {
        let mut tx = transfer(0, 3_000_000_000, RECEIVER);
        tx.pre_token_balances.push(TokenBalance {
            account_index: 1,
            owner: HOT_WALLET.to_string(),
            mint: "mint".to_string(),
            ui_amount: 1.0,
        });
        assert_eq!(decoder(1.0).decode(&tx).await, Err(Skip::TokenTransfer));
    }

    #[tokio::test]
    async fn test_short_account_table() {
        let tx = DecodedTransaction {
            account_keys: vec![HOT_WALLET.to_string()],
            pre_balances: vec![1],
            post_balances: vec![1],
            ..Default::default()
        };
        assert_eq!(decoder(1.0).decode(&tx).await, Err(Skip::MissingCounterparty));
    }
}
