use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dex::TradeEvent;

/// A wallet that just received SOL, handed to the qualifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutflowCandidate {
    pub txn: String,
    pub sol_amount: f64,
    pub to_address: String,
}

impl From<TradeEvent> for OutflowCandidate {
    fn from(trade: TradeEvent) -> Self {
        Self {
            txn: trade.signature,
            sol_amount: trade.sol_amount,
            to_address: trade.owner_address,
        }
    }
}

/// Why a hot-wallet transaction produced no candidate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Skip {
    #[error("transaction failed on chain")]
    Failed,

    #[error("token transfer, not a plain SOL transfer")]
    TokenTransfer,

    #[error("no counterparty at account index 2")]
    MissingCounterparty,

    #[error("moved {amount} SOL, threshold {threshold} SOL")]
    BelowThreshold { amount: f64, threshold: f64 },

    #[error("destination is the compute budget program")]
    ComputeBudgetDestination,

    #[error("destination {0} already seen")]
    AlreadySeen(String),
}
