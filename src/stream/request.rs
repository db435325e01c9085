use std::collections::{BTreeMap, HashMap};

use yellowstone_grpc_proto::prelude::{CommitmentLevel, SubscribeRequest, SubscribeRequestFilterTransactions};

use super::envelope::FilterTag;
use crate::config::StreamConfig;
use crate::constants::RAYDIUM_AMM_V4;

/// Account constraints of one named transaction filter.
///
/// Addresses are OR-ed within a list and the lists are AND-ed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub account_include: Vec<String>,
    pub account_exclude: Vec<String>,
    pub account_required: Vec<String>,
    pub failed: Option<bool>,
    pub vote: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Commitment {
    #[default]
    Processed,
    Confirmed,
    Finalized,
}

impl From<Commitment> for CommitmentLevel {
    fn from(commitment: Commitment) -> Self {
        match commitment {
            Commitment::Processed => CommitmentLevel::Processed,
            Commitment::Confirmed => CommitmentLevel::Confirmed,
            Commitment::Finalized => CommitmentLevel::Finalized,
        }
    }
}

/// The single subscription a process issues, replayed on every reconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub filters: BTreeMap<FilterTag, TransactionFilter>,
    pub commitment: Commitment,
}

impl SubscriptionRequest {
    pub fn from_config(config: &StreamConfig) -> Self {
        let mut filters = BTreeMap::new();
        filters.insert(
            FilterTag::HotWallet,
            TransactionFilter {
                account_include: vec![config.hot_wallet.clone()],
                failed: Some(false),
                ..Default::default()
            },
        );
        if config.watch_raydium {
            filters.insert(
                FilterTag::Raydium,
                TransactionFilter {
                    account_include: vec![RAYDIUM_AMM_V4.to_string()],
                    failed: Some(false),
                    vote: Some(false),
                    ..Default::default()
                },
            );
        }

        Self {
            filters,
            commitment: Commitment::Processed,
        }
    }

    pub fn to_proto(&self) -> SubscribeRequest {
        let transactions: HashMap<String, SubscribeRequestFilterTransactions> = self
            .filters
            .iter()
            .map(|(tag, filter)| {
                (
                    tag.as_str().to_string(),
                    SubscribeRequestFilterTransactions {
                        vote: filter.vote,
                        failed: filter.failed,
                        signature: None,
                        account_include: filter.account_include.clone(),
                        account_exclude: filter.account_exclude.clone(),
                        account_required: filter.account_required.clone(),
                    },
                )
            })
            .collect();

        SubscribeRequest {
            transactions,
            commitment: Some(CommitmentLevel::from(self.commitment) as i32),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn stream_config(watch_raydium: bool) -> StreamConfig {
        StreamConfig {
            endpoint: "https://grpc.example.com".to_string(),
            x_token: None,
            hot_wallet: "5tzFkiKscXHK5ZXCGbXZxdw7gTjjD1mBwuoFbhUvuAi9".to_string(),
            watch_raydium,
            reconnect_delay: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_hot_wallet_filter_only() {
        let request = SubscriptionRequest::from_config(&stream_config(false));
        let proto = request.to_proto();

        assert_eq!(proto.transactions.len(), 1);
        let filter = &proto.transactions["hot_wallet"];
        assert_eq!(filter.account_include, vec!["5tzFkiKscXHK5ZXCGbXZxdw7gTjjD1mBwuoFbhUvuAi9".to_string()]);
        assert_eq!(filter.failed, Some(false));
        assert_eq!(proto.commitment, Some(CommitmentLevel::Processed as i32));
        assert!(proto.accounts.is_empty());
    }

    #[test]
    fn test_raydium_filter_added() {
        let proto = SubscriptionRequest::from_config(&stream_config(true)).to_proto();
        assert_eq!(proto.transactions.len(), 2);
        assert_eq!(proto.transactions["raydium"].account_include, vec![RAYDIUM_AMM_V4.to_string()]);
        assert_eq!(proto.transactions["raydium"].vote, Some(false));
    }
}
