use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use yellowstone_grpc_proto::prelude::{
    subscribe_update::UpdateOneof, CompiledInstruction, InnerInstruction, InnerInstructions,
    SubscribeUpdate, SubscribeUpdateTransactionInfo, TokenBalance as ProtoTokenBalance,
};

use crate::dex::{CompiledIx, DecodedTransaction, InnerIxGroup, TokenBalance};

/// Subscription filters this service registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterTag {
    HotWallet,
    Raydium,
}

impl FilterTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterTag::HotWallet => "hot_wallet",
            FilterTag::Raydium => "raydium",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hot_wallet" => Some(FilterTag::HotWallet),
            "raydium" => Some(FilterTag::Raydium),
            _ => None,
        }
    }
}

/// A transaction update together with the filters it matched.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredEnvelope {
    pub filters: Vec<String>,
    pub transaction: Option<DecodedTransaction>,
}

impl FilteredEnvelope {
    /// Routing tag, taken from the first matched filter.
    pub fn tag(&self) -> Option<FilterTag> {
        self.filters.first().and_then(|name| FilterTag::from_name(name))
    }

    /// `None` for every update kind other than transactions.
    pub fn from_update(update: SubscribeUpdate) -> Option<Self> {
        let SubscribeUpdate {
            filters,
            update_oneof,
            ..
        } = update;
        match update_oneof? {
            UpdateOneof::Transaction(tx) => Some(Self {
                filters,
                transaction: tx.transaction.as_ref().map(decode_transaction),
            }),
            _ => None,
        }
    }
}

fn encode_pubkey(bytes: &[u8]) -> Option<String> {
    Pubkey::try_from(bytes).ok().map(|key| key.to_string())
}

fn encode_keys(keys: &[Vec<u8>]) -> Option<Vec<String>> {
    keys.iter().map(|key| encode_pubkey(key)).collect()
}

fn compiled(program_id_index: u32, accounts: &[u8], data: &[u8]) -> CompiledIx {
    CompiledIx {
        program_id_index,
        accounts: accounts.to_vec(),
        data: data.to_vec(),
    }
}

impl From<&CompiledInstruction> for CompiledIx {
    fn from(ix: &CompiledInstruction) -> Self {
        compiled(ix.program_id_index, &ix.accounts, &ix.data)
    }
}

impl From<&InnerInstruction> for CompiledIx {
    fn from(ix: &InnerInstruction) -> Self {
        compiled(ix.program_id_index, &ix.accounts, &ix.data)
    }
}

impl From<&InnerInstructions> for InnerIxGroup {
    fn from(group: &InnerInstructions) -> Self {
        Self {
            index: group.index,
            instructions: group.instructions.iter().map(CompiledIx::from).collect(),
        }
    }
}

impl From<&ProtoTokenBalance> for TokenBalance {
    fn from(balance: &ProtoTokenBalance) -> Self {
        Self {
            account_index: balance.account_index,
            owner: balance.owner.clone(),
            mint: balance.mint.clone(),
            ui_amount: balance
                .ui_token_amount
                .as_ref()
                .map_or(0.0, |amount| amount.ui_amount),
        }
    }
}

/// Build the decoder view of a streamed transaction.
///
/// A key table with any malformed entry is dropped entirely so that
/// instruction indexes never resolve against shifted keys.
pub fn decode_transaction(info: &SubscribeUpdateTransactionInfo) -> DecodedTransaction {
    let mut decoded = DecodedTransaction {
        signature: Signature::try_from(info.signature.as_slice())
            .map(|sig| sig.to_string())
            .unwrap_or_default(),
        ..Default::default()
    };

    let mut keys = None;
    if let Some(message) = info.transaction.as_ref().and_then(|tx| tx.message.as_ref()) {
        decoded.num_required_signatures = message
            .header
            .as_ref()
            .map_or(0, |header| header.num_required_signatures);
        decoded.instructions = message.instructions.iter().map(CompiledIx::from).collect();
        keys = encode_keys(&message.account_keys);
    }

    if let Some(meta) = info.meta.as_ref() {
        decoded.failed = meta.err.is_some();
        decoded.pre_balances = meta.pre_balances.clone();
        decoded.post_balances = meta.post_balances.clone();
        decoded.pre_token_balances = meta.pre_token_balances.iter().map(TokenBalance::from).collect();
        decoded.post_token_balances = meta.post_token_balances.iter().map(TokenBalance::from).collect();
        decoded.inner_instructions = meta.inner_instructions.iter().map(InnerIxGroup::from).collect();

        keys = match (keys, encode_keys(&meta.loaded_writable_addresses), encode_keys(&meta.loaded_readonly_addresses)) {
            (Some(mut keys), Some(writable), Some(readonly)) => {
                keys.extend(writable);
                keys.extend(readonly);
                Some(keys)
            }
            _ => None,
        };
    }

    decoded.account_keys = keys.unwrap_or_default();
    decoded
}
