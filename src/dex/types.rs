use serde::Serialize;
use thiserror::Error;

use crate::constants::solscan_url;
use super::protocols::raydium::AmmOperation;

#[derive(Debug, Clone, PartialEq)]
pub struct TokenBalance {
    pub account_index: u32,
    pub owner: String,
    pub mint: String,
    pub ui_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledIx {
    pub program_id_index: u32,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// Inner instructions emitted by the top-level instruction at `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerIxGroup {
    pub index: u32,
    pub instructions: Vec<CompiledIx>,
}

/// Transaction view shared by both decoders.
///
/// `account_keys` holds the static keys followed by loaded writable and then
/// loaded readonly addresses, so instruction indexes resolve against it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedTransaction {
    pub signature: String,
    pub account_keys: Vec<String>,
    pub num_required_signatures: u32,
    pub instructions: Vec<CompiledIx>,
    pub inner_instructions: Vec<InnerIxGroup>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub failed: bool,
}

impl DecodedTransaction {
    pub fn explorer_url(&self) -> String {
        solscan_url(&self.signature)
    }

    pub fn account_key(&self, index: usize) -> Option<&str> {
        self.account_keys.get(index).map(String::as_str)
    }
}

/// One AMM instruction resolved against the transaction's account table.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedInstruction {
    pub name: AmmOperation,
    pub accounts: Vec<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeEvent {
    pub signature: String,
    pub owner_address: String,
    pub mint_address: String,
    pub is_buy: bool,
    pub is_first_buy: bool,
    pub sol_amount: f64,
}

/// Why a transaction produced no trade.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Skip {
    #[error("transaction failed on chain")]
    Failed,

    #[error("no decodable account keys")]
    MissingAccountKeys,

    #[error("no instruction for the AMM program")]
    NoAmmInstruction,

    #[error("AMM instructions contain no swap")]
    NoSwap,

    #[error("only {0} account keys")]
    TooFewAccountKeys(usize),

    #[error("no signer-owned token balance")]
    NoTraderTokenBalance,
}
