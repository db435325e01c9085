use super::protocols::raydium;
use super::types::{CompiledIx, DecodedInstruction, DecodedTransaction, Skip, TokenBalance, TradeEvent};
use crate::constants::{RAYDIUM_AMM_V4, RAYDIUM_POOL_AUTHORITY, WSOL_MINT};

/// Turns transactions that touch the AMM program into trade events.
#[derive(Clone, Debug)]
pub struct AmmDecoder {
    program_id: String,
    pool_authority: String,
    wsol_mint: String,
}

impl Default for AmmDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AmmDecoder {
    pub fn new() -> Self {
        Self {
            program_id: RAYDIUM_AMM_V4.to_string(),
            pool_authority: RAYDIUM_POOL_AUTHORITY.to_string(),
            wsol_mint: WSOL_MINT.to_string(),
        }
    }

    pub fn decode(&self, transaction: &DecodedTransaction) -> Result<TradeEvent, Skip> {
        if transaction.failed {
            return Err(Skip::Failed);
        }
        if transaction.account_keys.is_empty() {
            return Err(Skip::MissingAccountKeys);
        }

        let operations = self.decode_instructions(transaction);
        if operations.is_empty() {
            return Err(Skip::NoAmmInstruction);
        }
        if !operations.iter().any(|op| op.name.is_swap()) {
            return Err(Skip::NoSwap);
        }

        self.trade_info(transaction)
    }

    /// AMM instructions in execution order, inner instructions following
    /// the top-level instruction that emitted them.
    pub fn decode_instructions(&self, transaction: &DecodedTransaction) -> Vec<DecodedInstruction> {
        flatten_instructions(transaction)
            .into_iter()
            .filter(|ix| {
                transaction.account_key(ix.program_id_index as usize) == Some(self.program_id.as_str())
            })
            .filter_map(|ix| raydium::decode_instruction(ix, &transaction.account_keys))
            .collect()
    }

    /// Derive owner, mint, direction and SOL size from token balance changes.
    pub fn trade_info(&self, transaction: &DecodedTransaction) -> Result<TradeEvent, Skip> {
        let keys = &transaction.account_keys;
        if keys.len() < 2 {
            return Err(Skip::TooFewAccountKeys(keys.len()));
        }
        let signer_count = (transaction.num_required_signatures as usize).min(keys.len());
        let signers = &keys[..signer_count];

        let pre = self.trader_balance(&transaction.pre_token_balances, signers);
        let post = self
            .trader_balance(&transaction.post_token_balances, signers)
            .filter(|b| !b.owner.is_empty() && !b.mint.is_empty())
            .ok_or(Skip::NoTraderTokenBalance)?;

        let pre_amount = pre.map_or(0.0, |b| b.ui_amount);
        let post_amount = post.ui_amount;
        let is_buy = pre_amount <= post_amount;
        let is_first_buy = pre_amount == 0.0;

        let mint_address = pre
            .map(|b| b.mint.as_str())
            .filter(|mint| !mint.is_empty())
            .unwrap_or(post.mint.as_str())
            .to_string();
        let owner_address = pre
            .map(|b| b.owner.as_str())
            .filter(|owner| !owner.is_empty())
            .unwrap_or(post.owner.as_str())
            .to_string();

        let pool_pre = self.pool_sol(&transaction.pre_token_balances);
        let pool_post = self.pool_sol(&transaction.post_token_balances);
        let sol_amount = if is_buy { pool_post - pool_pre } else { pool_pre - pool_post };

        Ok(TradeEvent {
            signature: transaction.signature.clone(),
            owner_address,
            mint_address,
            is_buy,
            is_first_buy,
            sol_amount,
        })
    }

    fn trader_balance<'a>(&self, balances: &'a [TokenBalance], signers: &[String]) -> Option<&'a TokenBalance> {
        balances.iter().find(|b| {
            !b.mint.is_empty() && b.mint != self.wsol_mint && signers.iter().any(|s| *s == b.owner)
        })
    }

    // WSOL held in the pool vaults.
    fn pool_sol(&self, balances: &[TokenBalance]) -> f64 {
        balances
            .iter()
            .filter(|b| b.mint == self.wsol_mint && b.owner == self.pool_authority)
            .map(|b| b.ui_amount)
            .sum()
    }
}

fn flatten_instructions(transaction: &DecodedTransaction) -> Vec<&CompiledIx> {
    let mut flat = Vec::new();
    for (index, ix) in transaction.instructions.iter().enumerate() {
        flat.push(ix);
        for group in transaction
            .inner_instructions
            .iter()
            .filter(|group| group.index as usize == index)
        {
            flat.extend(group.instructions.iter());
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::types::InnerIxGroup;

    const TRADER: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
    const MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn swap_ix(program_id_index: u32) -> CompiledIx {
        let mut data = vec![9u8];
        data.extend_from_slice(&1_000u64.to_le_bytes());
        data.extend_from_slice(&1u64.to_le_bytes());
        CompiledIx {
            program_id_index,
            accounts: vec![0, 1],
            data,
        }
    }

    fn balance(owner: &str, mint: &str, ui_amount: f64) -> TokenBalance {
        TokenBalance {
            account_index: 0,
            owner: owner.to_string(),
            mint: mint.to_string(),
            ui_amount,
        }
    }

    fn swap_tx(pre_token: f64, post_token: f64, pool_pre: f64, pool_post: f64) -> DecodedTransaction {
        DecodedTransaction {
            signature: "sig".to_string(),
            account_keys: vec![
                TRADER.to_string(),
                RAYDIUM_POOL_AUTHORITY.to_string(),
                RAYDIUM_AMM_V4.to_string(),
            ],
            num_required_signatures: 1,
            instructions: vec![swap_ix(2)],
            pre_token_balances: vec![
                balance(TRADER, MINT, pre_token),
                balance(RAYDIUM_POOL_AUTHORITY, WSOL_MINT, pool_pre),
            ],
            post_token_balances: vec![
                balance(TRADER, MINT, post_token),
                balance(RAYDIUM_POOL_AUTHORITY, WSOL_MINT, pool_post),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_buy_with_pool_sol_delta() {
        let trade = AmmDecoder::new().decode(&swap_tx(0.0, 150.0, 100.0, 102.5)).unwrap();
        assert!(trade.is_buy);
        assert!(trade.is_first_buy);
        assert_eq!(trade.owner_address, TRADER);
        assert_eq!(trade.mint_address, MINT);
        assert!((trade.sol_amount - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_sell_direction() {
        let trade = AmmDecoder::new().decode(&swap_tx(150.0, 50.0, 102.5, 101.0)).unwrap();
        assert!(!trade.is_buy);
        assert!(!trade.is_first_buy);
        assert!((trade.sol_amount - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_equal_amounts_count_as_buy() {
        let trade = AmmDecoder::new().decode(&swap_tx(10.0, 10.0, 5.0, 5.0)).unwrap();
        assert!(trade.is_buy);
        assert!(!trade.is_first_buy);
    }

    #[test]
    fn test_missing_pre_balance_is_first_buy() {
        let mut tx = swap_tx(0.0, 20.0, 1.0, 2.0);
        tx.pre_token_balances.remove(0);
        let trade = AmmDecoder::new().decode(&tx).unwrap();
        assert!(trade.is_buy);
        assert!(trade.is_first_buy);
        assert_eq!(trade.mint_address, MINT);
    }

    #[test]
    fn test_empty_account_keys_not_applicable() {
        let tx = DecodedTransaction {
            instructions: vec![swap_ix(0)],
            ..Default::default()
        };
        assert_eq!(AmmDecoder::new().decode(&tx), Err(Skip::MissingAccountKeys));
    }

    #[test]
    fn test_failed_transaction_skipped() {
        let mut tx = swap_tx(0.0, 1.0, 1.0, 2.0);
        tx.failed = true;
        assert_eq!(AmmDecoder::new().decode(&tx), Err(Skip::Failed));
    }

    #[test]
    fn test_swap_found_in_inner_instructions() {
        let mut tx = swap_tx(0.0, 1.0, 1.0, 2.0);
        let outer = CompiledIx {
            program_id_index: 0,
            accounts: vec![],
            data: vec![1],
        };
        tx.inner_instructions = vec![InnerIxGroup {
            index: 0,
            instructions: vec![swap_ix(2)],
        }];
        tx.instructions = vec![outer];

        let ops = AmmDecoder::new().decode_instructions(&tx);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name.name(), "swapIn");
        assert!(AmmDecoder::new().decode(&tx).is_ok());
    }

    #[test]
    fn test_non_swap_instruction_skipped() {
        let mut tx = swap_tx(0.0, 1.0, 1.0, 2.0);
        tx.instructions[0].data = vec![3];
        assert_eq!(AmmDecoder::new().decode(&tx), Err(Skip::NoSwap));

        tx.instructions[0].program_id_index = 0;
        assert_eq!(AmmDecoder::new().decode(&tx), Err(Skip::NoAmmInstruction));
    }

    #[test]
    fn test_no_signer_balance() {
        let mut tx = swap_tx(0.0, 1.0, 1.0, 2.0);
        tx.post_token_balances.remove(0);
        assert_eq!(AmmDecoder::new().decode(&tx), Err(Skip::NoTraderTokenBalance));
    }

    #[test]
    fn test_single_account_key() {
        let tx = DecodedTransaction {
            account_keys: vec![TRADER.to_string()],
            ..Default::default()
        };
        assert_eq!(AmmDecoder::new().trade_info(&tx), Err(Skip::TooFewAccountKeys(1)));
    }
}
