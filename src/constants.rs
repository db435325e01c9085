// Well-known program ids and mints.

/// Raydium liquidity pool v4 program.
pub const RAYDIUM_AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

/// Authority that owns the vault accounts of every Raydium v4 pool.
pub const RAYDIUM_POOL_AUTHORITY: &str = "5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1";

pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

pub const COMPUTE_BUDGET_PROGRAM: &str = "ComputeBudget111111111111111111111111111111";

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

const SOLSCAN_TX_URL: &str = "https://solscan.io/tx";

/// Explorer link for a transaction signature.
pub fn solscan_url(signature: &str) -> String {
    format!("{}/{}", SOLSCAN_TX_URL, signature)
}
