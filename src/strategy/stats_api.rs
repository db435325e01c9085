use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use super::analyzer::QualificationStrategy;
use super::providers::WalletDataProvider;
use super::types::{Numeric, WalletMetrics, WalletStats};
use crate::config::StatsThresholds;
use crate::whale::OutflowCandidate;

/// Gates over the wallet-stats service record.
pub struct StatsStrategy {
    provider: Arc<dyn WalletDataProvider>,
    thresholds: StatsThresholds,
}

impl StatsStrategy {
    pub fn new(provider: Arc<dyn WalletDataProvider>, thresholds: StatsThresholds) -> Self {
        Self { provider, thresholds }
    }
}

#[async_trait]
impl QualificationStrategy for StatsStrategy {
    fn name(&self) -> &'static str {
        "stats"
    }

    async fn evaluate(&self, candidate: &OutflowCandidate) -> Result<WalletMetrics, String> {
        let wallet = &candidate.to_address;
        let stats = self
            .provider
            .wallet_stats(wallet)
            .await
            .ok_or_else(|| format!("Wallet {}: stats API data retrieval failed", wallet))?;

        check_stats(wallet, &stats, &self.thresholds)?;
        Ok(WalletMetrics::Stats(stats))
    }
}

/// SOL balance rounded to two decimals.
pub fn rounded_sol_balance(value: &Numeric) -> Option<f64> {
    let exact = match value {
        Numeric::Text(text) => Decimal::from_str(text.trim()).ok()?,
        Numeric::Number(number) => Decimal::from_f64(*number)?,
    };
    exact.round_dp(2).to_f64()
}

fn check_range(wallet: &str, metric: &str, value: f64, min: f64, max: f64) -> Result<(), String> {
    if value < min || value > max {
        return Err(format!(
            "Wallet {} disqualified due to {} {} not within [{}, {}]",
            wallet, metric, value, min, max
        ));
    }
    Ok(())
}

fn check_min(wallet: &str, metric: &str, value: f64, min: f64) -> Result<(), String> {
    if value < min {
        return Err(format!("Wallet {} disqualified due to {} {} < {}", wallet, metric, value, min));
    }
    Ok(())
}

pub fn check_stats(wallet: &str, stats: &WalletStats, t: &StatsThresholds) -> Result<(), String> {
    let sol_balance = stats
        .sol_balance
        .as_ref()
        .and_then(rounded_sol_balance)
        .ok_or_else(|| format!("Wallet {} disqualified due to invalid sol_balance {:?}", wallet, stats.sol_balance))?;

    check_min(wallet, "sol_balance", sol_balance, t.min_sol_balance)?;
    check_range(wallet, "buy_7d", stats.buy_7d, t.buy_7d_min, t.buy_7d_max)?;
    check_min(wallet, "winrate", stats.winrate, t.min_winrate)?;
    check_range(
        wallet,
        "realized_profit_7d",
        stats.realized_profit_7d,
        t.realized_profit_7d_min,
        t.realized_profit_7d_max,
    )?;
    check_min(wallet, "pnl", stats.pnl, t.min_pnl)?;
    check_min(wallet, "pnl_7d", stats.pnl_7d, t.min_pnl_7d)?;
    check_min(wallet, "pnl_30d", stats.pnl_30d, t.min_pnl_30d)?;
    Ok(())
}
