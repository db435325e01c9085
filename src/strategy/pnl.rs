use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};

use super::analyzer::QualificationStrategy;
use super::providers::WalletDataProvider;
use super::types::{millis_to_secs, number_or, Holdings, HistoricInterval, Numeric, PnlMetrics, PnlResponse, WalletMetrics};
use crate::config::PnlThresholds;
use crate::constants::WSOL_MINT;
use crate::feed::PriceOracle;
use crate::whale::OutflowCandidate;

/// Holdings and PnL analytics from the tracker API.
pub struct PnlStrategy {
    provider: Arc<dyn WalletDataProvider>,
    price: Arc<dyn PriceOracle>,
    thresholds: PnlThresholds,
    free_plan_delay: Option<Duration>,
}

impl PnlStrategy {
    pub fn new(
        provider: Arc<dyn WalletDataProvider>,
        price: Arc<dyn PriceOracle>,
        thresholds: PnlThresholds,
        free_plan_delay: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            price,
            thresholds,
            free_plan_delay,
        }
    }
}

#[async_trait]
impl QualificationStrategy for PnlStrategy {
    fn name(&self) -> &'static str {
        "pnl"
    }

    async fn evaluate(&self, candidate: &OutflowCandidate) -> Result<WalletMetrics, String> {
        let wallet = &candidate.to_address;
        let holdings = self
            .provider
            .holdings(wallet)
            .await
            .ok_or_else(|| format!("Wallet {}: holdings API data retrieval failed", wallet))?;

        let price = self.price.current_price();
        let portfolio = Portfolio::from_holdings(&holdings, price);
        info!(
            "Wallet {}: (total sol: {}) Portfolio Value = {} USD (sol value: {})",
            wallet, portfolio.total_sol, portfolio.value_usd, price
        );
        check_balances(wallet, &portfolio, &self.thresholds)?;

        // Free plan allows one request per second.
        if let Some(delay) = self.free_plan_delay {
            tokio::time::sleep(delay).await;
        }

        let pnl = self
            .provider
            .pnl(wallet)
            .await
            .ok_or_else(|| format!("Wallet {}: PnL API data retrieval failed", wallet))?;

        analyze_pnl(wallet, &portfolio, &pnl, &self.thresholds).map(WalletMetrics::Pnl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Portfolio {
    pub total_sol: f64,
    pub wsol_balance: f64,
    pub value_usd: f64,
}

impl Portfolio {
    pub fn from_holdings(holdings: &Holdings, sol_price: f64) -> Self {
        let wsol_balance = holdings
            .tokens
            .iter()
            .find(|token| token.address == WSOL_MINT)
            .map_or(0.0, |token| token.balance);
        Self {
            total_sol: holdings.total_sol,
            wsol_balance,
            value_usd: holdings.total_sol * sol_price,
        }
    }
}

pub fn check_balances(wallet: &str, portfolio: &Portfolio, t: &PnlThresholds) -> Result<(), String> {
    if portfolio.total_sol < t.sol_threshold && portfolio.wsol_balance < t.wsol_threshold {
        return Err(format!(
            "Wallet {} does not meet SOL/WSOL balance criteria (SOL: {} < {}, WSOL: {} < {})",
            wallet, portfolio.total_sol, t.sol_threshold, portfolio.wsol_balance, t.wsol_threshold
        ));
    }
    Ok(())
}

fn interval_values(interval: Option<&HistoricInterval>) -> (f64, f64) {
    match interval {
        Some(data) => (
            number_or(&data.percentage_change, 0.0),
            number_or(&data.win_percentage, 0.0).clamp(0.0, 100.0),
        ),
        None => (0.0, 0.0),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Run the PnL gates in order and derive the metrics record.
pub fn analyze_pnl(
    wallet: &str,
    portfolio: &Portfolio,
    pnl: &PnlResponse,
    t: &PnlThresholds,
) -> Result<PnlMetrics, String> {
    let summary = pnl
        .summary
        .as_ref()
        .ok_or_else(|| format!("Wallet {} disqualified due to missing PnL summary", wallet))?;

    let total_pnl = number_or(&summary.total, 0.0);
    if total_pnl < 0.0 {
        return Err(format!("Wallet {} disqualified due to negative total PnL: {} < 0", wallet, total_pnl));
    }

    let total_invested = summary
        .total_invested
        .as_ref()
        .map(|value| value.as_f64().unwrap_or(0.0))
        .filter(|value| *value != 0.0)
        .ok_or_else(|| {
            format!(
                "Wallet {} disqualified due to invalid totalInvested {:?}",
                wallet, summary.total_invested
            )
        })?;

    let unrealized = number_or(&summary.unrealized, 0.0);
    let min_unrealized = -(t.unrealized_min_percent / 100.0) * portfolio.value_usd;
    if unrealized < min_unrealized {
        return Err(format!(
            "Wallet {} disqualified due to unrealized gains {} < {} (-{}% of portfolio value)",
            wallet, unrealized, min_unrealized, t.unrealized_min_percent
        ));
    }
    let max_unrealized = (t.unrealized_max_percent / 100.0) * portfolio.value_usd;
    if unrealized > max_unrealized {
        return Err(format!(
            "Wallet {} disqualified due to unrealized gains {} > {} ({}% of portfolio value)",
            wallet, unrealized, max_unrealized, t.unrealized_max_percent
        ));
    }

    let roi = total_pnl / total_invested * 100.0;

    let total_tokens = pnl.tokens.len();
    let mut farming_attempts = 0;
    let mut holding_times = Vec::new();
    for token in pnl.tokens.values() {
        let last_buy = millis_to_secs(&token.last_buy_time);
        if last_buy == 0.0 {
            continue;
        }
        let last_sell = millis_to_secs(&token.last_sell_time);
        let first_buy = millis_to_secs(&token.first_buy_time);

        let flip = last_sell - last_buy;
        if flip > 0.0 && flip < t.farming_time_secs {
            farming_attempts += 1;
        }
        let held = last_sell - first_buy;
        if held > 0.0 {
            holding_times.push(held);
        }
    }

    let farming_ratio = if total_tokens > 0 {
        farming_attempts as f64 / total_tokens as f64
    } else {
        0.0
    };
    if farming_ratio > t.farming_ratio {
        return Err(format!(
            "Wallet {} disqualified due to farming ratio {:.2}% > {:.2}%",
            wallet,
            farming_ratio * 100.0,
            t.farming_ratio * 100.0
        ));
    }

    let winrate = summary
        .win_percentage
        .as_ref()
        .and_then(Numeric::as_f64)
        .ok_or_else(|| format!("Wallet {} disqualified due to invalid winrate value {:?}", wallet, summary.win_percentage))?
        .clamp(0.0, 100.0);
    if winrate < t.winrate_lower || winrate > t.winrate_upper {
        return Err(format!(
            "Wallet {} disqualified due to winrate {:.2}% not within [{}%, {}%]",
            wallet, winrate, t.winrate_lower, t.winrate_upper
        ));
    }

    let realized = number_or(&summary.realized, 0.0);
    if realized < t.realized_gains_min {
        return Err(format!(
            "Wallet {} disqualified due to realized gains ${:.2} < threshold ${}",
            wallet, realized, t.realized_gains_min
        ));
    }
    if realized > 0.0 && unrealized >= t.unrealized_to_realized_ratio * realized {
        return Err(format!(
            "Wallet {} disqualified because unrealized gains ${:.2} >= {}% of realized gains ${:.2}",
            wallet,
            unrealized,
            t.unrealized_to_realized_ratio * 100.0,
            realized
        ));
    }

    let average_holding_time_min = mean(&holding_times).map_or(0.0, |secs| secs / 60.0);

    let historic = pnl.historic.as_ref().and_then(|h| h.summary.as_ref());
    let (roi_1d, win_rate_1d) = interval_values(historic.and_then(|s| s.day.as_ref()));
    let (roi_7d, win_rate_7d) = interval_values(historic.and_then(|s| s.week.as_ref()));
    let (roi_30d, win_rate_30d) = interval_values(historic.and_then(|s| s.month.as_ref()));

    if total_tokens < t.total_tokens_min {
        return Err(format!(
            "Wallet {} disqualified due to total tokens {} < {}",
            wallet, total_tokens, t.total_tokens_min
        ));
    }
    if t.roi_7d_nonzero && roi_7d == 0.0 {
        return Err(format!("Wallet {} disqualified due to ROI_7d {} == 0", wallet, roi_7d));
    }
    if roi_1d < t.roi_min || roi_7d < t.roi_min || roi_30d < t.roi_min {
        return Err(format!(
            "Wallet {} disqualified due to ROI thresholds: ROI_1d={:.2}%, ROI_7d={:.2}%, ROI_30d={:.2}% below minimum {}%",
            wallet, roi_1d, roi_7d, roi_30d, t.roi_min
        ));
    }

    let avg_buy_size = number_or(&summary.average_buy_amount, 0.0);

    let mut profits = Vec::new();
    let mut losses = Vec::new();
    let historic_tokens = pnl.historic.as_ref().map(|h| &h.tokens);
    for (mint, token) in historic_tokens.into_iter().flatten() {
        let Some(metrics) = token.month.as_ref().and_then(|w| w.metrics.as_ref()) else {
            continue;
        };
        let (Some(total), Some(invested)) = (metrics.total.as_ref(), metrics.total_invested.as_ref()) else {
            continue;
        };
        let invested = invested.as_f64().unwrap_or(0.0);
        if invested == 0.0 {
            debug!("Wallet {}, token {}: total_invested is 0, skipping", wallet, mint);
            continue;
        }
        let percent = total.as_f64().unwrap_or(0.0) / invested * 100.0;
        if percent > 0.0 {
            profits.push(percent);
        } else if percent < 0.0 {
            losses.push(percent);
        }
    }

    Ok(PnlMetrics {
        wallet: wallet.to_string(),
        portfolio_value_usd: portfolio.value_usd,
        total_sol: portfolio.total_sol,
        wsol_balance: portfolio.wsol_balance,
        farming_attempts,
        total_tokens,
        farming_ratio_percentage: farming_ratio * 100.0,
        winrate,
        roi,
        roi_1d,
        win_rate_1d,
        roi_7d,
        win_rate_7d,
        roi_30d,
        win_rate_30d,
        realized_gains: realized,
        unrealized_gains: unrealized,
        average_holding_time_min,
        avg_buy_size,
        avg_profit_per_trade: mean(&profits),
        avg_loss_per_trade: mean(&losses),
    })
}
