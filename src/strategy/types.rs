use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::whale::OutflowCandidate;

/// A JSON value the upstream APIs send either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Number(value) => Some(*value),
            Numeric::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

/// Numeric value of an optional field, `default` when absent or unparsable.
pub fn number_or(value: &Option<Numeric>, default: f64) -> f64 {
    value.as_ref().and_then(Numeric::as_f64).unwrap_or(default)
}

/// Millisecond timestamp as seconds, zero when absent.
pub fn millis_to_secs(value: &Option<Numeric>) -> f64 {
    number_or(value, 0.0) / 1000.0
}

fn zero_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response of the private wallet-stats service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletStats {
    pub sol_balance: Option<Numeric>,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub buy_7d: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub sell_7d: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub buy_30d: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub sell_30d: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub winrate: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub realized_profit: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub realized_profit_7d: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub realized_profit_30d: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub unrealized_profit: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub pnl: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub pnl_7d: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub pnl_30d: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_profit: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub token_num: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub avg_holding_peroid: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeldToken {
    pub address: String,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub balance: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub value: f64,
}

/// `GET /wallet/{address}/basic` from the tracker API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    #[serde(default)]
    pub tokens: Vec<HeldToken>,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total: f64,
    #[serde(rename = "totalSol", default, deserialize_with = "zero_if_null")]
    pub total_sol: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlSummary {
    pub total: Option<Numeric>,
    pub total_invested: Option<Numeric>,
    pub unrealized: Option<Numeric>,
    pub realized: Option<Numeric>,
    pub win_percentage: Option<Numeric>,
    pub average_buy_amount: Option<Numeric>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenPnl {
    pub first_buy_time: Option<Numeric>,
    pub last_buy_time: Option<Numeric>,
    pub last_sell_time: Option<Numeric>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricInterval {
    pub percentage_change: Option<Numeric>,
    pub win_percentage: Option<Numeric>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricSummary {
    #[serde(rename = "1d")]
    pub day: Option<HistoricInterval>,
    #[serde(rename = "7d")]
    pub week: Option<HistoricInterval>,
    #[serde(rename = "30d")]
    pub month: Option<HistoricInterval>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricMetrics {
    pub total: Option<Numeric>,
    pub total_invested: Option<Numeric>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricWindow {
    pub metrics: Option<HistoricMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricToken {
    #[serde(rename = "30d")]
    pub month: Option<HistoricWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Historic {
    pub summary: Option<HistoricSummary>,
    #[serde(default)]
    pub tokens: HashMap<String, HistoricToken>,
}

/// `GET /pnl/{address}?showHistoricPnL=true` from the tracker API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PnlResponse {
    pub summary: Option<PnlSummary>,
    #[serde(default)]
    pub tokens: HashMap<String, TokenPnl>,
    pub historic: Option<Historic>,
}

/// Derived record of a wallet that passed the PnL gates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PnlMetrics {
    pub wallet: String,
    pub portfolio_value_usd: f64,
    pub total_sol: f64,
    pub wsol_balance: f64,
    pub farming_attempts: usize,
    pub total_tokens: usize,
    pub farming_ratio_percentage: f64,
    pub winrate: f64,
    pub roi: f64,
    pub roi_1d: f64,
    pub win_rate_1d: f64,
    pub roi_7d: f64,
    pub win_rate_7d: f64,
    pub roi_30d: f64,
    pub win_rate_30d: f64,
    pub realized_gains: f64,
    pub unrealized_gains: f64,
    pub average_holding_time_min: f64,
    pub avg_buy_size: f64,
    pub avg_profit_per_trade: Option<f64>,
    pub avg_loss_per_trade: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "metrics", rename_all = "snake_case")]
pub enum WalletMetrics {
    Stats(WalletStats),
    Pnl(PnlMetrics),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualificationResult {
    pub status: bool,
    pub reason: String,
    pub metrics: Option<WalletMetrics>,
}

impl QualificationResult {
    pub fn pass(metrics: WalletMetrics) -> Self {
        Self {
            status: true,
            reason: String::new(),
            metrics: Some(metrics),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            status: false,
            reason: reason.into(),
            metrics: None,
        }
    }
}

/// The record emitted when a wallet passes every gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualifiedWallet {
    pub candidate: OutflowCandidate,
    pub metrics: WalletMetrics,
}
