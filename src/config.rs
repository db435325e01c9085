use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required key {0} in environment variables")]
    Missing(String),

    #[error("Invalid value for key {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifierMode {
    /// Gates over the private wallet-stats service.
    Stats,
    /// Holdings and PnL analytics from the tracker API.
    Pnl,
}

impl FromStr for QualifierMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stats" | "default" => Ok(Self::Stats),
            "pnl" | "tracker" => Ok(Self::Pnl),
            other => Err(format!("unknown qualifier mode '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct StreamConfig {
    pub endpoint: String,
    pub x_token: Option<Zeroizing<String>>,
    pub hot_wallet: String,
    pub watch_raydium: bool,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OutflowConfig {
    pub sol_threshold: f64, // SOL moved to the counterparty
}

#[derive(Debug, Clone)]
pub struct StatsThresholds {
    pub min_sol_balance: f64,
    pub buy_7d_min: f64,
    pub buy_7d_max: f64,
    pub min_winrate: f64,
    pub realized_profit_7d_min: f64,
    pub realized_profit_7d_max: f64,
    pub min_pnl: f64,
    pub min_pnl_7d: f64,
    pub min_pnl_30d: f64,
}

impl Default for StatsThresholds {
    fn default() -> Self {
        Self {
            min_sol_balance: 5.0,
            buy_7d_min: 50.0,
            buy_7d_max: 300.0,
            min_winrate: 0.5,
            realized_profit_7d_min: 750.0,
            realized_profit_7d_max: 4000.0,
            min_pnl: 0.3,
            min_pnl_7d: 0.3,
            min_pnl_30d: 0.3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PnlThresholds {
    pub sol_threshold: f64,
    pub wsol_threshold: f64,
    pub unrealized_min_percent: f64,
    pub unrealized_max_percent: f64,
    pub farming_time_secs: f64,
    pub farming_ratio: f64,
    pub winrate_lower: f64,
    pub winrate_upper: f64,
    pub realized_gains_min: f64,
    pub unrealized_to_realized_ratio: f64,
    pub total_tokens_min: usize,
    pub roi_7d_nonzero: bool,
    pub roi_min: f64,
}

impl Default for PnlThresholds {
    fn default() -> Self {
        Self {
            sol_threshold: 5.0,
            wsol_threshold: 5.0,
            unrealized_min_percent: 20.0,
            unrealized_max_percent: 50.0,
            farming_time_secs: 60.0,
            farming_ratio: 0.2,
            winrate_lower: 40.0,
            winrate_upper: 95.0,
            realized_gains_min: 1000.0,
            unrealized_to_realized_ratio: 0.5,
            total_tokens_min: 10,
            roi_7d_nonzero: true,
            roi_min: 0.0,
        }
    }
}

#[derive(Clone)]
pub struct QualifierConfig {
    pub mode: QualifierMode,
    pub min_candidate_sol: f64,
    pub stats_api_url: String,
    pub tracker_api_url: String,
    pub tracker_api_key: Option<Zeroizing<String>>,
    pub free_plan_delay: Option<Duration>,
    pub stats: StatsThresholds,
    pub pnl: PnlThresholds,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct PriceFeedConfig {
    pub url: String,
    pub product_id: String,
    pub reconnect_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub dir: PathBuf,
}

#[derive(Clone)]
pub struct AppConfig {
    pub stream: StreamConfig,
    pub outflow: OutflowConfig,
    pub qualifier: QualifierConfig,
    pub http: HttpConfig,
    pub price_feed: PriceFeedConfig,
    pub log: LogConfig,
}

const DEFAULT_TRACKER_API_URL: &str = "https://data.solanatracker.io";
const DEFAULT_PRICE_FEED_URL: &str = "wss://ws-feed.exchange.coinbase.com";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

impl AppConfig {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build and validate the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let stream = StreamConfig {
            endpoint: env.required("GRPC_END_POINT")?,
            x_token: env.optional("GRPC_X_TOKEN").map(Zeroizing::new),
            hot_wallet: env.address("HOT_WALLET_ADDRESS")?,
            watch_raydium: env.flag("WATCH_RAYDIUM", false)?,
            reconnect_delay: Duration::from_millis(env.parse_or("RECONNECT_DELAY_MS", 3000u64)?),
            connect_timeout: Duration::from_secs(env.parse_or("GRPC_CONNECT_TIMEOUT_SECS", 10u64)?),
            request_timeout: Duration::from_secs(env.parse_or("GRPC_TIMEOUT_SECS", 10u64)?),
        };

        let outflow = OutflowConfig {
            sol_threshold: env.parse_or("OUTFLOW_SOL_THRESHOLD", 5.0)?,
        };

        let mode: QualifierMode = env.parse_or("QUALIFIER_MODE", QualifierMode::Stats)?;
        let stats_api_url = match mode {
            QualifierMode::Stats => env.required("STATS_API_URL")?,
            QualifierMode::Pnl => env.optional("STATS_API_URL").unwrap_or_default(),
        };
        let free_plan = env.flag("SOLANATRACKER_FREE_PLAN", false)?;
        let free_plan_delay = Duration::from_millis(env.parse_or("SOLANATRACKER_FREE_PLAN_DELAY_MS", 1100u64)?);

        let stats_defaults = StatsThresholds::default();
        let stats = StatsThresholds {
            min_sol_balance: env.parse_or("STATS_MIN_SOL_BALANCE", stats_defaults.min_sol_balance)?,
            buy_7d_min: env.parse_or("STATS_BUY_7D_MIN", stats_defaults.buy_7d_min)?,
            buy_7d_max: env.parse_or("STATS_BUY_7D_MAX", stats_defaults.buy_7d_max)?,
            min_winrate: env.parse_or("STATS_MIN_WINRATE", stats_defaults.min_winrate)?,
            realized_profit_7d_min: env.parse_or("STATS_REALIZED_PROFIT_7D_MIN", stats_defaults.realized_profit_7d_min)?,
            realized_profit_7d_max: env.parse_or("STATS_REALIZED_PROFIT_7D_MAX", stats_defaults.realized_profit_7d_max)?,
            min_pnl: env.parse_or("STATS_MIN_PNL", stats_defaults.min_pnl)?,
            min_pnl_7d: env.parse_or("STATS_MIN_PNL_7D", stats_defaults.min_pnl_7d)?,
            min_pnl_30d: env.parse_or("STATS_MIN_PNL_30D", stats_defaults.min_pnl_30d)?,
        };

        let pnl_defaults = PnlThresholds::default();
        let pnl = PnlThresholds {
            sol_threshold: env.parse_or("SOL_THRESHOLD", pnl_defaults.sol_threshold)?,
            wsol_threshold: env.parse_or("WSOL_THRESHOLD", pnl_defaults.wsol_threshold)?,
            unrealized_min_percent: env.parse_or("UNREALIZED_MIN_PERCENT", pnl_defaults.unrealized_min_percent)?,
            unrealized_max_percent: env.parse_or("UNREALIZED_MAX_PERCENT", pnl_defaults.unrealized_max_percent)?,
            farming_time_secs: env.parse_or("FARMING_TIME_THRESHOLD", pnl_defaults.farming_time_secs)?,
            farming_ratio: env.parse_or("FARMING_RATIO_THRESHOLD", pnl_defaults.farming_ratio)?,
            winrate_lower: env.parse_or("WINRATE_LOWER_THRESHOLD", pnl_defaults.winrate_lower)?,
            winrate_upper: env.parse_or("WINRATE_UPPER_THRESHOLD", pnl_defaults.winrate_upper)?,
            realized_gains_min: env.parse_or("REALIZED_GAINS_THRESHOLD", pnl_defaults.realized_gains_min)?,
            unrealized_to_realized_ratio: env
                .parse_or("UNREALIZED_TO_REALIZED_RATIO", pnl_defaults.unrealized_to_realized_ratio)?,
            total_tokens_min: env.parse_or("TOTAL_TOKENS_MIN", pnl_defaults.total_tokens_min)?,
            roi_7d_nonzero: env.flag("ROI_7D_NONZERO", pnl_defaults.roi_7d_nonzero)?,
            roi_min: env.parse_or("ROI_MIN_THRESHOLD", pnl_defaults.roi_min)?,
        };

        let qualifier = QualifierConfig {
            mode,
            min_candidate_sol: env.parse_or("MIN_CANDIDATE_SOL", 1.0)?,
            stats_api_url,
            tracker_api_url: env
                .optional("SOLANATRACKER_API_URL")
                .unwrap_or_else(|| DEFAULT_TRACKER_API_URL.to_string()),
            tracker_api_key: env.optional("SOLANATRACKER_API_KEY").map(Zeroizing::new),
            free_plan_delay: free_plan.then_some(free_plan_delay),
            stats,
            pnl,
        };

        let http = HttpConfig {
            timeout: Duration::from_secs(env.parse_or("HTTP_TIMEOUT_SECS", 10u64)?),
            user_agent: env
                .optional("HTTP_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        };

        let price_feed = PriceFeedConfig {
            url: env
                .optional("PRICE_FEED_URL")
                .unwrap_or_else(|| DEFAULT_PRICE_FEED_URL.to_string()),
            product_id: env
                .optional("PRICE_PRODUCT_ID")
                .unwrap_or_else(|| "SOL-USD".to_string()),
            reconnect_delay: Duration::from_millis(env.parse_or("PRICE_RECONNECT_DELAY_MS", 5000u64)?),
        };

        let log = LogConfig {
            dir: PathBuf::from(env.optional("LOG_DIR").unwrap_or_else(|| "files/logs".to_string())),
        };

        Ok(Self {
            stream,
            outflow,
            qualifier,
            http,
            price_feed,
            log,
        })
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            Some(raw) => raw.parse::<T>().map_err(|err| ConfigError::Invalid {
                key: key.to_string(),
                reason: err.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(key) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => Err(ConfigError::Invalid {
                    key: key.to_string(),
                    reason: format!("expected a boolean, got '{}'", other),
                }),
            },
            None => Ok(default),
        }
    }

    fn address(&self, key: &str) -> Result<String, ConfigError> {
        let raw = self.required(key)?;
        Pubkey::from_str(&raw).map_err(|err| ConfigError::Invalid {
            key: key.to_string(),
            reason: err.to_string(),
        })?;
        Ok(raw)
    }
}

/// Load `.env` and every `.env*` file under `configs/<APP_ENV|local>/`.
///
/// Variables already present in the process environment win. Returns the
/// files that were read so they can be logged once logging is up.
pub fn load_env_files() -> Vec<PathBuf> {
    let mut loaded = Vec::new();
    if let Ok(path) = dotenv() {
        loaded.push(path);
    }

    let environment = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
    let dir = Path::new("configs").join(environment);
    for path in env_files_in(&dir) {
        if dotenv::from_path(&path).is_ok() {
            loaded.push(path);
        }
    }
    loaded
}

fn env_files_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(".env"))
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const HOT_WALLET: &str = "5tzFkiKscXHK5ZXCGbXZxdw7gTjjD1mBwuoFbhUvuAi9";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("GRPC_END_POINT", "https://grpc.example.com"),
            ("HOT_WALLET_ADDRESS", HOT_WALLET),
            ("STATS_API_URL", "http://127.0.0.1:8080/api"),
        ]
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_lookup(lookup(&base())).unwrap();
        assert_eq!(config.stream.hot_wallet, HOT_WALLET);
        assert_eq!(config.stream.reconnect_delay, Duration::from_millis(3000));
        assert!(!config.stream.watch_raydium);
        assert_eq!(config.qualifier.mode, QualifierMode::Stats);
        assert!(config.qualifier.free_plan_delay.is_none());
        assert_eq!(config.qualifier.stats.min_winrate, 0.5);
        assert_eq!(config.price_feed.product_id, "SOL-USD");
    }

    #[test]
    fn test_missing_endpoint() {
        let pairs = vec![("HOT_WALLET_ADDRESS", HOT_WALLET)];
        let err = AppConfig::from_lookup(lookup(&pairs)).err().unwrap();
        assert_eq!(err, ConfigError::Missing("GRPC_END_POINT".to_string()));
    }

    #[test]
    fn test_invalid_hot_wallet() {
        let mut pairs = base();
        pairs[1] = ("HOT_WALLET_ADDRESS", "not-a-key");
        let err = AppConfig::from_lookup(lookup(&pairs)).err().unwrap();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "HOT_WALLET_ADDRESS"));
    }

    #[test]
    fn test_invalid_number() {
        let mut pairs = base();
        pairs.push(("OUTFLOW_SOL_THRESHOLD", "lots"));
        let err = AppConfig::from_lookup(lookup(&pairs)).err().unwrap();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "OUTFLOW_SOL_THRESHOLD"));
    }

    #[test]
    fn test_pnl_mode_without_stats_url() {
        let pairs = vec![
            ("GRPC_END_POINT", "https://grpc.example.com"),
            ("HOT_WALLET_ADDRESS", HOT_WALLET),
            ("QUALIFIER_MODE", "pnl"),
            ("SOLANATRACKER_FREE_PLAN", "true"),
        ];
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.qualifier.mode, QualifierMode::Pnl);
        assert_eq!(config.qualifier.free_plan_delay, Some(Duration::from_millis(1100)));
        assert_eq!(config.qualifier.tracker_api_url, DEFAULT_TRACKER_API_URL);
    }

    #[test]
    fn test_stats_mode_requires_stats_url() {
        let pairs = vec![
            ("GRPC_END_POINT", "https://grpc.example.com"),
            ("HOT_WALLET_ADDRESS", HOT_WALLET),
        ];
        let err = AppConfig::from_lookup(lookup(&pairs)).err().unwrap();
        assert_eq!(err, ConfigError::Missing("STATS_API_URL".to_string()));
    }

    #[test]
    fn test_env_files_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env.thresholds"), "A=1").unwrap();
        fs::write(dir.path().join(".env"), "B=2").unwrap();
        fs::write(dir.path().join("notes.txt"), "C=3").unwrap();

        let files = env_files_in(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec![".env", ".env.thresholds"]);
    }
}
