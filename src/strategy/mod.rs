pub mod analyzer;
pub mod pnl;
pub mod providers;
pub mod stats_api;
pub mod types;

pub use analyzer::{QualificationStrategy, WalletQualifier};
pub use pnl::PnlStrategy;
pub use providers::{HttpWalletProvider, WalletDataProvider};
pub use stats_api::StatsStrategy;
pub use types::{
    Holdings,
    PnlMetrics,
    PnlResponse,
    QualificationResult,
    QualifiedWallet,
    WalletMetrics,
    WalletStats,
};
