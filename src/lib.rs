pub mod config;
pub mod constants;
pub mod context;
pub mod dex;
pub mod feed;
pub mod http;
pub mod logging;
pub mod strategy;
pub mod stream;
pub mod whale;

pub use config::AppConfig;
pub use context::AppContext;
pub use stream::{RunOutcome, StreamSubscriber};
