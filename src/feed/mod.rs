pub mod sol_price;

pub use sol_price::{PriceOracle, SolPriceFeed};
