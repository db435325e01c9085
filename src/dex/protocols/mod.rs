pub mod raydium;

pub use raydium::AmmOperation;
