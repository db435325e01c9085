pub mod protocols;
pub mod analyzer;
pub mod types;

pub use protocols::raydium::AmmOperation;

pub use analyzer::AmmDecoder;
pub use types::{
    CompiledIx,
    DecodedInstruction,
    DecodedTransaction,
    InnerIxGroup,
    Skip,
    TokenBalance,
    TradeEvent,
};
