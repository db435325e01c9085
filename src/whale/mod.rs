pub mod cache;
pub mod detector;
pub mod types;

pub use cache::{DedupStore, InsertOutcome};
pub use detector::OutflowDecoder;
pub use types::{OutflowCandidate, Skip};
