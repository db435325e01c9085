pub mod envelope;
pub mod error;
pub mod monitor;
pub mod request;
pub mod source;

pub use envelope::{FilterTag, FilteredEnvelope};
pub use error::{StreamError, StreamErrorType};
pub use monitor::{AdmissionGate, EnvelopeHandler, RunOutcome, StreamState, StreamSubscriber, TradePipeline};
pub use request::{Commitment, SubscriptionRequest, TransactionFilter};
pub use source::{GeyserSource, Subscription, TransactionSource};
