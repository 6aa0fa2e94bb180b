pub mod buffer;
pub mod config;

pub use buffer::{dominant_emotion, flush, should_flush, AggregationBuffer, FlushOutcome};
pub use config::AggregationConfig;
