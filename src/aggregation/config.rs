use std::time::Duration;

/// Tunables for emotion aggregation.
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// Wall-clock length of one window, measured from the window start.
    pub interval: Duration,
}

impl AggregationConfig {
    pub fn with_interval_secs(secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(secs),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}
