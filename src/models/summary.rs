use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

const LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One completed aggregation window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub dominant_emotion: String,
}

impl SummaryRecord {
    pub fn start_label(&self) -> String {
        format_local(self.window_start)
    }

    pub fn end_label(&self) -> String {
        format_local(self.window_end)
    }
}

/// Local wall-clock time, whole seconds.
pub fn format_local(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format(LABEL_FORMAT).to_string()
}
