use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum CaptureStatus {
    #[default]
    Stopped,
    Running,
}

impl CaptureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStatus::Stopped => "Stopped",
            CaptureStatus::Running => "Running",
        }
    }
}

/// Why a capture loop ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "reason", rename_all = "camelCase")]
pub enum LoopExit {
    Cancelled,
    DeviceFailure(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoopReport {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    /// Buffered results dropped because the window was still open at exit.
    pub frames_discarded: u64,
    pub exit: LoopExit,
}
