use serde::Serialize;

use crate::models::SummaryRecord;

use super::state::LoopExit;

/// Notifications for the UI shell.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    CaptureStarted { device_index: u32 },
    CaptureStopped { exit: LoopExit },
    Warning { message: String },
    FrameSkipped { reason: String },
    SummaryLogged(SummaryRecord),
}
