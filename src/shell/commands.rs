use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::MetricsSnapshot;
use crate::models::summary::format_local;
use crate::pipeline::CaptureStatus;
use crate::session::Session;

pub const EMPTY_EXPORT_NOTICE: &str = "No emotion log available yet. Start capture first!";

/// One line typed into the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Start,
    Stop,
    Export,
    Status,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "toggle" | "t" => Ok(Command::Toggle),
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "export" | "e" => Ok(Command::Export),
            "status" | "s" => Ok(Command::Status),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            other => Err(format!(
                "unknown command '{other}' (try toggle, start, stop, export, status, quit)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub status: CaptureStatus,
    pub records: usize,
    pub metrics: MetricsSnapshot,
}

impl StatusReport {
    pub fn summary_line(&self) -> String {
        format!(
            "{} since {} | records: {} | frames: {} (skipped {}) | analyze {:.0} ms | cpu {:.1}% | mem {:.1} MB",
            self.status.as_str(),
            format_local(self.started_at),
            self.records,
            self.metrics.frame_count,
            self.metrics.skipped_count,
            self.metrics.averages.analyze_ms,
            self.metrics.system.cpu_percent,
            self.metrics.system.memory_mb
        )
    }
}

pub async fn toggle_capture(session: &Session) -> Result<CaptureStatus, String> {
    session.toggle().await.map_err(|e| format!("{e:#}"))
}

pub async fn start_capture(session: &Session) -> Result<CaptureStatus, String> {
    session.start().await.map_err(|e| format!("{e:#}"))?;
    Ok(session.status().await)
}

pub async fn stop_capture(session: &Session) -> Result<CaptureStatus, String> {
    session.stop().await.map_err(|e| format!("{e:#}"))?;
    Ok(session.status().await)
}

/// Write the log as CSV into `output_dir`. `None` when nothing was logged.
pub fn export_log(session: &Session, output_dir: &Path) -> Result<Option<PathBuf>, String> {
    let Some(artifact) = session.export().map_err(|e| format!("{e:#}"))? else {
        return Ok(None);
    };
    artifact
        .write_to(output_dir)
        .map(Some)
        .map_err(|e| format!("{e:#}"))
}

pub async fn get_status(session: &Session) -> Result<StatusReport, String> {
    Ok(StatusReport {
        session_id: session.id().to_string(),
        started_at: session.started_at(),
        status: session.status().await,
        records: session.log().len(),
        metrics: session.metrics().get_snapshot().await,
    })
}
