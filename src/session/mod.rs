pub mod log;

pub use self::log::{ExportArtifact, SessionLog, EXPORT_CONTENT_TYPE, EXPORT_FILE_NAME};

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use image::RgbImage;
use tokio::sync::{broadcast, watch, Mutex};
use uuid::Uuid;

use crate::analysis::AttributeAnalyzer;
use crate::capture::DeviceProvider;
use crate::metrics::MetricsCollector;
use crate::pipeline::{
    CaptureController, CaptureStatus, Clock, LoopConfig, LoopContext, LoopReport, SessionEvent,
};

const EVENT_CAPACITY: usize = 64;

/// Collaborators a session is built from.
pub struct SessionParts {
    pub provider: Arc<dyn DeviceProvider>,
    pub analyzer: Arc<dyn AttributeAnalyzer>,
    pub clock: Arc<dyn Clock>,
    pub device_index: u32,
    pub config: LoopConfig,
}

/// Per-user state that outlives individual start/stop cycles: the capture
/// state machine and the session log. Nothing here is ever reset.
pub struct Session {
    id: String,
    started_at: DateTime<Utc>,
    log: SessionLog,
    controller: Mutex<CaptureController>,
    events: broadcast::Sender<SessionEvent>,
    frames: watch::Receiver<Option<Arc<RgbImage>>>,
    metrics: MetricsCollector,
}

impl Session {
    pub fn new(parts: SessionParts) -> Self {
        let log = SessionLog::new();
        let metrics = MetricsCollector::new();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (frame_tx, frames) = watch::channel(None);
        let started_at = parts.clock.now();

        let context = LoopContext {
            analyzer: parts.analyzer,
            log: log.clone(),
            clock: parts.clock,
            frames: Arc::new(frame_tx),
            events: events.clone(),
            metrics: metrics.clone(),
            config: parts.config,
        };
        let controller = CaptureController::new(parts.provider, parts.device_index, context);

        Self {
            id: Uuid::new_v4().to_string(),
            started_at,
            log,
            controller: Mutex::new(controller),
            events,
            frames,
            metrics,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub async fn status(&self) -> CaptureStatus {
        self.controller.lock().await.status()
    }

    pub async fn start(&self) -> Result<()> {
        self.controller.lock().await.start().await
    }

    pub async fn stop(&self) -> Result<Option<LoopReport>> {
        self.controller.lock().await.stop().await
    }

    pub async fn toggle(&self) -> Result<CaptureStatus> {
        self.controller.lock().await.toggle().await
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn export(&self) -> Result<Option<ExportArtifact>> {
        self.log.export()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Latest annotated frame.
    pub fn frames(&self) -> watch::Receiver<Option<Arc<RgbImage>>> {
        self.frames.clone()
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// End of session: stop capture if it is still running.
    pub async fn shutdown(&self) -> Result<()> {
        self.stop().await.map(|_| ())
    }
}
