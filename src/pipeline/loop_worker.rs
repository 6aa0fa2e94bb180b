use std::sync::Arc;

use image::RgbImage;
use tokio::sync::{broadcast, watch};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::aggregation::{AggregationBuffer, AggregationConfig, FlushOutcome};
use crate::analysis::{AnalyzerError, AttributeAnalyzer};
use crate::annotate::{annotate, display_lines, OverlayStyle};
use crate::capture::{CaptureError, DeviceHandle};
use crate::metrics::{CaptureMetrics, MetricsCollector};
use crate::models::{AttributeResult, FrameAnalysis};
use crate::session::SessionLog;

use super::clock::Clock;
use super::events::SessionEvent;
use super::state::{LoopExit, LoopReport};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const WEBCAM_WARNING: &str = "Failed to access webcam";

/// Latest annotated frame, for display.
pub type FrameSender = Arc<watch::Sender<Option<Arc<RgbImage>>>>;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Pause between iterations.
    pub frame_delay: Duration,
    pub aggregation: AggregationConfig,
    pub overlay: OverlayStyle,
    /// Log stage timings every this many frames.
    pub timings_every: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frame_delay: Duration::from_millis(50),
            aggregation: AggregationConfig::default(),
            overlay: OverlayStyle::default(),
            timings_every: 20,
        }
    }
}

/// Everything a capture loop needs besides the device itself.
#[derive(Clone)]
pub struct LoopContext {
    pub analyzer: Arc<dyn AttributeAnalyzer>,
    pub log: SessionLog,
    pub clock: Arc<dyn Clock>,
    pub frames: FrameSender,
    pub events: broadcast::Sender<SessionEvent>,
    pub metrics: MetricsCollector,
    pub config: LoopConfig,
}

impl LoopContext {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Drive one Running period: read, analyze, stamp, buffer, annotate,
/// publish, flush, pace. Ends on cancellation or device failure.
///
/// Cancellation is observed between stages only; an in-flight read or
/// analysis always runs to completion. The device is released when the
/// loop returns.
pub async fn capture_loop(
    device: DeviceHandle,
    ctx: LoopContext,
    cancel_token: CancellationToken,
) -> LoopReport {
    let device_index = device.index();
    let mut device = Some(device);
    let mut buffer = AggregationBuffer::new(ctx.clock.now(), ctx.config.aggregation.clone());
    let mut frames_processed: u64 = 0;
    let mut frames_skipped: u64 = 0;

    log_info!("capture loop started on device {}", device_index);

    let exit = loop {
        if cancel_token.is_cancelled() {
            break LoopExit::Cancelled;
        }

        let iteration_start = Instant::now();

        let Some(handle) = device.take() else {
            break LoopExit::DeviceFailure("capture device handle lost".into());
        };
        let (returned, read) = read_frame(handle).await;
        device = returned;
        let read_ms = iteration_start.elapsed().as_millis() as u64;

        let frame = match read {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                break device_failure(&ctx, "no frame available".into());
            }
            Err(err) => {
                break device_failure(&ctx, err.to_string());
            }
        };

        let analyze_start = Instant::now();
        let (frame, analysis) = match analyze_frame(Arc::clone(&ctx.analyzer), frame).await {
            Ok(analyzed) => analyzed,
            Err(err) => {
                frames_skipped += 1;
                log_error!("analysis failed, skipping frame: {err}");
                ctx.metrics.record_skip().await;
                ctx.emit(SessionEvent::FrameSkipped {
                    reason: err.to_string(),
                });
                if pace(ctx.config.frame_delay, &cancel_token).await {
                    break LoopExit::Cancelled;
                }
                continue;
            }
        };
        let analyze_ms = analyze_start.elapsed().as_millis() as u64;

        let now = ctx.clock.now();
        let result = AttributeResult::new(now, analysis);

        let annotate_start = Instant::now();
        let lines = display_lines(&result.analysis);
        let annotated = annotate(
            &frame,
            result.face_region(),
            result.dominant_emotion(),
            &lines,
            &ctx.config.overlay,
        );
        let face_detected = result.analysis.detection.is_face();
        buffer.add(result);
        ctx.frames.send_replace(Some(Arc::new(annotated)));
        let annotate_ms = annotate_start.elapsed().as_millis() as u64;
        frames_processed += 1;

        match buffer.poll(now) {
            FlushOutcome::Record(record) => {
                log_info!(
                    "logged dominant emotion '{}' for window {} - {}",
                    record.dominant_emotion,
                    record.start_label(),
                    record.end_label()
                );
                ctx.log.append(record.clone());
                ctx.metrics.record_summary().await;
                ctx.emit(SessionEvent::SummaryLogged(record));
            }
            FlushOutcome::Empty => {
                log_info!("aggregation interval elapsed over an empty window");
            }
            FlushOutcome::Pending => {}
        }

        let (cpu_percent, memory_mb) = ctx.metrics.sample_system_metrics().await;
        let total_ms = iteration_start.elapsed().as_millis() as u64;
        ctx.metrics
            .record_frame(CaptureMetrics {
                timestamp: now,
                read_ms,
                analyze_ms,
                annotate_ms,
                total_ms,
                face_detected,
                cpu_percent,
                memory_mb,
            })
            .await;

        if ctx.config.timings_every > 0 && frames_processed % ctx.config.timings_every == 0 {
            log_info!(
                "frame {} processed in {}ms (read: {}ms, analyze: {}ms, annotate: {}ms, cpu: {:.1}%)",
                frames_processed,
                total_ms,
                read_ms,
                analyze_ms,
                annotate_ms,
                cpu_percent
            );
        }

        if pace(ctx.config.frame_delay, &cancel_token).await {
            break LoopExit::Cancelled;
        }
    };

    let window_opened = buffer.window_start();
    let frames_discarded = buffer.discard() as u64;
    if frames_discarded > 0 {
        log_info!(
            "discarded {} buffered results from the window opened at {}",
            frames_discarded,
            window_opened
        );
    }

    // Release before announcing the stop.
    drop(device);

    log_info!(
        "capture loop stopped after {} frames ({} skipped): {:?}",
        frames_processed,
        frames_skipped,
        exit
    );
    ctx.emit(SessionEvent::CaptureStopped { exit: exit.clone() });

    LoopReport {
        frames_processed,
        frames_skipped,
        frames_discarded,
        exit,
    }
}

fn device_failure(ctx: &LoopContext, reason: String) -> LoopExit {
    log_warn!("capture device failed: {reason}");
    ctx.emit(SessionEvent::Warning {
        message: WEBCAM_WARNING.to_string(),
    });
    LoopExit::DeviceFailure(reason)
}

/// Read on the blocking pool. The handle comes back unless the worker died,
/// in which case it was dropped (and released) on that thread.
async fn read_frame(
    mut device: DeviceHandle,
) -> (Option<DeviceHandle>, Result<Option<RgbImage>, CaptureError>) {
    match tokio::task::spawn_blocking(move || {
        let read = device.read_frame();
        (device, read)
    })
    .await
    {
        Ok((device, read)) => (Some(device), read),
        Err(err) => (
            None,
            Err(CaptureError::Read(format!("capture worker failed: {err}"))),
        ),
    }
}

async fn analyze_frame(
    analyzer: Arc<dyn AttributeAnalyzer>,
    frame: RgbImage,
) -> Result<(RgbImage, FrameAnalysis), AnalyzerError> {
    let (frame, analysis) = tokio::task::spawn_blocking(move || {
        let analysis = analyzer.analyze(&frame);
        (frame, analysis)
    })
    .await
    .map_err(|err| AnalyzerError::Transport(format!("analyzer worker failed: {err}")))?;
    Ok((frame, analysis?))
}

/// Sleep between iterations. Returns true when cancelled meanwhile.
async fn pace(delay: Duration, cancel_token: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => cancel_token.is_cancelled(),
        _ = cancel_token.cancelled() => true,
    }
}
