mod types;

pub use types::{CaptureMetrics, MetricsSnapshot, StageAverages, SystemMetrics};

use std::collections::VecDeque;
use std::sync::Arc;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::Mutex;

const RECENT_FRAME_WINDOW: usize = 20;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Per-session pipeline counters plus process CPU and memory.
///
/// Clones share state.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<CollectorState>>,
}

struct CollectorState {
    recent: VecDeque<CaptureMetrics>,
    frames: u64,
    skipped: u64,
    summaries: u64,
    system: System,
    pid: Pid,
}

impl CollectorState {
    /// CPU usage is a delta between refreshes; the first one reads as 0.
    fn sample_process(&mut self) -> SystemMetrics {
        let pid = self.pid;
        self.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        self.system
            .process(pid)
            .map(|process| SystemMetrics {
                cpu_percent: process.cpu_usage(),
                memory_mb: process.memory() as f64 / BYTES_PER_MB,
            })
            .unwrap_or_default()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        let pid = Pid::from_u32(std::process::id());
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            inner: Arc::new(Mutex::new(CollectorState {
                recent: VecDeque::with_capacity(RECENT_FRAME_WINDOW),
                frames: 0,
                skipped: 0,
                summaries: 0,
                system,
                pid,
            })),
        }
    }

    /// Process CPU percent and resident memory in MB.
    pub async fn sample_system_metrics(&self) -> (f32, f64) {
        let sample = self.inner.lock().await.sample_process();
        (sample.cpu_percent, sample.memory_mb)
    }

    pub async fn record_frame(&self, metrics: CaptureMetrics) {
        let mut state = self.inner.lock().await;
        state.frames += 1;
        if state.recent.len() == RECENT_FRAME_WINDOW {
            state.recent.pop_front();
        }
        state.recent.push_back(metrics);
    }

    pub async fn record_skip(&self) {
        self.inner.lock().await.skipped += 1;
    }

    pub async fn record_summary(&self) {
        self.inner.lock().await.summaries += 1;
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let mut state = self.inner.lock().await;
        let system = state.sample_process();
        let recent_captures: Vec<CaptureMetrics> = state.recent.iter().cloned().collect();

        MetricsSnapshot {
            system,
            averages: StageAverages::from_captures(&recent_captures),
            recent_captures,
            frame_count: state.frames,
            skipped_count: state.skipped,
            summary_count: state.summaries,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn frame_metrics(total_ms: u64, face_detected: bool) -> CaptureMetrics {
        CaptureMetrics {
            timestamp: Utc::now(),
            read_ms: 1,
            analyze_ms: total_ms - 2,
            annotate_ms: 1,
            total_ms,
            face_detected,
            cpu_percent: 0.0,
            memory_mb: 0.0,
        }
    }

    #[tokio::test]
    async fn recent_captures_are_bounded() {
        let metrics = MetricsCollector::new();
        for i in 0..25 {
            metrics.record_frame(frame_metrics(10 + i, true)).await;
        }
        metrics.record_skip().await;
        metrics.record_summary().await;

        let snapshot = metrics.get_snapshot().await;
        assert_eq!(snapshot.frame_count, 25);
        assert_eq!(snapshot.skipped_count, 1);
        assert_eq!(snapshot.summary_count, 1);
        assert_eq!(snapshot.recent_captures.len(), RECENT_FRAME_WINDOW);
        assert_eq!(snapshot.recent_captures[0].total_ms, 15);
    }

    #[tokio::test]
    async fn averages_cover_recent_frames() {
        let metrics = MetricsCollector::new();
        metrics.record_frame(frame_metrics(10, true)).await;
        metrics.record_frame(frame_metrics(30, false)).await;

        let averages = metrics.get_snapshot().await.averages;
        assert_eq!(averages.total_ms, 20.0);
        assert_eq!(averages.analyze_ms, 18.0);
        assert_eq!(averages.read_ms, 1.0);
        assert_eq!(averages.face_rate, 0.5);
    }

    #[test]
    fn no_frames_average_to_zero() {
        assert_eq!(StageAverages::from_captures(&[]), StageAverages::default());
    }

    #[tokio::test]
    async fn clones_share_counters() {
        let metrics = MetricsCollector::new();
        let other = metrics.clone();
        other.record_skip().await;
        assert_eq!(metrics.get_snapshot().await.skipped_count, 1);
    }
}
