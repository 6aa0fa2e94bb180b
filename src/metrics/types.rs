use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage timings for one processed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureMetrics {
    pub timestamp: DateTime<Utc>,
    pub read_ms: u64,
    pub analyze_ms: u64,
    pub annotate_ms: u64,
    pub total_ms: u64,
    pub face_detected: bool,
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

/// Mean stage timings over the recent frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageAverages {
    pub read_ms: f64,
    pub analyze_ms: f64,
    pub annotate_ms: f64,
    pub total_ms: f64,
    /// Share of frames in which a face was located, 0..=1.
    pub face_rate: f64,
}

impl StageAverages {
    pub fn from_captures(captures: &[CaptureMetrics]) -> Self {
        if captures.is_empty() {
            return Self::default();
        }
        let n = captures.len() as f64;
        let mean = |stage: fn(&CaptureMetrics) -> u64| {
            captures.iter().map(|c| stage(c) as f64).sum::<f64>() / n
        };

        Self {
            read_ms: mean(|c| c.read_ms),
            analyze_ms: mean(|c| c.analyze_ms),
            annotate_ms: mean(|c| c.annotate_ms),
            total_ms: mean(|c| c.total_ms),
            face_rate: captures.iter().filter(|c| c.face_detected).count() as f64 / n,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub system: SystemMetrics,
    pub recent_captures: Vec<CaptureMetrics>,
    pub averages: StageAverages,
    pub frame_count: u64,
    pub skipped_count: u64,
    pub summary_count: u64,
}
