pub mod remote;
pub mod response;

pub use remote::RemoteAnalyzer;

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;

use crate::models::FrameAnalysis;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to encode frame: {0}")]
    Encode(String),

    #[error("analyzer request failed: {0}")]
    Transport(String),

    #[error("analyzer returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode analyzer response: {0}")]
    Decode(String),

    #[error("analyzer returned no results")]
    NoResults,
}

/// Options sent with every analysis request. Not user-configurable.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct AnalyzerOptions {
    pub actions: [&'static str; 4],
    /// `false` keeps frames without a confident face flowing as a
    /// best-effort result instead of failing.
    pub enforce_detection: bool,
    pub detector_backend: &'static str,
    pub align: bool,
}

impl AnalyzerOptions {
    pub const FIXED: AnalyzerOptions = AnalyzerOptions {
        actions: ["age", "gender", "race", "emotion"],
        enforce_detection: false,
        detector_backend: "opencv",
        align: true,
    };
}

/// Facial attribute model, treated as a black box.
///
/// Implementations block for the duration of inference; callers run them
/// on a blocking thread.
pub trait AttributeAnalyzer: Send + Sync {
    fn analyze(&self, frame: &RgbImage) -> Result<FrameAnalysis, AnalyzerError>;
}
