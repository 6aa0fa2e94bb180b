pub mod attributes;
pub mod summary;

pub use attributes::{AttributeResult, Detection, FaceAttributes, FaceRegion, FrameAnalysis};
pub use summary::SummaryRecord;
