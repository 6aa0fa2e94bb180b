use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Face bounding box in frame pixel coordinates.
///
/// `x`/`y` are signed because analyzers are allowed to report boxes that
/// start outside the frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering a whole `width` x `height` frame.
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// Where the attributes were computed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Detection {
    /// A face was confidently located.
    Face { region: FaceRegion, confidence: f64 },
    /// No confident face; attributes were estimated over a default region.
    NoFace { fallback_region: FaceRegion },
}

impl Detection {
    pub fn region(&self) -> FaceRegion {
        match self {
            Detection::Face { region, .. } => *region,
            Detection::NoFace { fallback_region } => *fallback_region,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Detection::Face { confidence, .. } => *confidence,
            Detection::NoFace { .. } => 0.0,
        }
    }

    pub fn is_face(&self) -> bool {
        matches!(self, Detection::Face { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaceAttributes {
    pub age: u32,
    pub dominant_gender: String,
    /// Gender label -> confidence in [0, 1].
    pub gender_scores: HashMap<String, f64>,
    pub dominant_race: String,
    pub dominant_emotion: String,
    /// Emotion label -> confidence in [0, 1].
    pub emotion_scores: HashMap<String, f64>,
}

impl FaceAttributes {
    pub fn dominant_gender_score(&self) -> f64 {
        self.gender_scores
            .get(&self.dominant_gender)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn dominant_emotion_score(&self) -> f64 {
        self.emotion_scores
            .get(&self.dominant_emotion)
            .copied()
            .unwrap_or(0.0)
    }
}

/// What the analyzer returns for one frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameAnalysis {
    pub attributes: FaceAttributes,
    pub detection: Detection,
}

/// One analyzed frame, stamped with the wall-clock time it was analyzed at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttributeResult {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub analysis: FrameAnalysis,
}

impl AttributeResult {
    pub fn new(timestamp: DateTime<Utc>, analysis: FrameAnalysis) -> Self {
        Self {
            timestamp,
            analysis,
        }
    }

    /// Seconds since the Unix epoch.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp.timestamp_micros() as f64 / 1_000_000.0
    }

    pub fn dominant_emotion(&self) -> &str {
        &self.analysis.attributes.dominant_emotion
    }

    pub fn face_region(&self) -> FaceRegion {
        self.analysis.detection.region()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn analysis_with_emotion(emotion: &str) -> FrameAnalysis {
        let mut emotion_scores = HashMap::new();
        emotion_scores.insert(emotion.to_string(), 0.87);
        let mut gender_scores = HashMap::new();
        gender_scores.insert("Woman".to_string(), 0.9713);
        gender_scores.insert("Man".to_string(), 0.0287);

        FrameAnalysis {
            attributes: FaceAttributes {
                age: 29,
                dominant_gender: "Woman".into(),
                gender_scores,
                dominant_race: "asian".into(),
                dominant_emotion: emotion.into(),
                emotion_scores,
            },
            detection: Detection::Face {
                region: FaceRegion::new(40, 120, 60, 60),
                confidence: 0.9234,
            },
        }
    }

    pub fn result_at(timestamp: DateTime<Utc>, emotion: &str) -> AttributeResult {
        AttributeResult::new(timestamp, analysis_with_emotion(emotion))
    }
}
