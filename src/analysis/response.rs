//! Wire format of a DeepFace-compatible `/analyze` endpoint.

use std::collections::HashMap;

use serde::Deserialize;

use crate::analysis::AnalyzerError;
use crate::models::{Detection, FaceAttributes, FaceRegion, FrameAnalysis};

/// Newer servers wrap the faces in `{"results": [...]}`; older ones return
/// the bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    Wrapped { results: Vec<RawFace> },
    Bare(Vec<RawFace>),
}

#[derive(Debug, Deserialize)]
pub struct RawFace {
    pub age: f64,
    pub dominant_gender: String,
    #[serde(default)]
    pub gender: HashMap<String, f64>,
    pub dominant_race: String,
    pub dominant_emotion: String,
    #[serde(default)]
    pub emotion: HashMap<String, f64>,
    pub region: RawRegion,
    #[serde(default)]
    pub face_confidence: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawRegion {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl AnalyzeResponse {
    /// First face of the response. Only the first face is tracked per frame.
    pub fn into_first(self) -> Result<FrameAnalysis, AnalyzerError> {
        let faces = match self {
            AnalyzeResponse::Wrapped { results } => results,
            AnalyzeResponse::Bare(faces) => faces,
        };
        faces
            .into_iter()
            .next()
            .map(RawFace::into_analysis)
            .ok_or(AnalyzerError::NoResults)
    }
}

impl RawFace {
    pub fn into_analysis(self) -> FrameAnalysis {
        let region = FaceRegion::new(self.region.x, self.region.y, self.region.w, self.region.h);
        // Non-strict mode reports a zero confidence over the default region.
        let detection = if self.face_confidence > 0.0 {
            Detection::Face {
                region,
                confidence: self.face_confidence.min(1.0),
            }
        } else {
            Detection::NoFace {
                fallback_region: region,
            }
        };

        FrameAnalysis {
            attributes: FaceAttributes {
                age: self.age.max(0.0).round() as u32,
                dominant_gender: self.dominant_gender,
                gender_scores: from_percent(self.gender),
                dominant_race: self.dominant_race,
                dominant_emotion: self.dominant_emotion,
                emotion_scores: from_percent(self.emotion),
            },
            detection,
        }
    }
}

fn from_percent(scores: HashMap<String, f64>) -> HashMap<String, f64> {
    scores
        .into_iter()
        .map(|(label, score)| (label, (score / 100.0).clamp(0.0, 1.0)))
        .collect()
}

pub fn parse_analysis(body: &str) -> Result<FrameAnalysis, AnalyzerError> {
    serde_json::from_str::<AnalyzeResponse>(body)
        .map_err(|err| AnalyzerError::Decode(err.to_string()))?
        .into_first()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACE: &str = r#"{
        "results": [{
            "age": 31.4,
            "dominant_emotion": "happy",
            "emotion": {"angry": 0.1, "happy": 97.25, "neutral": 2.65},
            "dominant_gender": "Man",
            "gender": {"Man": 99.5, "Woman": 0.5},
            "dominant_race": "latino hispanic",
            "race": {"latino hispanic": 71.0, "white": 29.0},
            "region": {"x": 210, "y": 96, "w": 180, "h": 180, "left_eye": [260, 150], "right_eye": null},
            "face_confidence": 0.93
        }, {
            "age": 50,
            "dominant_emotion": "sad",
            "dominant_gender": "Woman",
            "dominant_race": "white",
            "region": {"x": 0, "y": 0, "w": 10, "h": 10},
            "face_confidence": 0.5
        }]
    }"#;

    #[test]
    fn parses_first_face_and_normalizes_scores() {
        let analysis = parse_analysis(FACE).unwrap();
        let attrs = &analysis.attributes;

        assert_eq!(attrs.age, 31);
        assert_eq!(attrs.dominant_emotion, "happy");
        assert_eq!(attrs.dominant_race, "latino hispanic");
        assert!((attrs.dominant_emotion_score() - 0.9725).abs() < 1e-9);
        assert!((attrs.dominant_gender_score() - 0.995).abs() < 1e-9);
        assert_eq!(
            analysis.detection,
            Detection::Face {
                region: FaceRegion::new(210, 96, 180, 180),
                confidence: 0.93,
            }
        );
    }

    #[test]
    fn zero_confidence_is_no_face() {
        let body = r#"[{
            "age": 27,
            "dominant_emotion": "neutral",
            "emotion": {"neutral": 88.0},
            "dominant_gender": "Woman",
            "gender": {"Woman": 64.0, "Man": 36.0},
            "dominant_race": "asian",
            "region": {"x": 0, "y": 0, "w": 640, "h": 480},
            "face_confidence": 0
        }]"#;

        let analysis = parse_analysis(body).unwrap();
        assert_eq!(
            analysis.detection,
            Detection::NoFace {
                fallback_region: FaceRegion::full_frame(640, 480),
            }
        );
    }

    #[test]
    fn empty_results_is_an_error() {
        assert!(matches!(
            parse_analysis(r#"{"results": []}"#),
            Err(AnalyzerError::NoResults)
        ));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            parse_analysis(r#"{"error": "boom"}"#),
            Err(AnalyzerError::Decode(_))
        ));
    }
}
