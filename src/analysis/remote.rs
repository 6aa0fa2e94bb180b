use std::io::Cursor;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, RgbImage};
use log::debug;
use serde::Serialize;

use crate::analysis::response::parse_analysis;
use crate::analysis::{AnalyzerError, AnalyzerOptions, AttributeAnalyzer};
use crate::models::FrameAnalysis;

const JPEG_QUALITY: u8 = 90;

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    img: String,
    #[serde(flatten)]
    options: &'a AnalyzerOptions,
}

/// Client for a DeepFace-compatible HTTP service.
pub struct RemoteAnalyzer {
    agent: ureq::Agent,
    analyze_url: String,
    options: AnalyzerOptions,
}

impl RemoteAnalyzer {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            analyze_url: format!("{}/analyze", endpoint.trim_end_matches('/')),
            options: AnalyzerOptions::FIXED,
        }
    }

    pub fn analyze_url(&self) -> &str {
        &self.analyze_url
    }
}

impl AttributeAnalyzer for RemoteAnalyzer {
    fn analyze(&self, frame: &RgbImage) -> Result<FrameAnalysis, AnalyzerError> {
        let request = AnalyzeRequest {
            img: encode_data_uri(frame)?,
            options: &self.options,
        };

        let response = match self.agent.post(&self.analyze_url).send_json(&request) {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(AnalyzerError::Status { status, body });
            }
            Err(err) => return Err(AnalyzerError::Transport(err.to_string())),
        };

        let body = response
            .into_string()
            .map_err(|err| AnalyzerError::Transport(err.to_string()))?;
        debug!("analyzer responded with {} bytes", body.len());
        parse_analysis(&body)
    }
}

/// JPEG-encode the frame as a `data:` URI.
pub fn encode_data_uri(frame: &RgbImage) -> Result<String, AnalyzerError> {
    let mut jpeg = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(frame)
        .map_err(|err| AnalyzerError::Encode(err.to_string()))?;
    Ok(format!(
        "data:image/jpeg;base64,{}",
        STANDARD.encode(jpeg.into_inner())
    ))
}
