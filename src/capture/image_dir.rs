use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use image::RgbImage;
use log::{debug, info};

use super::{CaptureDevice, CaptureError, DeviceProvider};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Replays still images as a camera. Device `N` is the `N`-th directory.
pub struct ImageDirectoryProvider {
    sources: Vec<PathBuf>,
    repeat: bool,
}

impl ImageDirectoryProvider {
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self {
            sources,
            repeat: false,
        }
    }

    /// Start over from the first frame instead of running dry.
    pub fn repeating(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }
}

impl DeviceProvider for ImageDirectoryProvider {
    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let unavailable = |reason: String| CaptureError::Unavailable { index, reason };

        let dir = self
            .sources
            .get(index as usize)
            .ok_or_else(|| unavailable(format!("no source configured for index {index}")))?;
        let frames = list_frames(dir).map_err(|err| unavailable(format!("{}: {err}", dir.display())))?;
        if frames.is_empty() {
            return Err(unavailable(format!("{} holds no frames", dir.display())));
        }

        info!(
            "opened image directory {} as device {} ({} frames)",
            dir.display(),
            index,
            frames.len()
        );
        Ok(Box::new(ImageDirectoryDevice {
            pending: frames.iter().cloned().collect(),
            frames,
            repeat: self.repeat,
        }))
    }
}

struct ImageDirectoryDevice {
    frames: Vec<PathBuf>,
    pending: VecDeque<PathBuf>,
    repeat: bool,
}

impl CaptureDevice for ImageDirectoryDevice {
    fn read_frame(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        if self.pending.is_empty() && self.repeat {
            self.pending = self.frames.iter().cloned().collect();
        }
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let frame = image::open(&path)
            .map_err(|err| CaptureError::Read(format!("{}: {err}", path.display())))?
            .to_rgb8();
        debug!("read frame {} ({}x{})", path.display(), frame.width(), frame.height());
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.pending.clear();
    }
}

fn list_frames(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    frames.sort();
    Ok(frames)
}
