pub mod camera;
pub mod image_dir;

pub use camera::CameraProvider;
pub use image_dir::ImageDirectoryProvider;

use image::RgbImage;
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture device {index} unavailable: {reason}")]
    Unavailable { index: u32, reason: String },

    #[error("failed to read frame: {0}")]
    Read(String),
}

/// An opened camera. Owned by exactly one capture loop at a time.
pub trait CaptureDevice: Send {
    /// Next frame, or `None` when the device has nothing more to give.
    fn read_frame(&mut self) -> Result<Option<RgbImage>, CaptureError>;

    /// Let go of the underlying device.
    fn release(&mut self);
}

/// Opens capture devices by index.
pub trait DeviceProvider: Send + Sync {
    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError>;
}

/// Owning wrapper that releases the device exactly once, when dropped.
pub struct DeviceHandle {
    index: u32,
    device: Box<dyn CaptureDevice>,
}

impl DeviceHandle {
    pub fn new(index: u32, device: Box<dyn CaptureDevice>) -> Self {
        Self { index, device }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn read_frame(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        self.device.read_frame()
    }

}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.device.release();
        info!("capture device {} released", self.index);
    }
}
