use log::info;

use super::{CaptureDevice, CaptureError, DeviceProvider};

/// Live webcam, opened by OpenCV device index.
///
/// Builds without the `camera` feature report every index as unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct CameraProvider;

impl CameraProvider {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "camera")]
mod live {
    use image::RgbImage;
    use log::warn;
    use opencv::core::{AlgorithmHint, Mat};
    use opencv::imgproc;
    use opencv::prelude::*;
    use opencv::videoio::{VideoCapture, CAP_ANY};

    use super::super::{CaptureDevice, CaptureError};

    pub struct CameraDevice {
        capture: VideoCapture,
    }

    pub fn open(index: u32) -> Result<CameraDevice, CaptureError> {
        let unavailable = |reason: String| CaptureError::Unavailable { index, reason };

        let capture =
            VideoCapture::new(index as i32, CAP_ANY).map_err(|err| unavailable(err.to_string()))?;
        if !capture.is_opened().map_err(|err| unavailable(err.to_string()))? {
            return Err(unavailable("camera could not be opened".into()));
        }
        Ok(CameraDevice { capture })
    }

    impl CaptureDevice for CameraDevice {
        fn read_frame(&mut self) -> Result<Option<RgbImage>, CaptureError> {
            let read_err = |err: opencv::Error| CaptureError::Read(err.to_string());

            let mut bgr = Mat::default();
            if !self.capture.read(&mut bgr).map_err(read_err)? || bgr.empty() {
                return Ok(None);
            }

            let mut rgb = Mat::default();
            imgproc::cvt_color(
                &bgr,
                &mut rgb,
                imgproc::COLOR_BGR2RGB,
                0,
                AlgorithmHint::ALGO_HINT_DEFAULT,
            )
            .map_err(read_err)?;

            let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
            let data = rgb.data_bytes().map_err(read_err)?.to_vec();
            RgbImage::from_raw(width, height, data)
                .map(Some)
                .ok_or_else(|| CaptureError::Read(format!("malformed {width}x{height} frame")))
        }

        fn release(&mut self) {
            if let Err(err) = self.capture.release() {
                warn!("failed to release camera: {err}");
            }
        }
    }
}

impl DeviceProvider for CameraProvider {
    #[cfg(feature = "camera")]
    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let device = live::open(index)?;
        info!("opened camera {index}");
        Ok(Box::new(device))
    }

    #[cfg(not(feature = "camera"))]
    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        info!("camera {index} requested but camera support is not compiled in");
        Err(CaptureError::Unavailable {
            index,
            reason: "built without the `camera` feature".into(),
        })
    }
}
