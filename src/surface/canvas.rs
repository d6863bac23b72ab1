use crate::error::SurfaceError;
use crate::frame::{FrameData, FrameFormat};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::trace;

struct SurfaceInner {
    image: RgbImage,
    frame_id: Option<u64>,
    drawn_at: Option<SystemTime>,
    frames_drawn: u64,
}

/// Fixed-size bitmap that mirrors the live camera feed.
///
/// Only the render loop draws into it; capture and the UI stream read it.
/// A fresh surface is black.
pub struct DrawingSurface {
    width: u32,
    height: u32,
    inner: RwLock<SurfaceInner>,
}

impl DrawingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            inner: RwLock::new(SurfaceInner {
                image: RgbImage::new(width, height),
                frame_id: None,
                drawn_at: None,
                frames_drawn: 0,
            }),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Id of the camera frame currently on the surface
    pub fn frame_id(&self) -> Option<u64> {
        self.inner.read().frame_id
    }

    pub fn drawn_at(&self) -> Option<SystemTime> {
        self.inner.read().drawn_at
    }

    pub fn frames_drawn(&self) -> u64 {
        self.inner.read().frames_drawn
    }

    /// Decode `frame`, scale it to the surface size and draw it.
    ///
    /// Decoding happens outside the lock so readers are never blocked on it.
    pub fn draw_frame(&self, frame: &FrameData) -> Result<(), SurfaceError> {
        let decoded = decode_frame(frame)?;
        let scaled = if decoded.dimensions() == (self.width, self.height) {
            decoded
        } else {
            imageops::resize(&decoded, self.width, self.height, FilterType::Triangle)
        };

        let mut inner = self.inner.write();
        inner.image = scaled;
        inner.frame_id = Some(frame.id);
        inner.drawn_at = Some(SystemTime::now());
        inner.frames_drawn += 1;
        trace!("Drew frame {} onto surface", frame.id);

        Ok(())
    }

    /// Copy of the current bitmap
    pub fn snapshot(&self) -> RgbImage {
        self.inner.read().image.clone()
    }

    /// Extract the current bitmap as a JPEG. Encoding runs on the blocking pool.
    pub async fn extract_jpeg(self: &Arc<Self>, quality: u8) -> Result<Vec<u8>, SurfaceError> {
        let surface = Arc::clone(self);
        tokio::task::spawn_blocking(move || encode_jpeg(&surface.snapshot(), quality))
            .await
            .map_err(|e| SurfaceError::Worker {
                details: format!("JPEG extraction: {}", e),
            })?
    }
}

fn decode_frame(frame: &FrameData) -> Result<RgbImage, SurfaceError> {
    match frame.format {
        FrameFormat::Mjpeg => image::load_from_memory_with_format(&frame.data, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(|e| SurfaceError::Decode {
                frame_id: frame.id,
                details: e.to_string(),
            }),
        FrameFormat::Rgb24 => {
            let expected = frame.expected_size().unwrap_or_default();
            if !frame.validate_size() {
                return Err(SurfaceError::FrameSize {
                    frame_id: frame.id,
                    expected,
                    actual: frame.data.len(),
                });
            }
            RgbImage::from_raw(frame.width, frame.height, frame.data.as_ref().clone()).ok_or(
                SurfaceError::FrameSize {
                    frame_id: frame.id,
                    expected,
                    actual: frame.data.len(),
                },
            )
        }
    }
}

pub(crate) fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, SurfaceError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode_image(image)
        .map_err(|e| SurfaceError::JpegEncoding {
            details: e.to_string(),
        })?;
    Ok(buf)
}
