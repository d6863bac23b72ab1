use crate::frame::{FrameData, FrameFormat};
use image::{Rgb, RgbImage};
use std::time::SystemTime;

/// Synthetic RGB frames for running without camera hardware.
///
/// Draws a diagonal gradient with a vertical bar that sweeps across the frame,
/// so successive frames differ visibly.
pub struct TestPattern {
    width: u32,
    height: u32,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn render(&self, frame_id: u64) -> RgbImage {
        let bar_width = (self.width / 16).max(1);
        let bar_x = ((frame_id * 4) % self.width.max(1) as u64) as u32;

        RgbImage::from_fn(self.width, self.height, |x, y| {
            if x >= bar_x && x < bar_x + bar_width {
                return Rgb([240, 240, 240]);
            }
            let r = (x * 255 / self.width.max(1)) as u8;
            let g = (y * 255 / self.height.max(1)) as u8;
            Rgb([r, g, 96])
        })
    }

    pub fn frame(&self, frame_id: u64) -> FrameData {
        FrameData::new(
            frame_id,
            SystemTime::now(),
            self.render(frame_id).into_raw(),
            self.width,
            self.height,
            FrameFormat::Rgb24,
        )
    }
}
