use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;

/// Pixel layout of a camera frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// JPEG per frame, as delivered by V4L2 webcams
    Mjpeg,
    /// Packed 8-bit RGB, as produced by the test pattern
    Rgb24,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Mjpeg => 0, // Variable size, compressed
            FrameFormat::Rgb24 => 3,
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Mjpeg)
    }
}

/// Frame data structure containing raw frame data and metadata
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Unique frame identifier
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared ownership for efficiency)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameData {
    /// Create a new frame data instance
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Get the expected frame size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => true,
        }
    }
}

/// Latest-frame slot between the camera and the render loop.
///
/// Only the most recent frame is kept; a slow reader never sees a backlog.
#[derive(Clone)]
pub struct VideoSource {
    sender: Arc<watch::Sender<Option<FrameData>>>,
}

impl VideoSource {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Replace the current frame
    pub fn publish(&self, frame: FrameData) {
        self.sender.send_replace(Some(frame));
    }

    /// Most recent frame, if the camera has produced one
    pub fn latest(&self) -> Option<FrameData> {
        self.sender.borrow().clone()
    }

    /// Whether a frame is ready to be drawn
    pub fn has_frame(&self) -> bool {
        self.sender.borrow().is_some()
    }

    /// Subscribe to frame changes
    pub fn subscribe(&self) -> watch::Receiver<Option<FrameData>> {
        self.sender.subscribe()
    }
}

impl Default for VideoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_format_properties() {
        assert_eq!(FrameFormat::Mjpeg.bytes_per_pixel(), 0);
        assert_eq!(FrameFormat::Rgb24.bytes_per_pixel(), 3);

        assert!(FrameFormat::Mjpeg.is_compressed());
        assert!(!FrameFormat::Rgb24.is_compressed());
    }

    #[test]
    fn test_frame_size_validation() {
        let valid = FrameData::new(
            1,
            SystemTime::now(),
            vec![0u8; 640 * 480 * 3],
            640,
            480,
            FrameFormat::Rgb24,
        );
        assert!(valid.validate_size());

        let invalid = FrameData::new(2, SystemTime::now(), vec![0u8; 100], 640, 480, FrameFormat::Rgb24);
        assert!(!invalid.validate_size());

        // Compressed frames are always accepted
        let mjpeg = FrameData::new(3, SystemTime::now(), vec![0u8; 5000], 640, 480, FrameFormat::Mjpeg);
        assert!(mjpeg.validate_size());
    }

    #[test]
    fn test_video_source_keeps_latest_frame() {
        let source = VideoSource::new();
        assert!(!source.has_frame());
        assert!(source.latest().is_none());

        for id in 1..=3 {
            source.publish(FrameData::new(
                id,
                SystemTime::now(),
                vec![0u8; 12],
                2,
                2,
                FrameFormat::Rgb24,
            ));
        }

        assert!(source.has_frame());
        assert_eq!(source.latest().map(|f| f.id), Some(3));
    }

    #[tokio::test]
    async fn test_video_source_subscriber_sees_updates() {
        let source = VideoSource::new();
        let mut receiver = source.subscribe();

        source.publish(FrameData::new(7, SystemTime::now(), vec![0u8; 3], 1, 1, FrameFormat::Rgb24));

        receiver.changed().await.unwrap();
        assert_eq!(receiver.borrow().as_ref().map(|f| f.id), Some(7));
    }
}
