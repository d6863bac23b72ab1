use super::pattern::TestPattern;
use crate::config::{CameraConfig, CameraSource};
use crate::error::{CameraError, Result};
use crate::frame::VideoSource;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[cfg(all(feature = "camera", target_os = "linux"))]
use crate::frame::{FrameData, FrameFormat};
#[cfg(all(feature = "camera", target_os = "linux"))]
use gstreamer::prelude::*;
#[cfg(all(feature = "camera", target_os = "linux"))]
use gstreamer::Pipeline;
#[cfg(all(feature = "camera", target_os = "linux"))]
use gstreamer_app::AppSink;
#[cfg(all(feature = "camera", target_os = "linux"))]
use gstreamer_video::VideoInfo;
#[cfg(all(feature = "camera", target_os = "linux"))]
use std::time::SystemTime;
#[cfg(all(feature = "camera", target_os = "linux"))]
use tokio::sync::mpsc;
#[cfg(all(feature = "camera", target_os = "linux"))]
use tracing::trace;

/// Camera feed owner. Frames are published into a [`VideoSource`].
pub struct CameraInterface {
    config: CameraConfig,
    frame_counter: Arc<AtomicU64>,
    is_running: Arc<AtomicBool>,
    cancellation_token: CancellationToken,
    #[cfg(all(feature = "camera", target_os = "linux"))]
    pipeline: Option<Pipeline>,
    capture_task: Arc<tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl CameraInterface {
    /// Open the configured frame source
    pub async fn new(config: CameraConfig) -> Result<Self> {
        info!(
            "Initializing camera interface ({:?}, device {}, {}x{} @ {}fps)",
            config.source, config.index, config.resolution.0, config.resolution.1, config.fps
        );

        if config.source == CameraSource::None {
            return Err(CameraError::Disabled.into());
        }

        let mut camera = Self {
            config,
            frame_counter: Arc::new(AtomicU64::new(0)),
            is_running: Arc::new(AtomicBool::new(false)),
            cancellation_token: CancellationToken::new(),
            #[cfg(all(feature = "camera", target_os = "linux"))]
            pipeline: None,
            capture_task: Arc::new(tokio::sync::Mutex::new(None)),
        };

        if camera.config.source == CameraSource::Device {
            camera.initialize_pipeline()?;
        }

        Ok(camera)
    }

    /// Build the GStreamer pipeline for the V4L2 device
    #[cfg(all(feature = "camera", target_os = "linux"))]
    fn initialize_pipeline(&mut self) -> Result<()> {
        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let pipeline_desc = self.build_pipeline_string();
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        self.pipeline = Some(pipeline);
        Ok(())
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    fn initialize_pipeline(&mut self) -> Result<()> {
        Err(CameraError::DeviceOpen {
            index: self.config.index,
            details: "built without camera support; use camera.source = \"test_pattern\""
                .to_string(),
        }
        .into())
    }

    /// Build GStreamer pipeline string for MJPEG capture
    #[cfg(all(feature = "camera", target_os = "linux"))]
    fn build_pipeline_string(&self) -> String {
        let (width, height) = self.config.resolution;

        format!(
            "v4l2src device=/dev/video{} io-mode=mmap do-timestamp=true ! \
             image/jpeg,width={},height={},framerate={}/1 ! \
             queue max-size-buffers=4 leaky=downstream ! \
             appsink name=sink sync=false max-buffers=2 drop=true enable-last-sample=false emit-signals=false",
            self.config.index, width, height, self.config.fps
        )
    }

    /// Start streaming frames into `video`.
    ///
    /// Fails if the device cannot be brought to the playing state; there is
    /// no retry.
    pub async fn start_capture(&self, video: VideoSource) -> Result<()> {
        if self.is_running.load(Ordering::Relaxed) {
            warn!("Camera capture is already running");
            return Ok(());
        }

        info!("Starting camera capture");

        match self.config.source {
            CameraSource::Device => self.start_device_capture(video).await?,
            CameraSource::TestPattern => self.start_pattern_capture(video).await,
            CameraSource::None => return Err(CameraError::Disabled.into()),
        }

        self.is_running.store(true, Ordering::Relaxed);
        Ok(())
    }

    #[cfg(all(feature = "camera", target_os = "linux"))]
    async fn start_device_capture(&self, video: VideoSource) -> Result<()> {
        let pipeline = self
            .pipeline
            .clone()
            .ok_or_else(|| CameraError::Configuration {
                details: "Pipeline not initialized".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Configuration {
                details: "Pipeline has no appsink".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink
                        .pull_sample()
                        .map_err(|_| gstreamer::FlowError::Eos)?;
                    let _ = tx.send(sample);
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CameraError::DeviceOpen {
                index: self.config.index,
                details: format!("Failed to start pipeline: {}", e),
            })?;

        // Device errors (missing node, permission denied) surface while prerolling
        let (state_change, _, _) = pipeline.state(gstreamer::ClockTime::from_seconds(5));
        if let Err(e) = state_change {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(CameraError::DeviceOpen {
                index: self.config.index,
                details: format!("Pipeline failed to reach PLAYING: {}", e),
            }
            .into());
        }

        info!("GStreamer pipeline started successfully");

        let frame_counter = Arc::clone(&self.frame_counter);
        let token = self.cancellation_token.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    sample = rx.recv() => {
                        let Some(sample) = sample else {
                            warn!("Camera sample channel closed");
                            break;
                        };
                        if let Err(e) = Self::process_gst_sample(sample, &frame_counter, &video) {
                            error!("Error processing GStreamer sample: {}", e);
                        }
                    }
                }
            }

            let _ = pipeline.set_state(gstreamer::State::Null);
            info!("GStreamer capture loop stopped");
        });

        *self.capture_task.lock().await = Some(task);
        Ok(())
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    async fn start_device_capture(&self, _video: VideoSource) -> Result<()> {
        Err(CameraError::DeviceOpen {
            index: self.config.index,
            details: "built without camera support".to_string(),
        }
        .into())
    }

    /// Convert a GStreamer sample into a frame
    #[cfg(all(feature = "camera", target_os = "linux"))]
    fn process_gst_sample(
        sample: gstreamer::Sample,
        frame_counter: &AtomicU64,
        video: &VideoSource,
    ) -> Result<()> {
        let buffer = sample.buffer().ok_or_else(|| CameraError::CaptureStream {
            details: "No buffer in sample".to_string(),
        })?;

        let caps = sample.caps().ok_or_else(|| CameraError::CaptureStream {
            details: "No caps in sample".to_string(),
        })?;

        // Compressed caps carry no VideoInfo; fall back to the structure fields
        let (width, height) = match VideoInfo::from_caps(caps) {
            Ok(info) => (info.width(), info.height()),
            Err(_) => {
                let structure = caps.structure(0).ok_or_else(|| CameraError::CaptureStream {
                    details: "Empty caps in sample".to_string(),
                })?;
                let width = structure.get::<i32>("width").unwrap_or_default().max(0) as u32;
                let height = structure.get::<i32>("height").unwrap_or_default().max(0) as u32;
                (width, height)
            }
        };

        let map = buffer
            .map_readable()
            .map_err(|e| CameraError::CaptureStream {
                details: format!("Failed to map buffer: {}", e),
            })?;

        let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);
        trace!(
            "Captured MJPEG frame {} ({}x{}, {} bytes)",
            frame_id,
            width,
            height,
            map.len()
        );

        video.publish(FrameData::new(
            frame_id,
            SystemTime::now(),
            map.as_slice().to_vec(),
            width,
            height,
            FrameFormat::Mjpeg,
        ));

        Ok(())
    }

    async fn start_pattern_capture(&self, video: VideoSource) {
        let (width, height) = self.config.resolution;
        let fps = self.config.fps.max(1);
        let frame_counter = Arc::clone(&self.frame_counter);
        let token = self.cancellation_token.clone();

        let task = tokio::spawn(async move {
            let pattern = TestPattern::new(width, height);
            let mut ticker = tokio::time::interval(Duration::from_micros(1_000_000 / fps as u64));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            info!("Test pattern capture started ({}x{} @ {}fps)", width, height, fps);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);
                        video.publish(pattern.frame(frame_id));
                    }
                }
            }

            info!("Test pattern capture stopped");
        });

        *self.capture_task.lock().await = Some(task);
    }

    /// Stop camera capture and release the device
    pub async fn stop_capture(&self) -> Result<()> {
        if !self.is_running.load(Ordering::Relaxed) {
            debug!("Camera capture is not running");
            return Ok(());
        }

        info!("Stopping camera capture");
        self.is_running.store(false, Ordering::Relaxed);
        self.cancellation_token.cancel();

        if let Some(task) = self.capture_task.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(3), task).await {
                Ok(Ok(())) => debug!("Camera capture task completed"),
                Ok(Err(e)) => error!("Error waiting for camera capture task: {}", e),
                Err(_) => warn!("Camera capture task did not complete within timeout"),
            }
        }

        info!("Camera capture stopped");
        Ok(())
    }

    /// Check if camera is currently capturing
    pub fn is_capturing(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Get camera configuration
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Get current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }
}
