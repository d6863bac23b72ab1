use super::canvas::DrawingSurface;
use crate::error::SurfaceError;
use crate::frame::VideoSource;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Draw the latest camera frame onto the surface if it is not there yet.
///
/// Decoding and scaling run on the blocking pool. Returns whether anything
/// was drawn.
pub async fn render_tick(
    surface: &Arc<DrawingSurface>,
    video: &VideoSource,
) -> Result<bool, SurfaceError> {
    let Some(frame) = video.latest() else {
        return Ok(false);
    };

    if surface.frame_id() == Some(frame.id) {
        return Ok(false);
    }

    let surface = Arc::clone(surface);
    let frame_id = frame.id;
    tokio::task::spawn_blocking(move || surface.draw_frame(&frame))
        .await
        .map_err(|e| SurfaceError::Worker {
            details: format!("drawing frame {}: {}", frame_id, e),
        })??;

    Ok(true)
}

/// Display-refresh loop copying the video source onto the drawing surface.
///
/// Runs regardless of capture state until stopped.
pub struct RenderLoop {
    surface: Arc<DrawingSurface>,
    video: VideoSource,
    refresh_interval: Duration,
    cancellation_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RenderLoop {
    pub fn new(surface: Arc<DrawingSurface>, video: VideoSource, refresh_hz: u32) -> Self {
        let refresh_interval = Duration::from_micros(1_000_000u64 / refresh_hz.max(1) as u64);
        Self {
            surface,
            video,
            refresh_interval,
            cancellation_token: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            debug!("Render loop already running");
            return;
        }

        let surface = Arc::clone(&self.surface);
        let video = self.video.clone();
        let token = self.cancellation_token.clone();
        let period = self.refresh_interval;

        info!("Starting render loop every {:?}", period);

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut failed_frame = None;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match render_tick(&surface, &video).await {
                            Ok(_) => failed_frame = None,
                            Err(e) => {
                                // Log a broken frame once, not on every tick
                                let frame_id = video.latest().map(|f| f.id);
                                if failed_frame != frame_id {
                                    warn!("Failed to draw frame: {}", e);
                                    failed_frame = frame_id;
                                }
                            }
                        }
                    }
                }
            }

            debug!("Render loop stopped");
        }));
    }

    pub async fn stop(&self) {
        self.cancellation_token.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Render loop task ended abnormally: {}", e);
            }
        }
    }
}
