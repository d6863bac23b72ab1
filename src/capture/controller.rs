use crate::detection::DetectionService;
use crate::events::{CatwatchEvent, EventBus};
use crate::session::{CaptureState, Session};
use crate::surface::DrawingSurface;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Everything one capture-and-upload cycle touches
#[derive(Clone)]
struct CaptureContext {
    surface: Arc<DrawingSurface>,
    detector: Arc<dyn DetectionService>,
    session: Arc<Session>,
    event_bus: Arc<EventBus>,
    jpeg_quality: u8,
}

impl CaptureContext {
    /// Extract the surface and fire off an upload without waiting for it
    async fn capture_once(&self) {
        let jpeg = match self.surface.extract_jpeg(self.jpeg_quality).await {
            Ok(jpeg) => jpeg,
            Err(e) => {
                error!("Failed to extract surface: {}", e);
                return;
            }
        };

        let bytes = jpeg.len();
        self.session.record_upload();
        debug!("Captured {} byte frame from surface", bytes);
        let _ = self
            .event_bus
            .publish(CatwatchEvent::FrameCaptured {
                bytes,
                timestamp: SystemTime::now(),
            })
            .await;

        let ctx = self.clone();
        tokio::spawn(async move { ctx.upload(jpeg).await });
    }

    async fn upload(&self, jpeg: Vec<u8>) {
        match self.detector.detect(jpeg).await {
            Ok(response) => {
                let outcome = self.session.apply_response(response);
                info!(
                    "Received {} detections ({} total), indicator {}",
                    outcome.added,
                    outcome.total,
                    outcome.indicator.as_str()
                );

                let _ = self
                    .event_bus
                    .publish(CatwatchEvent::DetectionsReceived {
                        added: outcome.added,
                        total: outcome.total,
                        timestamp: SystemTime::now(),
                    })
                    .await;

                if outcome.indicator_changed {
                    let _ = self
                        .event_bus
                        .publish(CatwatchEvent::IndicatorChanged {
                            color: outcome.indicator,
                            timestamp: SystemTime::now(),
                        })
                        .await;
                }
            }
            Err(e) => {
                self.session.record_failure();
                error!("Detection upload failed: {}", e);
                let _ = self
                    .event_bus
                    .publish(CatwatchEvent::UploadFailed {
                        error: e.to_string(),
                        timestamp: SystemTime::now(),
                    })
                    .await;
            }
        }
    }
}

/// Start/Stop state machine driving the periodic capture timer.
///
/// While capturing, the surface is extracted and uploaded once per interval,
/// the first time one full interval after Start. Uploads run detached: the
/// timer never waits for them and Stop does not cancel them.
pub struct CaptureController {
    interval: Duration,
    ctx: CaptureContext,
    timer: Mutex<Option<CancellationToken>>,
}

impl CaptureController {
    pub fn new(
        interval: Duration,
        jpeg_quality: u8,
        surface: Arc<DrawingSurface>,
        detector: Arc<dyn DetectionService>,
        session: Arc<Session>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            interval,
            ctx: CaptureContext {
                surface,
                detector,
                session,
                event_bus,
                jpeg_quality,
            },
            timer: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_capturing(&self) -> bool {
        self.ctx.session.capture_state() == CaptureState::Capturing
    }

    /// Idle -> Capturing. Returns false if already capturing.
    pub fn start(&self) -> bool {
        let mut timer = self.timer.lock();
        if !self.ctx.session.begin_capture() {
            debug!("Start ignored, already capturing");
            return false;
        }

        let token = CancellationToken::new();
        *timer = Some(token.clone());
        drop(timer);

        let ctx = self.ctx.clone();
        let period = self.interval;
        info!("Capture started, uploading every {:?}", period);

        tokio::spawn(async move {
            let _ = ctx
                .event_bus
                .publish(CatwatchEvent::CaptureStarted {
                    timestamp: SystemTime::now(),
                })
                .await;

            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => ctx.capture_once().await,
                }
            }

            debug!("Capture timer cancelled");
        });

        true
    }

    /// Capturing -> Idle. Returns false if already idle.
    pub fn stop(&self) -> bool {
        let mut timer = self.timer.lock();
        if !self.ctx.session.end_capture() {
            debug!("Stop ignored, not capturing");
            return false;
        }

        if let Some(token) = timer.take() {
            token.cancel();
        }
        drop(timer);

        info!("Capture stopped");
        let event_bus = Arc::clone(&self.ctx.event_bus);
        tokio::spawn(async move {
            let _ = event_bus
                .publish(CatwatchEvent::CaptureStopped {
                    timestamp: SystemTime::now(),
                })
                .await;
        });

        true
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        if let Some(token) = self.timer.lock().take() {
            token.cancel();
        }
    }
}
