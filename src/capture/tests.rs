use super::*;
use crate::detection::{Detection, DetectionResponse, DetectionService, IndicatorColor};
use crate::error::DetectorError;
use crate::events::{CatwatchEvent, EventBus};
use crate::session::{CaptureState, Session};
use crate::surface::DrawingSurface;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

const INTERVAL: Duration = Duration::from_secs(10);

type Reply = Result<DetectionResponse, DetectorError>;

/// Detector double that hands out scripted replies and counts calls
#[derive(Default)]
struct ScriptedDetector {
    replies: Mutex<VecDeque<(Duration, Reply)>>,
    uploads: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedDetector {
    fn push_reply(&self, reply: Reply) {
        self.push_delayed_reply(Duration::ZERO, reply);
    }

    /// Reply only after `delay` has passed since the upload
    fn push_delayed_reply(&self, delay: Duration, reply: Reply) {
        self.replies.lock().push_back((delay, reply));
    }

    fn upload_count(&self) -> usize {
        self.uploads.lock().len()
    }
}

#[async_trait]
impl DetectionService for ScriptedDetector {
    async fn detect(&self, jpeg: Vec<u8>) -> Result<DetectionResponse, DetectorError> {
        self.uploads.lock().push(jpeg);
        let scripted = self.replies.lock().pop_front();
        let (delay, reply) =
            scripted.unwrap_or_else(|| (Duration::ZERO, Ok(DetectionResponse::default())));

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

struct Harness {
    controller: CaptureController,
    detector: Arc<ScriptedDetector>,
    session: Arc<Session>,
    event_bus: Arc<EventBus>,
}

fn harness() -> Harness {
    let detector = Arc::new(ScriptedDetector::default());
    let session = Arc::new(Session::new());
    let event_bus = Arc::new(EventBus::new(64));
    let controller = CaptureController::new(
        INTERVAL,
        80,
        Arc::new(DrawingSurface::new(32, 24)),
        Arc::clone(&detector) as Arc<dyn DetectionService>,
        Arc::clone(&session),
        Arc::clone(&event_bus),
    );

    Harness {
        controller,
        detector,
        session,
        event_bus,
    }
}

fn cat(confidence: f64) -> Detection {
    Detection {
        name: "cat".to_string(),
        confidence,
        xmin: 10.0,
        ymin: 20.0,
        xmax: 100.0,
        ymax: 200.0,
    }
}

/// Let spawned timer and upload tasks run to completion
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn elapse(duration: Duration) {
    tokio::time::sleep(duration).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_idle_never_uploads() {
    let h = harness();

    elapse(INTERVAL * 5).await;

    assert_eq!(h.detector.upload_count(), 0);
    assert_eq!(h.session.capture_state(), CaptureState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_first_capture_waits_one_interval() {
    let h = harness();
    assert!(h.controller.start());

    elapse(INTERVAL - Duration::from_millis(100)).await;
    assert_eq!(h.detector.upload_count(), 0);

    elapse(Duration::from_millis(200)).await;
    assert_eq!(h.detector.upload_count(), 1);

    // The upload is the surface as a JPEG
    let uploads = h.detector.uploads.lock();
    assert_eq!(&uploads[0][..2], &[0xFF, 0xD8]);
}

#[tokio::test(start_paused = true)]
async fn test_cat_on_sofa_scenario() {
    let h = harness();
    h.detector.push_reply(Ok(DetectionResponse {
        detections: vec![cat(0.87)],
        cat_stay: Some("sofa".to_string()),
    }));

    h.controller.start();
    elapse(INTERVAL + Duration::from_millis(1)).await;

    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.detections, vec![cat(0.87)]);
    assert_eq!(snapshot.indicator, IndicatorColor::Red);
    assert_eq!(snapshot.uploads_issued, 1);
    assert_eq!(snapshot.responses_applied, 1);
}

#[tokio::test(start_paused = true)]
async fn test_list_grows_by_sum_of_replies() {
    let h = harness();
    h.detector.push_reply(Ok(DetectionResponse {
        detections: vec![cat(0.1), cat(0.2)],
        cat_stay: Some("table".to_string()),
    }));
    h.detector.push_reply(Ok(DetectionResponse {
        detections: vec![cat(0.3)],
        cat_stay: Some("sofa".to_string()),
    }));
    h.detector.push_reply(Ok(DetectionResponse {
        detections: vec![cat(0.4), cat(0.5), cat(0.6)],
        cat_stay: Some("elsewhere".to_string()),
    }));

    h.controller.start();
    elapse(INTERVAL * 3 + Duration::from_millis(1)).await;

    assert_eq!(h.detector.upload_count(), 3);
    let snapshot = h.session.snapshot();
    let confidences: Vec<f64> = snapshot.detections.iter().map(|d| d.confidence).collect();
    assert_eq!(confidences, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    assert_eq!(snapshot.indicator, IndicatorColor::Black);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_uploads_apply_in_arrival_order() {
    let h = harness();
    // The first reply is still in flight when the second upload is answered
    h.detector.push_delayed_reply(
        INTERVAL + INTERVAL / 2,
        Ok(DetectionResponse {
            detections: vec![cat(0.1)],
            cat_stay: Some("sofa".to_string()),
        }),
    );
    h.detector.push_reply(Ok(DetectionResponse {
        detections: vec![cat(0.2)],
        cat_stay: Some("table".to_string()),
    }));

    h.controller.start();
    elapse(INTERVAL * 2 + Duration::from_millis(1)).await;
    assert_eq!(h.detector.upload_count(), 2);
    // Stop does not cancel the slow upload
    assert!(h.controller.stop());

    let snapshot = h.session.snapshot();
    let confidences: Vec<f64> = snapshot.detections.iter().map(|d| d.confidence).collect();
    assert_eq!(confidences, vec![0.2]);
    assert_eq!(snapshot.indicator, IndicatorColor::Green);

    elapse(INTERVAL).await;

    let snapshot = h.session.snapshot();
    let confidences: Vec<f64> = snapshot.detections.iter().map(|d| d.confidence).collect();
    assert_eq!(confidences, vec![0.2, 0.1]);
    // The slow reply arrived last, so its indicator wins
    assert_eq!(snapshot.indicator, IndicatorColor::Red);
    assert_eq!(snapshot.responses_applied, 2);
    assert_eq!(h.detector.upload_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_upload_leaves_state_unchanged() {
    let h = harness();
    h.detector.push_reply(Ok(DetectionResponse {
        detections: vec![cat(0.9)],
        cat_stay: Some("table".to_string()),
    }));
    h.detector.push_reply(Err(DetectorError::Transport {
        details: "Connection refused".to_string(),
    }));
    h.detector.push_reply(Err(DetectorError::Malformed {
        details: "missing detections".to_string(),
    }));

    let mut events = h.event_bus.subscribe();
    h.controller.start();
    elapse(INTERVAL * 3 + Duration::from_millis(1)).await;

    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.detections, vec![cat(0.9)]);
    assert_eq!(snapshot.indicator, IndicatorColor::Green);
    assert_eq!(snapshot.uploads_issued, 3);
    assert_eq!(snapshot.uploads_failed, 2);

    let mut failures = 0;
    while let Ok(event) = events.try_recv() {
        if let CatwatchEvent::UploadFailed { .. } = event {
            failures += 1;
        }
    }
    assert_eq!(failures, 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_mid_interval_prevents_further_uploads() {
    let h = harness();
    h.controller.start();

    elapse(INTERVAL + Duration::from_millis(1)).await;
    assert_eq!(h.detector.upload_count(), 1);

    elapse(INTERVAL / 2).await;
    assert!(h.controller.stop());
    assert!(!h.controller.is_capturing());

    elapse(INTERVAL * 5).await;
    assert_eq!(h.detector.upload_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_does_not_carry_partial_interval() {
    let h = harness();
    h.controller.start();
    elapse(INTERVAL - Duration::from_secs(1)).await;
    h.controller.stop();

    h.controller.start();
    // the old timer would have fired here
    elapse(Duration::from_secs(2)).await;
    assert_eq!(h.detector.upload_count(), 0);

    elapse(INTERVAL).await;
    assert_eq!(h.detector.upload_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_and_stop_when_idle_are_noops() {
    let h = harness();

    assert!(!h.controller.stop());
    assert!(h.controller.start());
    assert!(!h.controller.start());

    elapse(INTERVAL + Duration::from_millis(1)).await;
    // a second Start must not arm a second timer
    assert_eq!(h.detector.upload_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_active_iff_last_action_was_start() {
    let h = harness();
    let actions = [true, true, false, false, true, false, true];

    for (step, start) in actions.iter().enumerate() {
        if *start {
            h.controller.start();
        } else {
            h.controller.stop();
        }
        assert_eq!(h.controller.is_capturing(), *start, "after action {}", step);

        let before = h.detector.upload_count();
        elapse(INTERVAL + Duration::from_millis(1)).await;
        let fired = h.detector.upload_count() > before;
        assert_eq!(fired, *start, "timer activity after action {}", step);
    }
}
