use crate::detection::{Detection, DetectionResponse, IndicatorColor};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Whether the periodic capture timer is armed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
}

/// Outcome of merging one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    pub total: usize,
    pub indicator: IndicatorColor,
    pub indicator_changed: bool,
}

/// All mutable client state.
///
/// The detection list only grows; nothing in the crate removes entries.
#[derive(Debug, Default)]
pub struct SessionState {
    detections: Vec<Detection>,
    indicator: IndicatorColor,
    capture_state: CaptureState,
    uploads_issued: u64,
    responses_applied: u64,
    uploads_failed: u64,
    last_response_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle -> Capturing. Returns false when already capturing.
    pub fn begin_capture(&mut self) -> bool {
        if self.capture_state == CaptureState::Capturing {
            return false;
        }
        self.capture_state = CaptureState::Capturing;
        true
    }

    /// Capturing -> Idle. Returns false when already idle.
    pub fn end_capture(&mut self) -> bool {
        if self.capture_state == CaptureState::Idle {
            return false;
        }
        self.capture_state = CaptureState::Idle;
        true
    }

    pub fn record_upload(&mut self) {
        self.uploads_issued += 1;
    }

    pub fn record_failure(&mut self) {
        self.uploads_failed += 1;
    }

    /// Append the response's records and recompute the indicator
    pub fn apply_response(&mut self, response: DetectionResponse) -> MergeOutcome {
        let indicator = response.indicator();
        let added = response.detections.len();

        self.detections.extend(response.detections);
        let indicator_changed = self.indicator != indicator;
        self.indicator = indicator;
        self.responses_applied += 1;
        self.last_response_at = Some(Utc::now());

        MergeOutcome {
            added,
            total: self.detections.len(),
            indicator,
            indicator_changed,
        }
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn indicator(&self) -> IndicatorColor {
        self.indicator
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture_state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            capture_state: self.capture_state,
            indicator: self.indicator,
            detections: self.detections.clone(),
            uploads_issued: self.uploads_issued,
            responses_applied: self.responses_applied,
            uploads_failed: self.uploads_failed,
            last_response_at: self.last_response_at,
        }
    }
}

/// Point-in-time copy handed to the presentation layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub capture_state: CaptureState,
    pub indicator: IndicatorColor,
    pub detections: Vec<Detection>,
    pub uploads_issued: u64,
    pub responses_applied: u64,
    pub uploads_failed: u64,
    pub last_response_at: Option<DateTime<Utc>>,
}

/// Shared handle over [`SessionState`]. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_capture(&self) -> bool {
        self.state.write().begin_capture()
    }

    pub fn end_capture(&self) -> bool {
        self.state.write().end_capture()
    }

    pub fn record_upload(&self) {
        self.state.write().record_upload();
    }

    pub fn record_failure(&self) {
        self.state.write().record_failure();
    }

    pub fn apply_response(&self, response: DetectionResponse) -> MergeOutcome {
        let outcome = self.state.write().apply_response(response);
        debug!(
            "Merged {} detections ({} total), indicator {}",
            outcome.added,
            outcome.total,
            outcome.indicator.as_str()
        );
        outcome
    }

    pub fn capture_state(&self) -> CaptureState {
        self.state.read().capture_state()
    }

    pub fn indicator(&self) -> IndicatorColor {
        self.state.read().indicator()
    }

    pub fn detection_count(&self) -> usize {
        self.state.read().detections().len()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.read().snapshot()
    }
}
