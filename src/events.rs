use crate::detection::IndicatorColor;
use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// User controls that can arrive from any input surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlAction {
    Start,
    Stop,
}

/// Events that can occur in the catwatch client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CatwatchEvent {
    /// Camera acquisition succeeded or was lost
    CameraStatusChanged {
        connected: bool,
        timestamp: SystemTime,
    },
    /// A user control was triggered (keyboard, web page)
    ControlRequested {
        action: ControlAction,
        timestamp: SystemTime,
    },
    /// The capture timer was armed
    CaptureStarted { timestamp: SystemTime },
    /// The capture timer was cancelled
    CaptureStopped { timestamp: SystemTime },
    /// The surface was extracted and an upload was issued
    FrameCaptured { bytes: usize, timestamp: SystemTime },
    /// A detection response was merged into the session
    DetectionsReceived {
        added: usize,
        total: usize,
        timestamp: SystemTime,
    },
    /// The indicator color was recomputed from a response
    IndicatorChanged {
        color: IndicatorColor,
        timestamp: SystemTime,
    },
    /// An upload failed; the session was left untouched
    UploadFailed { error: String, timestamp: SystemTime },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl CatwatchEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            CatwatchEvent::CameraStatusChanged { connected, .. } => format!(
                "Camera {}",
                if *connected {
                    "connected"
                } else {
                    "disconnected"
                }
            ),
            CatwatchEvent::ControlRequested { action, .. } => {
                format!("Control requested: {:?}", action)
            }
            CatwatchEvent::CaptureStarted { .. } => "Capture started".to_string(),
            CatwatchEvent::CaptureStopped { .. } => "Capture stopped".to_string(),
            CatwatchEvent::FrameCaptured { bytes, .. } => {
                format!("Frame captured ({} bytes)", bytes)
            }
            CatwatchEvent::DetectionsReceived { added, total, .. } => {
                format!("{} detections received ({} total)", added, total)
            }
            CatwatchEvent::IndicatorChanged { color, .. } => {
                format!("Indicator is {}", color.as_str())
            }
            CatwatchEvent::UploadFailed { error, .. } => format!("Upload failed: {}", error),
            CatwatchEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            CatwatchEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            CatwatchEvent::CameraStatusChanged { .. } => "camera_status_changed",
            CatwatchEvent::ControlRequested { .. } => "control_requested",
            CatwatchEvent::CaptureStarted { .. } => "capture_started",
            CatwatchEvent::CaptureStopped { .. } => "capture_stopped",
            CatwatchEvent::FrameCaptured { .. } => "frame_captured",
            CatwatchEvent::DetectionsReceived { .. } => "detections_received",
            CatwatchEvent::IndicatorChanged { .. } => "indicator_changed",
            CatwatchEvent::UploadFailed { .. } => "upload_failed",
            CatwatchEvent::SystemError { .. } => "system_error",
            CatwatchEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Broadcast bus connecting controls, the capture timer and the UI
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CatwatchEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatwatchEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Fails when nobody is listening; most publishers ignore that.
    pub async fn publish(&self, event: CatwatchEvent) -> Result<usize, EventBusError> {
        match &event {
            CatwatchEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            CatwatchEvent::CameraStatusChanged { connected, .. } => {
                if *connected {
                    info!("Camera connected");
                } else {
                    warn!("Camera disconnected");
                }
            }
            CatwatchEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Set of event types a receiver is interested in
#[derive(Debug, Clone)]
pub struct EventFilter {
    event_types: Vec<&'static str>,
}

impl EventFilter {
    pub fn event_types(event_types: Vec<&'static str>) -> Self {
        Self { event_types }
    }

    pub fn matches(&self, event: &CatwatchEvent) -> bool {
        self.event_types.contains(&event.event_type())
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<CatwatchEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<CatwatchEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    ///
    /// A lagged receiver skips the lost events and keeps going; only a closed
    /// bus ends the stream.
    pub async fn recv(&mut self) -> Result<CatwatchEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let event = CatwatchEvent::DetectionsReceived {
            added: 2,
            total: 5,
            timestamp: SystemTime::now(),
        };

        let subscriber_count = event_bus.publish(event).await.unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            CatwatchEvent::DetectionsReceived { added, total, .. } => {
                assert_eq!(added, 2);
                assert_eq!(total, 5);
            }
            other => panic!("Unexpected event type: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_fails() {
        let event_bus = EventBus::new(10);
        let result = event_bus
            .publish(CatwatchEvent::CaptureStarted {
                timestamp: SystemTime::now(),
            })
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus
            .publish(CatwatchEvent::CaptureStopped {
                timestamp: SystemTime::now(),
            })
            .await
            .unwrap();

        let _ = timeout(Duration::from_millis(100), receiver1.recv())
            .await
            .unwrap()
            .unwrap();
        let _ = timeout(Duration::from_millis(100), receiver2.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let receiver = event_bus.subscribe();
        let filter = EventFilter::event_types(vec!["control_requested"]);
        let mut filtered = EventReceiver::new(receiver, filter, "test".to_string());

        event_bus
            .publish(CatwatchEvent::FrameCaptured {
                bytes: 1024,
                timestamp: SystemTime::now(),
            })
            .await
            .unwrap();
        event_bus
            .publish(CatwatchEvent::ControlRequested {
                action: ControlAction::Stop,
                timestamp: SystemTime::now(),
            })
            .await
            .unwrap();

        let event = timeout(Duration::from_millis(100), filtered.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            CatwatchEvent::ControlRequested { action, .. } => {
                assert_eq!(action, ControlAction::Stop)
            }
            other => panic!("Filter let through {:?}", other),
        }
    }

    #[test]
    fn test_filter_matches_listed_types_only() {
        let filter = EventFilter::event_types(vec!["system_error", "shutdown_requested"]);

        assert!(filter.matches(&CatwatchEvent::SystemError {
            component: "ui".to_string(),
            error: "accept failed".to_string(),
        }));
        assert!(!filter.matches(&CatwatchEvent::CaptureStarted {
            timestamp: SystemTime::now(),
        }));
    }

    #[test]
    fn test_event_properties() {
        let event = CatwatchEvent::IndicatorChanged {
            color: IndicatorColor::Red,
            timestamp: SystemTime::now(),
        };
        assert_eq!(event.event_type(), "indicator_changed");
        assert_eq!(event.description(), "Indicator is red");

        let event = CatwatchEvent::UploadFailed {
            error: "connection refused".to_string(),
            timestamp: SystemTime::now(),
        };
        assert_eq!(event.event_type(), "upload_failed");
        assert!(event.description().contains("connection refused"));
    }
}
