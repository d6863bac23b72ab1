use crate::error::Result;
use crate::events::{CatwatchEvent, ControlAction, EventBus};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Translate a key press into the event it requests
pub fn event_for_key(code: KeyCode) -> Option<CatwatchEvent> {
    match code {
        KeyCode::Char('s') | KeyCode::Char('S') => Some(CatwatchEvent::ControlRequested {
            action: ControlAction::Start,
            timestamp: SystemTime::now(),
        }),
        KeyCode::Char('x') | KeyCode::Char('X') => Some(CatwatchEvent::ControlRequested {
            action: ControlAction::Stop,
            timestamp: SystemTime::now(),
        }),
        KeyCode::Char('q') | KeyCode::Esc => Some(CatwatchEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: "User requested via keyboard".to_string(),
        }),
        _ => None,
    }
}

/// Terminal keyboard controls: `s` Start, `x` Stop, `q`/Esc quit
pub struct KeyboardInputHandler {
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Keyboard controls active: s = start, x = stop, q = quit");

        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        let Some(event) = event_for_key(key_event.code) else {
                            debug!("Key pressed: {:?}", key_event.code);
                            continue;
                        };
                        let quitting = matches!(event, CatwatchEvent::ShutdownRequested { .. });

                        let event_bus = Arc::clone(&event_bus);
                        runtime_handle.spawn(async move {
                            if let Err(e) = event_bus.publish(event).await {
                                warn!("Failed to publish keyboard event: {}", e);
                            }
                        });

                        if quitting {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to clean up and disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}
