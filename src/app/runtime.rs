use super::orchestrator::ShutdownSender;
use super::{CatwatchOrchestrator, ShutdownReason};
use crate::error::{CatwatchError, Result};
use crate::events::{CatwatchEvent, ControlAction, EventFilter, EventReceiver};
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};

impl CatwatchOrchestrator {
    /// Run until a signal or a quit request arrives, then shut down.
    ///
    /// Returns the process exit code.
    pub async fn run(&mut self) -> Result<i32> {
        info!("Catwatch client is running");

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| CatwatchError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers();

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| CatwatchError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("Catwatch client shutdown complete");
        Ok(exit_code)
    }

    /// Route Start/Stop and quit requests from the event bus
    pub(super) fn spawn_control_listener(&self) {
        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::event_types(vec!["control_requested", "shutdown_requested"]),
            "control".to_string(),
        );
        let controller = Arc::clone(&self.controller);
        let shutdown_sender = Arc::clone(&self.shutdown_sender);
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = token.cancelled() => break,
                    event = receiver.recv() => event,
                };

                match event {
                    Ok(CatwatchEvent::ControlRequested { action, .. }) => {
                        let changed = match action {
                            ControlAction::Start => controller.start(),
                            ControlAction::Stop => controller.stop(),
                        };
                        debug!("Control {:?} handled (changed: {})", action, changed);
                    }
                    Ok(CatwatchEvent::ShutdownRequested { reason, .. }) => {
                        send_shutdown(&shutdown_sender, ShutdownReason::UserRequest(reason)).await;
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }

            debug!("Control listener stopped");
        });
    }

    fn setup_signal_handlers(&self) {
        // SIGTERM (systemd stop), Unix only
        #[cfg(unix)]
        {
            let shutdown_sender = Arc::clone(&self.shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    send_shutdown(&shutdown_sender, ShutdownReason::Signal("SIGTERM".to_string()))
                        .await;
                }
            });
        }

        let shutdown_sender = Arc::clone(&self.shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                send_shutdown(&shutdown_sender, ShutdownReason::Signal("SIGINT".to_string())).await;
            }
        });
    }
}

async fn send_shutdown(sender: &ShutdownSender, reason: ShutdownReason) {
    if let Some(sender) = sender.lock().await.take() {
        let _ = sender.send(reason);
    }
}
