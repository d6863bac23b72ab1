use super::{CatwatchOrchestrator, ComponentState};
use crate::error::{CatwatchError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

impl CatwatchOrchestrator {
    /// Stop every component; returns 1 if any of them failed to stop
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Ends the control listener, the UI server and open streams
        self.cancellation_token.cancel();

        let mut components = vec!["capture", "render", "camera"];
        if cfg!(feature = "ui") {
            components.push("ui");
        }
        if self.keyboard_enabled {
            components.insert(0, "keyboard");
        }

        let mut exit_code = 0;
        for component in components {
            if let Err(e) = self.stop_component(component).await {
                error!("Error stopping {}: {}", component, e);
                exit_code = 1;
            }
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_component(&mut self, component: &str) -> Result<()> {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        let result = match component {
            "keyboard" => {
                let handler = &self.keyboard_handler;
                stop_within(component, Duration::from_secs(2), handler.stop()).await
            }
            "capture" => {
                // In-flight uploads are left to finish on their own
                self.controller.stop();
                Ok(())
            }
            "render" => {
                let render_loop = &self.render_loop;
                stop_within(component, Duration::from_secs(5), async {
                    render_loop.stop().await;
                    Ok(())
                })
                .await
            }
            "camera" => match &self.camera {
                Some(camera) => {
                    stop_within(component, Duration::from_secs(10), camera.stop_capture()).await
                }
                None => Ok(()),
            },
            "ui" => match self.ui_task.take() {
                Some(task) => {
                    stop_within(component, Duration::from_secs(5), async {
                        task.await.map_err(|e| {
                            CatwatchError::component(
                                "ui".to_string(),
                                format!("Server task failed: {}", e),
                            )
                        })?
                    })
                    .await
                }
                None => Ok(()),
            },
            other => Err(CatwatchError::system(format!(
                "Unknown component '{}'",
                other
            ))),
        };

        match &result {
            Ok(()) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
            }
            Err(_) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
            }
        }

        result
    }
}

async fn stop_within<F>(component: &str, limit: Duration, stop: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match timeout(limit, stop).await {
        Ok(result) => result,
        Err(_) => {
            error!("{} component stop timeout", component);
            Err(CatwatchError::system(format!(
                "{} component stop timeout",
                component
            )))
        }
    }
}
