use super::{CatwatchOrchestrator, ComponentState};
use crate::camera::CameraInterfaceBuilder;
use crate::error::Result;
use crate::events::CatwatchEvent;
use std::time::SystemTime;
use tracing::{error, info};

impl CatwatchOrchestrator {
    /// Register every component as stopped
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing catwatch components");

        let mut states = self.component_states.lock().await;
        states.insert("render".to_string(), ComponentState::Stopped);
        states.insert("camera".to_string(), ComponentState::Stopped);
        states.insert("capture".to_string(), ComponentState::Stopped);
        #[cfg(feature = "ui")]
        states.insert("ui".to_string(), ComponentState::Stopped);

        if self.keyboard_enabled {
            states.insert("keyboard".to_string(), ComponentState::Stopped);
        }
        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start all components.
    ///
    /// Camera failure is logged and the client keeps running with a black
    /// surface. Failing to bind the UI listener is a startup error.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting catwatch client");

        self.set_component_state("render", ComponentState::Starting)
            .await;
        self.render_loop.start();
        self.set_component_state("render", ComponentState::Running)
            .await;

        // Acquired once; no retry
        self.set_component_state("camera", ComponentState::Starting)
            .await;
        match self.acquire_camera().await {
            Ok(()) => {
                self.set_component_state("camera", ComponentState::Running)
                    .await;
                self.publish_camera_status(true).await;
                info!("Camera acquired");
            }
            Err(e) => {
                error!("Camera acquisition failed, continuing without video: {}", e);
                self.set_component_state("camera", ComponentState::Failed)
                    .await;
                self.publish_camera_status(false).await;
            }
        }

        // Idle until the first Start control
        self.spawn_control_listener();
        self.set_component_state("capture", ComponentState::Running)
            .await;

        #[cfg(feature = "ui")]
        {
            self.set_component_state("ui", ComponentState::Starting).await;

            let listener = match self.ui_server.bind().await {
                Ok(listener) => listener,
                Err(e) => {
                    error!("Failed to start web UI: {}", e);
                    self.set_component_state("ui", ComponentState::Failed).await;
                    return Err(e);
                }
            };
            self.ui_addr = listener.local_addr().ok();

            let server = std::sync::Arc::clone(&self.ui_server);
            let event_bus = std::sync::Arc::clone(&self.event_bus);
            self.ui_task = Some(tokio::spawn(async move {
                let result = server.serve(listener).await;
                if let Err(e) = &result {
                    let _ = event_bus
                        .publish(CatwatchEvent::SystemError {
                            component: "ui".to_string(),
                            error: e.to_string(),
                        })
                        .await;
                }
                result
            }));

            self.set_component_state("ui", ComponentState::Running).await;
        }

        if self.keyboard_enabled {
            self.set_component_state("keyboard", ComponentState::Starting)
                .await;

            self.keyboard_handler.start().await.map_err(|e| {
                error!("Failed to start keyboard handler: {}", e);
                e
            })?;

            self.set_component_state("keyboard", ComponentState::Running)
                .await;
        }

        info!("Catwatch client started");
        Ok(())
    }

    async fn acquire_camera(&mut self) -> Result<()> {
        let camera = CameraInterfaceBuilder::new()
            .config(self.config.camera.clone())
            .build()
            .await?;

        camera.start_capture(self.video.clone()).await?;
        self.camera = Some(camera);
        Ok(())
    }

    async fn publish_camera_status(&self, connected: bool) {
        let _ = self
            .event_bus
            .publish(CatwatchEvent::CameraStatusChanged {
                connected,
                timestamp: SystemTime::now(),
            })
            .await;
    }
}
