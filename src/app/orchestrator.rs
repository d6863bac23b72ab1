use super::types::{ComponentState, ShutdownReason};
use crate::camera::CameraInterface;
use crate::capture::CaptureController;
use crate::config::CatwatchConfig;
use crate::detection::{DetectionService, HttpDetectionClient};
use crate::error::Result;
use crate::events::EventBus;
use crate::frame::VideoSource;
use crate::session::Session;
use crate::surface::{DrawingSurface, RenderLoop};
use crate::ui::KeyboardInputHandler;
#[cfg(feature = "ui")]
use crate::ui::UiServer;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub(super) type ShutdownSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

/// Owns every component of the client and drives their lifecycle
pub struct CatwatchOrchestrator {
    pub(super) config: CatwatchConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) video: VideoSource,
    pub(super) surface: Arc<DrawingSurface>,
    pub(super) session: Arc<Session>,

    // Components
    pub(super) render_loop: RenderLoop,
    pub(super) controller: Arc<CaptureController>,
    pub(super) camera: Option<CameraInterface>,
    #[cfg(feature = "ui")]
    pub(super) ui_server: Arc<UiServer>,
    pub(super) ui_task: Option<JoinHandle<Result<()>>>,
    pub(super) ui_addr: Option<SocketAddr>,
    pub(super) keyboard_handler: KeyboardInputHandler,
    pub(super) keyboard_enabled: bool,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: ShutdownSender,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl CatwatchOrchestrator {
    /// Create an orchestrator talking to the configured detection endpoint
    pub async fn new(config: CatwatchConfig) -> Result<Self> {
        let detector: Arc<dyn DetectionService> =
            Arc::new(HttpDetectionClient::new(&config.detector));
        Self::with_detector(config, detector).await
    }

    /// Create an orchestrator with a specific detection service
    pub async fn with_detector(
        config: CatwatchConfig,
        detector: Arc<dyn DetectionService>,
    ) -> Result<Self> {
        info!(
            "Building catwatch client (surface {}x{}, capture every {}s, detector {})",
            config.surface.width,
            config.surface.height,
            config.capture.interval_seconds,
            config.detector.endpoint
        );

        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let video = VideoSource::new();
        let surface = Arc::new(DrawingSurface::new(
            config.surface.width,
            config.surface.height,
        ));
        let session = Arc::new(Session::new());
        let cancellation_token = CancellationToken::new();
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let render_loop = RenderLoop::new(
            Arc::clone(&surface),
            video.clone(),
            config.surface.refresh_hz,
        );

        let controller = Arc::new(CaptureController::new(
            config.capture.interval(),
            config.surface.jpeg_quality,
            Arc::clone(&surface),
            detector,
            Arc::clone(&session),
            Arc::clone(&event_bus),
        ));

        #[cfg(feature = "ui")]
        let ui_server = Arc::new(UiServer::new(
            config.ui.clone(),
            Arc::clone(&session),
            Arc::clone(&controller),
            Arc::clone(&surface),
            Arc::clone(&event_bus),
            config.surface.jpeg_quality,
            cancellation_token.clone(),
        ));

        let keyboard_handler = KeyboardInputHandler::new(Arc::clone(&event_bus));

        Ok(Self {
            config,
            event_bus,
            video,
            surface,
            session,
            render_loop,
            controller,
            camera: None,
            #[cfg(feature = "ui")]
            ui_server,
            ui_task: None,
            ui_addr: None,
            keyboard_handler,
            keyboard_enabled: false,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_sender))),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token,
        })
    }

    /// Enable or disable terminal keyboard controls
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn config(&self) -> &CatwatchConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    pub fn surface(&self) -> Arc<DrawingSurface> {
        Arc::clone(&self.surface)
    }

    pub fn controller(&self) -> Arc<CaptureController> {
        Arc::clone(&self.controller)
    }

    /// Address the web UI is listening on, once started
    pub fn ui_addr(&self) -> Option<SocketAddr> {
        self.ui_addr
    }

    /// Whether camera acquisition succeeded
    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }
}
