use crate::capture::CaptureController;
use crate::config::UiConfig;
use crate::error::{Result, UiError};
use crate::events::EventBus;
use crate::session::Session;
use crate::surface::DrawingSurface;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::handlers::{
    health_handler, page_handler, results_handler, start_handler, state_handler, stop_handler,
    surface_stream_handler,
};

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) session: Arc<Session>,
    pub(crate) controller: Arc<CaptureController>,
    pub(crate) surface: Arc<DrawingSurface>,
    pub(crate) event_bus: Arc<EventBus>,
    pub(crate) stream_interval: Duration,
    pub(crate) jpeg_quality: u8,
    pub(crate) shutdown: CancellationToken,
}

/// Local web UI: page, controls and the surface stream
pub struct UiServer {
    config: UiConfig,
    state: ServerState,
}

impl UiServer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: UiConfig,
        session: Arc<Session>,
        controller: Arc<CaptureController>,
        surface: Arc<DrawingSurface>,
        event_bus: Arc<EventBus>,
        jpeg_quality: u8,
        shutdown: CancellationToken,
    ) -> Self {
        let stream_interval = Duration::from_micros(1_000_000u64 / config.stream_fps.max(1) as u64);

        Self {
            config,
            state: ServerState {
                session,
                controller,
                surface,
                event_bus,
                stream_interval,
                jpeg_quality,
                shutdown,
            },
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.config.ip, self.config.port)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(page_handler))
            .route("/results", get(results_handler))
            .route("/surface.mjpg", get(surface_stream_handler))
            .route("/api/state", get(state_handler))
            .route("/api/capture/start", post(start_handler))
            .route("/api/capture/stop", post(stop_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
    }

    /// Bind the listener; failure here is a startup error
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| UiError::BindFailed {
                address: addr.clone(),
                source: e,
            })?;

        info!("UI listening on http://{}", local_addr(&listener).unwrap_or(addr));
        Ok(listener)
    }

    /// Serve until the shutdown token is cancelled
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let shutdown = self.state.shutdown.clone();

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| UiError::ServerFailed {
                details: format!("Server error: {}", e),
            })?;

        info!("UI server stopped");
        Ok(())
    }
}

fn local_addr(listener: &TcpListener) -> Option<String> {
    listener.local_addr().ok().map(|addr: SocketAddr| addr.to_string())
}
