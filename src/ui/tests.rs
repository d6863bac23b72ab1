use super::handlers::{
    health_handler, page_handler, results_handler, start_handler, state_handler, stop_handler,
};
use super::server::ServerState;
use crate::capture::CaptureController;
use crate::detection::{Detection, DetectionResponse, DetectionService};
use crate::error::DetectorError;
use crate::events::EventBus;
use crate::session::Session;
use crate::surface::DrawingSurface;
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct SilentDetector;

#[async_trait]
impl DetectionService for SilentDetector {
    async fn detect(&self, _jpeg: Vec<u8>) -> Result<DetectionResponse, DetectorError> {
        Ok(DetectionResponse::default())
    }
}

fn test_state() -> ServerState {
    let session = Arc::new(Session::new());
    let surface = Arc::new(DrawingSurface::new(32, 24));
    let event_bus = Arc::new(EventBus::new(16));
    let controller = Arc::new(CaptureController::new(
        Duration::from_secs(10),
        80,
        Arc::clone(&surface),
        Arc::new(SilentDetector),
        Arc::clone(&session),
        Arc::clone(&event_bus),
    ));

    ServerState {
        session,
        controller,
        surface,
        event_bus,
        stream_interval: Duration::from_millis(100),
        jpeg_quality: 80,
        shutdown: CancellationToken::new(),
    }
}

async fn body_text(response: impl IntoResponse) -> (StatusCode, String) {
    let response = response.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_page_renders_surface_and_controls() {
    let (status, html) = body_text(page_handler(State(test_state())).await).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("/surface.mjpg"));
    assert!(html.contains("width=\"32\" height=\"24\""));
    assert!(html.contains("data-color=\"black\""));
}

#[tokio::test]
async fn test_results_reflect_session() {
    let state = test_state();
    state.session.apply_response(DetectionResponse {
        detections: vec![Detection {
            name: "cat".to_string(),
            confidence: 0.87,
            xmin: 10.0,
            ymin: 20.0,
            xmax: 100.0,
            ymax: 200.0,
        }],
        cat_stay: Some("table".to_string()),
    });

    let (_, html) = body_text(results_handler(State(state)).await).await;
    assert!(html.contains("Object: cat"));
    assert!(html.contains("Confidence: 87.00%"));
    assert!(html.contains("data-color=\"green\""));
}

#[tokio::test]
async fn test_start_and_stop_controls() {
    let state = test_state();

    let (_, body) = body_text(start_handler(State(state.clone())).await).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["capturing"], true);
    assert_eq!(json["changed"], true);

    // Second press is a no-op
    let (_, body) = body_text(start_handler(State(state.clone())).await).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["capturing"], true);
    assert_eq!(json["changed"], false);

    let (_, body) = body_text(state_handler(State(state.clone())).await).await;
    assert!(body.contains("\"capture_state\":\"capturing\""));

    let (_, body) = body_text(stop_handler(State(state.clone())).await).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["capturing"], false);
    assert_eq!(json["changed"], true);

    let (_, body) = body_text(stop_handler(State(state)).await).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["changed"], false);
}

#[tokio::test]
async fn test_health_reports_status() {
    let (status, body) = body_text(health_handler(State(test_state())).await).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["capture_state"], "idle");
    assert_eq!(json["detections"], 0);
}
