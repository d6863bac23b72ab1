use super::server::ServerState;
use super::view::{render_page, render_results};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Main page
pub async fn page_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let snapshot = state.session.snapshot();
    Html(render_page(&snapshot, state.surface.dimensions()))
}

/// Detection list and indicator fragment
pub async fn results_handler(State(state): State<ServerState>) -> impl IntoResponse {
    Html(render_results(&state.session.snapshot()))
}

/// JSON snapshot of the session
pub async fn state_handler(State(state): State<ServerState>) -> impl IntoResponse {
    Json(state.session.snapshot())
}

pub async fn start_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let changed = state.controller.start();
    Json(serde_json::json!({
        "capturing": state.controller.is_capturing(),
        "changed": changed,
    }))
}

pub async fn stop_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let changed = state.controller.stop();
    Json(serde_json::json!({
        "capturing": state.controller.is_capturing(),
        "changed": changed,
    }))
}

pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let health_info = serde_json::json!({
        "status": "healthy",
        "surface": {
            "frame_id": state.surface.frame_id(),
            "frames_drawn": state.surface.frames_drawn(),
        },
        "capture_state": state.session.capture_state(),
        "detections": state.session.detection_count(),
        "subscribers": state.event_bus.subscriber_count(),
    });

    (StatusCode::OK, Json(health_info))
}

/// MJPEG stream of the drawing surface
pub async fn surface_stream_handler(State(state): State<ServerState>) -> Response {
    info!("New surface stream client connected");

    let stream = async_stream::stream! {
        let mut frame_interval = interval(state.stream_interval);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut frames_streamed = 0u64;

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = frame_interval.tick() => {}
            }

            let jpeg = match state.surface.extract_jpeg(state.jpeg_quality).await {
                Ok(jpeg) => jpeg,
                Err(e) => {
                    error!("Failed to encode surface for streaming: {}", e);
                    continue;
                }
            };

            frames_streamed += 1;
            let part_header = format!(
                "--FRAME\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
                jpeg.len()
            );

            yield Ok::<_, axum::Error>(Bytes::from(part_header));
            yield Ok(Bytes::from(jpeg));
            yield Ok(Bytes::from_static(b"\r\n"));
        }

        debug!("Surface stream ended after {} frames", frames_streamed);
    };

    (
        [
            (
                header::CONTENT_TYPE,
                "multipart/x-mixed-replace; boundary=FRAME",
            ),
            (header::CACHE_CONTROL, "no-cache, private"),
            (header::PRAGMA, "no-cache"),
        ],
        axum::body::Body::from_stream(stream),
    )
        .into_response()
}
