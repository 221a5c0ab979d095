//! HTTP handlers for the stream service.

use super::FrameReceiver;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tower_http::{services::ServeFile, trace::TraceLayer};
use tracing::{error, info};

/// Multipart boundary separating frames in `/stream.mjpg`.
pub const BOUNDARY: &str = "FRAME";

#[derive(Clone)]
pub struct StreamState {
    pub frames: FrameReceiver,
    pub images_dir: PathBuf,
}

pub fn create_stream_app(state: StreamState, static_path: &Path) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/stream.mjpg", get(mjpeg))
        .route("/capture", get(capture))
        .route_service("/static/logo.png", ServeFile::new(static_path.join("logo.png")))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>PiBirdHouse Stream</title>
  <link rel="icon" type="image/png" href="/static/logo.png">
  <style>
    body { margin:0; background:#f4f4f4; font-family:sans-serif; text-align:center; }
    h1 { background:#1b8335; color:white; padding:10px; }
    img { width:90%; max-width:640px; }
    button { background:#1b8335; color:white; border:none; padding:10px 20px;
             font-size:1em; border-radius:5px; cursor:pointer; margin:10px; }
    button:hover { background:#14682a; }
  </style>
</head>
<body>
  <h1>PiBirdHouse Live Stream</h1>
  <img src="/stream.mjpg">
  <br>
  <button onclick="capture()">Capture Image</button>
  <script>
    function capture() {
      fetch('/capture').then(res => alert(res.ok ? 'Image captured!' : 'Capture failed.'));
    }
  </script>
</body>
</html>"#;

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// One multipart part holding `frame`.
pub fn multipart_part(frame: &[u8]) -> Bytes {
    let header = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY,
        frame.len()
    );
    let mut part = Vec::with_capacity(header.len() + frame.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(frame);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

/// Endless `multipart/x-mixed-replace` response, one part per new frame.
async fn mjpeg(State(state): State<StreamState>) -> Response {
    let parts = WatchStream::new(state.frames)
        .filter_map(|frame| frame)
        .map(|frame| Ok::<_, Infallible>(multipart_part(&frame)));

    (
        [
            (
                header::CONTENT_TYPE,
                format!("multipart/x-mixed-replace; boundary={}", BOUNDARY),
            ),
            (header::CACHE_CONTROL, "no-cache, private".to_string()),
            (header::PRAGMA, "no-cache".to_string()),
        ],
        Body::from_stream(parts),
    )
        .into_response()
}

/// Save the current frame as `<images_dir>/%Y%m%d_%H%M%S.jpg`.
async fn capture(State(state): State<StreamState>) -> Response {
    let current = state.frames.borrow().clone();
    let Some(frame) = current else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "No frame").into_response();
    };

    let filename = chrono::Local::now().format("%Y%m%d_%H%M%S.jpg").to_string();
    let path = state.images_dir.join(&filename);
    let written = match tokio::fs::create_dir_all(&state.images_dir).await {
        Ok(()) => tokio::fs::write(&path, &frame).await,
        Err(e) => Err(e),
    };

    match written {
        Ok(()) => {
            info!("Image captured: {}", filename);
            "OK".into_response()
        }
        Err(e) => {
            error!("Failed to save {}: {}", path.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
