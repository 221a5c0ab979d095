//! HTTP handlers for the dashboard.

use super::pages::{DEFAULT_INDEX_HTML, DEFAULT_STATS_HTML};
use super::state::AppState;
use crate::error::BirdhouseError;
use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    Form,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

fn error_response(status: StatusCode, err: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

/// Serve `name` from the static directory, or `fallback` if it is absent.
async fn page(state: &AppState, name: &str, fallback: &'static str) -> Html<String> {
    if let Some(dir) = &state.static_path {
        let path = dir.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => return Html(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to read {}: {}", path.display(), e),
        }
    }
    Html(fallback.to_string())
}

/// Main dashboard page.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    page(&state, "index.html", DEFAULT_INDEX_HTML).await
}

/// Passage statistics page.
pub async fn stats(State(state): State<AppState>) -> Html<String> {
    page(&state, "stats.html", DEFAULT_STATS_HTML).await
}

/// Latest battery voltage.
pub async fn voltage(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.voltage.latest())
}

/// CPU temperature and five-minute load.
pub async fn system_status(State(state): State<AppState>) -> Response {
    match state.status.read().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => {
            error!("Failed to read host status: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// Switch the IR illuminator on (with auto-off) or off.
pub async fn toggle_ir(State(state): State<AppState>) -> Response {
    match state.illuminator.toggle().await {
        Ok(led_on) => Json(json!({ "led_on": led_on })).into_response(),
        Err(e) => {
            error!("Failed to toggle IR illuminator: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IntensityForm {
    pub intensity: f64,
}

/// Set the IR duty cycle from a form field `intensity` (0-100).
pub async fn set_ir_intensity(
    State(state): State<AppState>,
    form: Result<Form<IntensityForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match state.illuminator.set_intensity(form.intensity).await {
        Ok(intensity) => Json(json!({ "intensity": intensity })).into_response(),
        Err(e @ BirdhouseError::InvalidIntensity(_)) => error_response(StatusCode::BAD_REQUEST, e),
        Err(e) => {
            error!("Failed to set IR intensity: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// Start (with auto-stop) or stop the stream service.
pub async fn toggle_stream(State(state): State<AppState>) -> Response {
    match state.stream.toggle().await {
        Ok(video_running) => Json(json!({ "video_running": video_running })).into_response(),
        Err(e) => {
            error!("Failed to toggle stream: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// Every well-formed passage record; an unreadable log yields `[]`.
pub async fn api_passages(State(state): State<AppState>) -> impl IntoResponse {
    match state.passages.read_entries().await {
        Ok(entries) => Json(entries),
        Err(e) => {
            error!("Error reading {}: {}", state.passages.path().display(), e);
            Json(Vec::new())
        }
    }
}

/// The passage log as stored.
pub async fn api_passage_raw(State(state): State<AppState>) -> Response {
    match state.passages.read_raw().await {
        Ok(contents) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            contents,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Halt the host. The command runs after the response is sent.
pub async fn shutdown(State(state): State<AppState>) -> &'static str {
    let power = state.power.clone();
    tokio::spawn(async move {
        if let Err(e) = power.halt().await {
            error!("{}", e);
        }
    });
    "Raspberry Pi shutting down..."
}

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "pi-birdhouse",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
