//! Dashboard router and middleware setup.

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Create the dashboard application with all routes and middleware.
pub fn create_app(state: AppState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        // Pages
        .route("/", get(handlers::index))
        .route("/stats", get(handlers::stats))
        // Sensors and host
        .route("/voltage", get(handlers::voltage))
        .route("/status", get(handlers::system_status))
        // Actuators
        .route("/toggle_ir", post(handlers::toggle_ir))
        .route("/set_ir_intensity", post(handlers::set_ir_intensity))
        .route("/toggle_stream", post(handlers::toggle_stream))
        .route("/shutdown", post(handlers::shutdown))
        // Passage log
        .route("/api/passages", get(handlers::api_passages))
        .route("/api/passage", get(handlers::api_passage_raw))
        .route("/api/health", get(handlers::health_check));

    if let Some(static_path) = &state.static_path {
        if static_path.exists() {
            info!("Serving static files from: {:?}", static_path);
            app = app.nest_service("/static", ServeDir::new(static_path));
        } else {
            warn!(
                "Static path {:?} does not exist, using built-in pages",
                static_path
            );
        }
    }

    let mut app = app.with_state(state);

    if enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
