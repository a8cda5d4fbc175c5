//! Inbound HTTP surface.
//!
//! Every Spotify-backed route sits behind a middleware that makes sure a
//! credential can be obtained before the handler runs.

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};

pub mod error_response;
pub mod routes;
pub mod state;


pub use state::AppState;

pub const AUTH_FAILURE_MESSAGE: &str = "Failed to authenticate with Spotify";

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/playlist/{id}", get(routes::get_playlist))
        .route("/api/playlist/{id}/csv", get(routes::export_playlist_csv))
        .route("/api/track/{id}", get(routes::get_track))
        .route("/api/audio-features/{id}", get(routes::get_audio_features))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        .route("/api/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match state.client.tokens().acquire().await {
        Ok(_) => next.run(request).await,
        Err(e) => {
            warn!("Token acquisition failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": AUTH_FAILURE_MESSAGE })),
            )
                .into_response()
        }
    }
}

/// Bind `config.bind_addr` and serve until the process is stopped.
pub async fn start_server(config: &Config) -> Result<()> {
    let state = AppState::from_config(config);
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| AppError::Config(format!("cannot bind {}: {}", config.bind_addr, e)))?;

    info!("Listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
