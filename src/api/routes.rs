//! Route handlers. Each proxies one upstream read, or composes the export.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::api::state::AppState;
use crate::enrich::Aggregator;
use crate::error::{AppError, Result};
use crate::export::{CONTENT_TYPE, Selection, export_filename, to_delimited_text};
use crate::spotify::{AudioFeatures, PlaylistSnapshot, Track};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PlaylistSnapshot>> {
    Ok(Json(state.client.get_playlist(&id).await?))
}

pub async fn get_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Track>> {
    Ok(Json(state.client.get_track(&id).await?))
}

pub async fn get_audio_features(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AudioFeatures>> {
    Ok(Json(state.client.get_audio_features(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Comma-separated field set names; the default selection when absent.
    pub sets: Option<String>,
}

pub async fn export_playlist_csv(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let selection = match query.sets.as_deref() {
        Some(list) => Selection::parse(list)?,
        None => Selection::default(),
    };
    if selection.is_empty() {
        return Err(AppError::InvalidSelection("no field sets selected".into()));
    }

    let playlist = state.client.get_playlist(&id).await?;
    let report = Aggregator::new(state.client.as_ref(), state.enrich_concurrency)
        .enrich(&playlist.tracks)
        .await;

    let body = to_delimited_text(&playlist.tracks, &report.records, &selection)
        .ok_or_else(|| AppError::InvalidSelection("no field sets selected".into()))?;

    info!(
        "Exported playlist '{}' ({} tracks, {} enriched)",
        playlist.name, report.total_tracks, report.enriched
    );

    let filename = export_filename(&playlist.name).replace('"', "'");
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        [
            (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
