use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::enrich::TrackSource;
use crate::error::{AppError, Result};
use crate::spotify::models::{AudioFeatures, PlaylistSnapshot, Track};
use crate::spotify::retry::{RetryPolicy, fetch_with_retry};
use crate::spotify::token::TokenCache;

#[derive(Debug, Deserialize)]
struct ApiPlaylist {
    id: String,
    name: String,
    description: Option<String>,
    tracks: ApiTrackPage,
}

#[derive(Debug, Deserialize)]
struct ApiTrackPage {
    #[serde(default)]
    items: Vec<ApiPlaylistItem>,
    next: Option<String>,
    #[serde(default)]
    total: usize,
}

#[derive(Debug, Deserialize)]
struct ApiPlaylistItem {
    track: Option<Track>,
}

// `total` is remote input; larger playlists grow the Vec as pages arrive.
const MAX_PREALLOCATED_TRACKS: usize = 10_000;

/// Credentialed reader for the playlist, track and audio-features endpoints.
pub struct SpotifyClient {
    http_client: Client,
    tokens: Arc<TokenCache>,
    api_url: String,
    retry: RetryPolicy,
}

impl SpotifyClient {
    pub fn new(
        http_client: Client,
        tokens: Arc<TokenCache>,
        api_url: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http_client,
            tokens,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Build a client and its token cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        let http_client = Client::new();
        let tokens = Arc::new(TokenCache::from_config(http_client.clone(), config));
        Self::new(http_client, tokens, &config.spotify_api_url, config.retry)
    }

    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    /// Parse a Spotify playlist URL and extract the playlist ID.
    /// Supports formats:
    /// - https://open.spotify.com/playlist/37i9dQZF1E8NC99vGqLsaH
    /// - https://open.spotify.com/intl-de/playlist/37i9dQZF1E8NC99vGqLsaH?si=...
    /// - spotify:playlist:37i9dQZF1E8NC99vGqLsaH
    /// - 37i9dQZF1E8NC99vGqLsaH
    pub fn parse_playlist_url(url_str: &str) -> Result<String> {
        let url_str = url_str.trim();

        if let Some(id) = url_str.strip_prefix("spotify:playlist:") {
            return non_empty_id(id, url_str);
        }

        if !url_str.contains(['/', ':']) {
            return non_empty_id(url_str, url_str);
        }

        let url = Url::parse(url_str)
            .map_err(|e| AppError::InvalidPlaylistUrl(format!("{}: {}", url_str, e)))?;

        let path_segments: Vec<&str> = url
            .path_segments()
            .ok_or_else(|| AppError::InvalidPlaylistUrl(url_str.to_string()))?
            .collect();

        // Expect .../playlist/{id}
        path_segments
            .iter()
            .position(|segment| *segment == "playlist")
            .and_then(|index| path_segments.get(index + 1))
            .ok_or_else(|| AppError::InvalidPlaylistUrl(url_str.to_string()))
            .and_then(|id| non_empty_id(id, url_str))
    }

    /// Fetch a playlist and every page of its tracks.
    pub async fn get_playlist(&self, playlist_id: &str) -> Result<PlaylistSnapshot> {
        let url = format!(
            "{}/playlists/{}",
            self.api_url,
            urlencoding::encode(playlist_id)
        );
        let playlist: ApiPlaylist = self
            .get_json(&url, "Failed to fetch playlist from Spotify")
            .await?;

        info!(
            "Fetching playlist: {} ({} tracks)",
            playlist.name, playlist.tracks.total
        );

        let total_tracks = playlist.tracks.total;
        let mut tracks = Vec::with_capacity(total_tracks.min(MAX_PREALLOCATED_TRACKS));
        let mut page = playlist.tracks;

        loop {
            collect_tracks(&mut tracks, page.items);

            let Some(next) = page.next else {
                break;
            };
            debug!("Fetching next playlist page: {}", next);
            page = self
                .get_json(&next, "Failed to fetch playlist from Spotify")
                .await?;
        }

        info!("Fetched {} tracks from playlist", tracks.len());

        Ok(PlaylistSnapshot {
            id: playlist.id,
            name: playlist.name,
            description: playlist.description.unwrap_or_default(),
            total_tracks,
            tracks,
        })
    }

    pub async fn get_track(&self, track_id: &str) -> Result<Track> {
        let url = format!("{}/tracks/{}", self.api_url, urlencoding::encode(track_id));
        self.get_json(&url, "Failed to fetch track from Spotify").await
    }

    pub async fn get_audio_features(&self, track_id: &str) -> Result<AudioFeatures> {
        let url = format!(
            "{}/audio-features/{}",
            self.api_url,
            urlencoding::encode(track_id)
        );
        self.get_json(&url, "Failed to fetch audio features from Spotify")
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, failure: &str) -> Result<T> {
        let credential = self.tokens.acquire().await?;

        let response = fetch_with_retry(&self.retry, || {
            self.http_client
                .get(url)
                .bearer_auth(&credential.token)
                .send()
        })
        .await
        .map_err(AppError::Network)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Spotify request to {} failed ({}): {}", url, status, error_text);
            return Err(AppError::Api {
                status: status.as_u16(),
                message: failure.to_string(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TrackSource for SpotifyClient {
    async fn track_detail(&self, track_id: &str) -> Result<Track> {
        self.get_track(track_id).await
    }

    async fn audio_features(&self, track_id: &str) -> Result<AudioFeatures> {
        self.get_audio_features(track_id).await
    }
}

fn collect_tracks(tracks: &mut Vec<Track>, items: Vec<ApiPlaylistItem>) {
    for item in items {
        match item.track {
            // Local files keep their slot even without an ID; enrichment skips them
            Some(track) => tracks.push(track),
            None => debug!("Skipping empty playlist slot"),
        }
    }
}

fn non_empty_id(id: &str, original: &str) -> Result<String> {
    let id = id.split(['?', '#']).next().unwrap_or_default().trim();
    if id.is_empty() {
        Err(AppError::InvalidPlaylistUrl(original.to_string()))
    } else {
        Ok(id.to_string())
    }
}
