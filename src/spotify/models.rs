use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Spotify sends `null` for several fields we would rather treat as empty.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artist {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Album {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub release_date: Option<String>,
    pub album_type: Option<String>,
    pub total_tracks: Option<u32>,
    /// Only present on full album objects, so only on enriched tracks.
    pub label: Option<String>,
}

/// A track as returned by the playlist and track endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub artists: Vec<Artist>,
    pub album: Album,
    pub duration_ms: u64,
    pub explicit: bool,
    pub popularity: Option<u32>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub external_ids: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub external_urls: BTreeMap<String, String>,
    pub preview_url: Option<String>,
    pub uri: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub available_markets: Vec<String>,
    pub restrictions: Option<serde_json::Value>,
}

impl Track {
    pub fn artist_names(&self) -> Vec<&str> {
        self.artists.iter().map(|a| a.name.as_str()).collect()
    }
}

/// Per-track audio descriptors from the audio-features endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFeatures {
    pub acousticness: Option<f64>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub key: Option<i32>,
    pub liveness: Option<f64>,
    pub loudness: Option<f64>,
    pub mode: Option<i32>,
    pub speechiness: Option<f64>,
    pub tempo: Option<f64>,
    pub time_signature: Option<i32>,
    pub valence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub total_tracks: usize,
    pub tracks: Vec<Track>,
}

#[cfg(test)]
impl Track {
    pub fn mock(id: &str, name: &str, artist: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            artists: vec![Artist {
                id: format!("{}_artist", id),
                name: artist.to_string(),
            }],
            album: Album {
                name: "Mock Album".to_string(),
                release_date: Some("2020-01-01".to_string()),
                album_type: Some("album".to_string()),
                total_tracks: Some(12),
                label: None,
            },
            duration_ms: 180000,
            explicit: false,
            popularity: Some(50),
            track_number: Some(1),
            disc_number: Some(1),
            external_ids: BTreeMap::from([("isrc".to_string(), "MOCK12345678".to_string())]),
            external_urls: BTreeMap::from([(
                "spotify".to_string(),
                format!("https://open.spotify.com/track/{}", id),
            )]),
            preview_url: None,
            uri: Some(format!("spotify:track:{}", id)),
            available_markets: vec!["US".to_string(), "DE".to_string()],
            restrictions: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_tolerates_nulls_and_missing_fields() {
        let json = r#"{
            "id": null,
            "name": "Local Song",
            "artists": [{"name": "Someone"}],
            "album": {"name": "Local Files"},
            "duration_ms": 1000,
            "external_ids": null,
            "available_markets": null,
            "preview_url": null
        }"#;

        let track: Track = serde_json::from_str(json).unwrap();
        assert!(track.id.is_empty());
        assert_eq!(track.artist_names(), vec!["Someone"]);
        assert!(track.external_ids.is_empty());
        assert!(track.available_markets.is_empty());
        assert_eq!(track.popularity, None);
        assert_eq!(track.album.label, None);
    }

    #[test]
    fn test_audio_features_partial_body() {
        let json = r#"{"danceability": 0.5, "key": -1, "type": "audio_features"}"#;
        let features: AudioFeatures = serde_json::from_str(json).unwrap();

        assert_eq!(features.danceability, Some(0.5));
        assert_eq!(features.key, Some(-1));
        assert_eq!(features.tempo, None);
    }
}
