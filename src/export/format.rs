//! Turns a track (plus its enrichment, when there is one) into display
//! strings, one formatter per column. Missing data always renders as an
//! empty string.

use std::collections::HashMap;

use crate::enrich::EnrichedTrack;
use crate::export::fields::Field;
use crate::spotify::{AudioFeatures, Track};

const PITCH_CLASSES: [&str; 12] = [
    "C", "C♯/D♭", "D", "D♯/E♭", "E", "F", "F♯/G♭", "G", "G♯/A♭", "A", "A♯/B♭", "B",
];

const LIST_SEPARATOR: &str = "; ";

/// A playlist track together with its enrichment record, if enrichment succeeded.
#[derive(Debug, Clone, Copy)]
pub struct TrackView<'a> {
    pub track: &'a Track,
    pub enriched: Option<&'a EnrichedTrack>,
}

impl<'a> TrackView<'a> {
    pub fn new(track: &'a Track, records: &'a HashMap<String, EnrichedTrack>) -> Self {
        Self {
            track,
            enriched: records.get(&track.id),
        }
    }

    fn features(&self) -> Option<&'a AudioFeatures> {
        self.enriched.map(|record| &record.features)
    }
}

pub type Formatter = fn(&TrackView<'_>) -> String;

impl Field {
    pub fn formatter(self) -> Formatter {
        match self {
            Field::Name => name,
            Field::Artists => artists,
            Field::Album => album,
            Field::DurationMs => duration,
            Field::Popularity => popularity,
            Field::TrackNumber => track_number,
            Field::DiscNumber => disc_number,
            Field::Isrc => isrc,
            Field::AlbumReleaseDate => album_release_date,
            Field::AlbumType => album_type,
            Field::AlbumTotalTracks => album_total_tracks,
            Field::AlbumLabel => album_label,
            Field::Danceability => danceability,
            Field::Energy => energy,
            Field::Key => key,
            Field::Tempo => tempo,
            Field::TimeSignature => time_signature,
            Field::Acousticness => acousticness,
            Field::Instrumentalness => instrumentalness,
            Field::Liveness => liveness,
            Field::Loudness => loudness,
            Field::Speechiness => speechiness,
            Field::Valence => valence,
            Field::SpotifyUrl => spotify_url,
            Field::PreviewUrl => preview_url,
            Field::Uri => uri,
            Field::ExternalIds => external_ids,
            Field::AvailableMarkets => available_markets,
            Field::Explicit => explicit,
            Field::Restrictions => restrictions,
        }
    }
}

pub fn value_of(view: &TrackView<'_>, field: Field) -> String {
    (field.formatter())(view)
}

fn number<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn decimals(value: Option<f64>, places: usize) -> String {
    value
        .filter(|v| v.is_finite())
        .map(|v| format!("{:.*}", places, v))
        .unwrap_or_default()
}

fn feature(view: &TrackView<'_>, pick: fn(&AudioFeatures) -> Option<f64>, places: usize) -> String {
    decimals(view.features().and_then(pick), places)
}

fn name(view: &TrackView<'_>) -> String {
    view.track.name.clone()
}

fn artists(view: &TrackView<'_>) -> String {
    view.track.artist_names().join(LIST_SEPARATOR)
}

fn album(view: &TrackView<'_>) -> String {
    view.track.album.name.clone()
}

fn duration(view: &TrackView<'_>) -> String {
    format!("{}s", (view.track.duration_ms + 500) / 1000)
}

fn popularity(view: &TrackView<'_>) -> String {
    number(view.track.popularity)
}

fn track_number(view: &TrackView<'_>) -> String {
    number(view.track.track_number)
}

fn disc_number(view: &TrackView<'_>) -> String {
    number(view.track.disc_number)
}

fn isrc(view: &TrackView<'_>) -> String {
    view.track.external_ids.get("isrc").cloned().unwrap_or_default()
}

fn album_release_date(view: &TrackView<'_>) -> String {
    view.track.album.release_date.clone().unwrap_or_default()
}

fn album_type(view: &TrackView<'_>) -> String {
    view.track.album.album_type.clone().unwrap_or_default()
}

fn album_total_tracks(view: &TrackView<'_>) -> String {
    number(view.track.album.total_tracks)
}

// Only the full track object carries the label
fn album_label(view: &TrackView<'_>) -> String {
    view.enriched
        .and_then(|record| record.detail.album.label.clone())
        .unwrap_or_default()
}

fn danceability(view: &TrackView<'_>) -> String {
    feature(view, |f| f.danceability, 2)
}

fn energy(view: &TrackView<'_>) -> String {
    feature(view, |f| f.energy, 2)
}

fn key(view: &TrackView<'_>) -> String {
    view.features()
        .and_then(|f| f.key)
        .and_then(|k| usize::try_from(k).ok())
        .and_then(|k| PITCH_CLASSES.get(k))
        .map(|pitch| pitch.to_string())
        .unwrap_or_default()
}

fn tempo(view: &TrackView<'_>) -> String {
    feature(view, |f| f.tempo, 0)
}

fn time_signature(view: &TrackView<'_>) -> String {
    view.features()
        .and_then(|f| f.time_signature)
        .filter(|beats| *beats > 0)
        .map(|beats| format!("{}/4", beats))
        .unwrap_or_default()
}

fn acousticness(view: &TrackView<'_>) -> String {
    feature(view, |f| f.acousticness, 2)
}

fn instrumentalness(view: &TrackView<'_>) -> String {
    feature(view, |f| f.instrumentalness, 2)
}

fn liveness(view: &TrackView<'_>) -> String {
    feature(view, |f| f.liveness, 2)
}

fn loudness(view: &TrackView<'_>) -> String {
    let db = feature(view, |f| f.loudness, 1);
    if db.is_empty() { db } else { format!("{} dB", db) }
}

fn speechiness(view: &TrackView<'_>) -> String {
    feature(view, |f| f.speechiness, 2)
}

fn valence(view: &TrackView<'_>) -> String {
    feature(view, |f| f.valence, 2)
}

fn spotify_url(view: &TrackView<'_>) -> String {
    view.track
        .external_urls
        .get("spotify")
        .cloned()
        .unwrap_or_default()
}

fn preview_url(view: &TrackView<'_>) -> String {
    view.track.preview_url.clone().unwrap_or_default()
}

fn uri(view: &TrackView<'_>) -> String {
    view.track.uri.clone().unwrap_or_default()
}

fn external_ids(view: &TrackView<'_>) -> String {
    view.track
        .external_ids
        .iter()
        .map(|(kind, id)| format!("{}:{}", kind, id))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

fn available_markets(view: &TrackView<'_>) -> String {
    view.track.available_markets.join(LIST_SEPARATOR)
}

fn explicit(view: &TrackView<'_>) -> String {
    let answer = if view.track.explicit { "Yes" } else { "No" };
    answer.to_string()
}

fn restrictions(view: &TrackView<'_>) -> String {
    view.track
        .restrictions
        .as_ref()
        .and_then(|value| serde_json::to_string(value).ok())
        .unwrap_or_default()
}
