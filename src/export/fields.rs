use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One exportable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Artists,
    Album,
    DurationMs,
    Popularity,
    TrackNumber,
    DiscNumber,
    Isrc,
    AlbumReleaseDate,
    AlbumType,
    AlbumTotalTracks,
    AlbumLabel,
    Danceability,
    Energy,
    Key,
    Tempo,
    TimeSignature,
    Acousticness,
    Instrumentalness,
    Liveness,
    Loudness,
    Speechiness,
    Valence,
    SpotifyUrl,
    PreviewUrl,
    Uri,
    ExternalIds,
    AvailableMarkets,
    Explicit,
    Restrictions,
}

impl Field {
    /// Column key used in the CSV header.
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Artists => "artists",
            Field::Album => "album",
            Field::DurationMs => "duration_ms",
            Field::Popularity => "popularity",
            Field::TrackNumber => "track_number",
            Field::DiscNumber => "disc_number",
            Field::Isrc => "isrc",
            Field::AlbumReleaseDate => "album_release_date",
            Field::AlbumType => "album_type",
            Field::AlbumTotalTracks => "album_total_tracks",
            Field::AlbumLabel => "album_label",
            Field::Danceability => "danceability",
            Field::Energy => "energy",
            Field::Key => "key",
            Field::Tempo => "tempo",
            Field::TimeSignature => "time_signature",
            Field::Acousticness => "acousticness",
            Field::Instrumentalness => "instrumentalness",
            Field::Liveness => "liveness",
            Field::Loudness => "loudness",
            Field::Speechiness => "speechiness",
            Field::Valence => "valence",
            Field::SpotifyUrl => "spotify_url",
            Field::PreviewUrl => "preview_url",
            Field::Uri => "uri",
            Field::ExternalIds => "external_ids",
            Field::AvailableMarkets => "available_markets",
            Field::Explicit => "explicit",
            Field::Restrictions => "restrictions",
        }
    }

    /// Human-readable column title for previews.
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Title",
            Field::Artists => "Artists",
            Field::Album => "Album",
            Field::DurationMs => "Duration",
            Field::Popularity => "Popularity",
            Field::TrackNumber => "Track Number",
            Field::DiscNumber => "Disc Number",
            Field::Isrc => "ISRC",
            Field::AlbumReleaseDate => "Release Date",
            Field::AlbumType => "Album Type",
            Field::AlbumTotalTracks => "Total Tracks",
            Field::AlbumLabel => "Label",
            Field::Danceability => "Danceability",
            Field::Energy => "Energy",
            Field::Key => "Key",
            Field::Tempo => "Tempo",
            Field::TimeSignature => "Time Signature",
            Field::Acousticness => "Acousticness",
            Field::Instrumentalness => "Instrumentalness",
            Field::Liveness => "Liveness",
            Field::Loudness => "Loudness",
            Field::Speechiness => "Speechiness",
            Field::Valence => "Valence",
            Field::SpotifyUrl => "Spotify URL",
            Field::PreviewUrl => "Preview URL",
            Field::Uri => "URI",
            Field::ExternalIds => "External IDs",
            Field::AvailableMarkets => "Available Markets",
            Field::Explicit => "Explicit",
            Field::Restrictions => "Restrictions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSetId {
    Basic,
    Details,
    Album,
    Audio,
    Analysis,
    Links,
    Markets,
}

impl FieldSetId {
    /// Catalog declaration order.
    pub const ALL: [FieldSetId; 7] = [
        FieldSetId::Basic,
        FieldSetId::Details,
        FieldSetId::Album,
        FieldSetId::Audio,
        FieldSetId::Analysis,
        FieldSetId::Links,
        FieldSetId::Markets,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FieldSetId::Basic => "basic",
            FieldSetId::Details => "details",
            FieldSetId::Album => "album",
            FieldSetId::Audio => "audio",
            FieldSetId::Analysis => "analysis",
            FieldSetId::Links => "links",
            FieldSetId::Markets => "markets",
        }
    }

    pub fn field_set(self) -> &'static FieldSet {
        &FIELD_SETS[self as usize]
    }
}

impl fmt::Display for FieldSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FieldSetId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        FieldSetId::ALL
            .into_iter()
            .find(|id| id.name() == wanted)
            .ok_or_else(|| AppError::InvalidSelection(format!("unknown field set '{}'", s.trim())))
    }
}

/// A named bundle of columns toggled together.
#[derive(Debug)]
pub struct FieldSet {
    pub id: FieldSetId,
    pub label: &'static str,
    pub description: &'static str,
    pub fields: &'static [Field],
    pub default_selected: bool,
}

pub static FIELD_SETS: [FieldSet; 7] = [
    FieldSet {
        id: FieldSetId::Basic,
        label: "Basic Info",
        description: "Track name, artist names, album name",
        fields: &[Field::Name, Field::Artists, Field::Album],
        default_selected: true,
    },
    FieldSet {
        id: FieldSetId::Details,
        label: "Track Details",
        description: "Duration, popularity, track number, disc number, ISRC",
        fields: &[
            Field::DurationMs,
            Field::Popularity,
            Field::TrackNumber,
            Field::DiscNumber,
            Field::Isrc,
        ],
        default_selected: false,
    },
    FieldSet {
        id: FieldSetId::Album,
        label: "Album Details",
        description: "Release date, album type, total tracks, label",
        fields: &[
            Field::AlbumReleaseDate,
            Field::AlbumType,
            Field::AlbumTotalTracks,
            Field::AlbumLabel,
        ],
        default_selected: false,
    },
    FieldSet {
        id: FieldSetId::Audio,
        label: "Audio Features",
        description: "Danceability, energy, key, tempo, time signature",
        fields: &[
            Field::Danceability,
            Field::Energy,
            Field::Key,
            Field::Tempo,
            Field::TimeSignature,
        ],
        default_selected: false,
    },
    FieldSet {
        id: FieldSetId::Analysis,
        label: "Audio Analysis",
        description: "Acousticness, instrumentalness, liveness, loudness, speechiness, valence",
        fields: &[
            Field::Acousticness,
            Field::Instrumentalness,
            Field::Liveness,
            Field::Loudness,
            Field::Speechiness,
            Field::Valence,
        ],
        default_selected: false,
    },
    FieldSet {
        id: FieldSetId::Links,
        label: "URLs & IDs",
        description: "Spotify URL, preview URL, URI, external IDs",
        fields: &[
            Field::SpotifyUrl,
            Field::PreviewUrl,
            Field::Uri,
            Field::ExternalIds,
        ],
        default_selected: false,
    },
    FieldSet {
        id: FieldSetId::Markets,
        label: "Availability",
        description: "Available markets, explicit content, restrictions",
        fields: &[Field::AvailableMarkets, Field::Explicit, Field::Restrictions],
        default_selected: false,
    },
];

/// Which field sets the user has switched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    selected: BTreeMap<FieldSetId, bool>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            selected: FIELD_SETS
                .iter()
                .map(|set| (set.id, set.default_selected))
                .collect(),
        }
    }
}

impl Selection {
    pub fn none() -> Self {
        Self {
            selected: FieldSetId::ALL.into_iter().map(|id| (id, false)).collect(),
        }
    }

    pub fn only(ids: &[FieldSetId]) -> Self {
        let mut selection = Self::none();
        for id in ids {
            selection.set(*id, true);
        }
        selection
    }

    /// Parse a comma-separated list of set names, e.g. `basic,audio`.
    pub fn parse(list: &str) -> Result<Self, AppError> {
        let ids = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(FieldSetId::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::only(&ids))
    }

    pub fn set(&mut self, id: FieldSetId, selected: bool) {
        self.selected.insert(id, selected);
    }

    pub fn toggle(&mut self, id: FieldSetId) {
        let current = self.is_selected(id);
        self.set(id, !current);
    }

    pub fn is_selected(&self, id: FieldSetId) -> bool {
        self.selected.get(&id).copied().unwrap_or(false)
    }

    /// Columns of every selected set, in catalog order.
    pub fn active_fields(&self) -> Vec<Field> {
        FIELD_SETS
            .iter()
            .filter(|set| self.is_selected(set.id))
            .flat_map(|set| set.fields.iter().copied())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active_fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_matches_ids() {
        for (index, id) in FieldSetId::ALL.into_iter().enumerate() {
            assert_eq!(FIELD_SETS[index].id, id);
            assert_eq!(id.field_set().id, id);
        }
    }

    #[test]
    fn test_default_selection_is_basic_only() {
        let selection = Selection::default();
        assert_eq!(
            selection.active_fields(),
            vec![Field::Name, Field::Artists, Field::Album]
        );
    }

    #[test]
    fn test_active_fields_follow_catalog_order() {
        // Selected out of order on purpose
        let selection = Selection::only(&[FieldSetId::Markets, FieldSetId::Basic, FieldSetId::Audio]);
        let keys: Vec<_> = selection.active_fields().into_iter().map(Field::key).collect();

        assert_eq!(
            keys,
            vec![
                "name",
                "artists",
                "album",
                "danceability",
                "energy",
                "key",
                "tempo",
                "time_signature",
                "available_markets",
                "explicit",
                "restrictions",
            ]
        );
    }

    #[test]
    fn test_empty_selection_has_no_fields() {
        let selection = Selection::none();
        assert!(selection.active_fields().is_empty());
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle_flips_selection() {
        let mut selection = Selection::default();
        selection.toggle(FieldSetId::Basic);
        selection.toggle(FieldSetId::Links);

        assert!(!selection.is_selected(FieldSetId::Basic));
        assert!(selection.is_selected(FieldSetId::Links));
        assert_eq!(selection.active_fields().len(), 4);
    }

    #[test]
    fn test_parse_selection_list() {
        let selection = Selection::parse(" Basic, analysis ,").unwrap();
        assert!(selection.is_selected(FieldSetId::Basic));
        assert!(selection.is_selected(FieldSetId::Analysis));
        assert!(!selection.is_selected(FieldSetId::Audio));

        assert!(matches!(
            Selection::parse("basic,lyrics"),
            Err(AppError::InvalidSelection(_))
        ));
        assert!(Selection::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_every_field_has_unique_key() {
        let mut keys: Vec<_> = FIELD_SETS
            .iter()
            .flat_map(|set| set.fields.iter().map(|f| f.key()))
            .collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();

        assert_eq!(total, 30);
        assert_eq!(keys.len(), total);
    }
}
