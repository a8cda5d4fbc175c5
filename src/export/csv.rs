//! Delimited-text export.
//!
//! Escaping is minimal: a cell containing the delimiter is
//! wrapped in double quotes, and nothing else is touched. Embedded quotes and
//! newlines pass through as-is.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::enrich::EnrichedTrack;
use crate::export::fields::{Field, Selection};
use crate::export::format::{TrackView, value_of};
use crate::spotify::Track;

pub const DELIMITER: char = ',';
pub const CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

pub fn escape_cell(value: &str) -> Cow<'_, str> {
    if value.contains(DELIMITER) {
        Cow::Owned(format!("\"{}\"", value))
    } else {
        Cow::Borrowed(value)
    }
}

/// Render the export for `tracks` in playlist order.
///
/// Returns `None` when the selection has no active fields, since there is
/// nothing to export.
pub fn to_delimited_text(
    tracks: &[Track],
    records: &HashMap<String, EnrichedTrack>,
    selection: &Selection,
) -> Option<String> {
    let fields = selection.active_fields();
    if fields.is_empty() {
        return None;
    }

    let delimiter = DELIMITER.to_string();
    let header = fields
        .iter()
        .map(|field| field.key())
        .collect::<Vec<_>>()
        .join(&delimiter);

    let rows = tracks.iter().map(|track| {
        let view = TrackView::new(track, records);
        fields
            .iter()
            .map(|field| escape_cell(&value_of(&view, *field)).into_owned())
            .collect::<Vec<_>>()
            .join(&delimiter)
    });

    Some(
        std::iter::once(header)
            .chain(rows)
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// File name offered for a playlist's export.
pub fn export_filename(playlist_name: &str) -> String {
    let safe_name: String = playlist_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}_playlist.csv", safe_name)
}

/// The first rows of an export, with human column titles.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn preview(
    tracks: &[Track],
    records: &HashMap<String, EnrichedTrack>,
    selection: &Selection,
    limit: usize,
) -> Option<Preview> {
    let fields = selection.active_fields();
    if fields.is_empty() {
        return None;
    }

    let headers = std::iter::once("#".to_string())
        .chain(fields.iter().map(|field| field.label().to_string()))
        .collect();

    let rows = tracks
        .iter()
        .take(limit)
        .enumerate()
        .map(|(index, track)| {
            let view = TrackView::new(track, records);
            std::iter::once((index + 1).to_string())
                .chain(fields.iter().map(|field: &Field| value_of(&view, *field)))
                .collect::<Vec<String>>()
        })
        .collect();

    Some(Preview { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fields::FieldSetId;
    use crate::spotify::{Artist, AudioFeatures};

    fn two_track_playlist() -> (Vec<Track>, HashMap<String, EnrichedTrack>) {
        let a = Track::mock("a", "Bohemian Rhapsody", "Queen");
        let mut b = Track::mock("b", "Under Pressure", "Queen");
        b.artists.push(Artist {
            id: "bowie".into(),
            name: "David Bowie".into(),
        });
        b.album.name = "Hot Space".into();

        let mut detail = a.clone();
        detail.album.label = Some("EMI".into());
        let records = HashMap::from([(
            "a".to_string(),
            EnrichedTrack::merge(
                detail,
                AudioFeatures {
                    danceability: Some(0.41),
                    key: Some(10),
                    ..Default::default()
                },
            ),
        )]);

        (vec![a, b], records)
    }

    /// Split a line on commas that are not inside quotes.
    fn split_top_level(line: &str) -> Vec<String> {
        let mut cells = Vec::new();
        let mut current = String::new();
        let mut quoted = false;
        for c in line.chars() {
            match c {
                '"' => quoted = !quoted,
                ',' if !quoted => cells.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        cells.push(current);
        cells
    }

    #[test]
    fn test_basic_selection_with_partial_enrichment() {
        let (tracks, records) = two_track_playlist();
        let selection = Selection::only(&[FieldSetId::Basic]);

        let text = to_delimited_text(&tracks, &records, &selection).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "name,artists,album");
        assert_eq!(lines[1], "Bohemian Rhapsody,Queen,Mock Album");
        assert_eq!(lines[2], "Under Pressure,Queen; David Bowie,Hot Space");
    }

    #[test]
    fn test_enrichment_columns_blank_for_failed_track() {
        let (tracks, records) = two_track_playlist();
        let selection = Selection::only(&[FieldSetId::Audio]);

        let text = to_delimited_text(&tracks, &records, &selection).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "danceability,energy,key,tempo,time_signature");
        assert_eq!(lines[1], "0.41,,A♯/B♭,,");
        assert_eq!(lines[2], ",,,,");
    }

    #[test]
    fn test_local_file_keeps_its_row() {
        let streamed = Track::mock("s1", "Streamed", "X");
        let mut local = Track::mock("", "My Local Demo", "Me");
        local.album.name = "Demos".into();
        let selection = Selection::only(&[FieldSetId::Basic, FieldSetId::Audio]);

        let text = to_delimited_text(&[streamed, local], &HashMap::new(), &selection).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "My Local Demo,Me,Demos,,,,,");
    }

    #[test]
    fn test_empty_selection_exports_nothing() {
        let (tracks, records) = two_track_playlist();
        assert_eq!(to_delimited_text(&tracks, &records, &Selection::none()), None);
        assert_eq!(preview(&tracks, &records, &Selection::none(), 10), None);
    }

    #[test]
    fn test_empty_playlist_exports_header_only() {
        let text = to_delimited_text(&[], &HashMap::new(), &Selection::default()).unwrap();
        assert_eq!(text, "name,artists,album");
    }

    #[test]
    fn test_output_is_idempotent() {
        let (tracks, records) = two_track_playlist();
        let mut selection = Selection::none();
        for id in FieldSetId::ALL {
            selection.set(id, true);
        }

        let first = to_delimited_text(&tracks, &records, &selection).unwrap();
        let second = to_delimited_text(&tracks, &records, &selection).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_comma_cell_round_trips() {
        let mut track = Track::mock("c", "Hello, Goodbye", "The Beatles");
        track.album.name = "Magical Mystery Tour".into();
        let selection = Selection::only(&[FieldSetId::Basic]);

        let text = to_delimited_text(&[track], &HashMap::new(), &selection).unwrap();
        let row = text.lines().nth(1).unwrap();

        assert_eq!(row, "\"Hello, Goodbye\",The Beatles,Magical Mystery Tour");
        assert_eq!(
            split_top_level(row),
            vec!["Hello, Goodbye", "The Beatles", "Magical Mystery Tour"]
        );
    }

    #[test]
    fn test_escape_leaves_quotes_alone() {
        assert_eq!(escape_cell("plain"), "plain");
        assert_eq!(escape_cell("say \"hi\""), "say \"hi\"");
        assert_eq!(escape_cell("a,b"), "\"a,b\"");
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(export_filename("Road Trip"), "Road Trip_playlist.csv");
        assert_eq!(export_filename("AC/DC Hits"), "AC_DC Hits_playlist.csv");
    }

    #[test]
    fn test_preview_uses_labels_and_limit() {
        let (tracks, records) = two_track_playlist();
        let selection = Selection::only(&[FieldSetId::Basic, FieldSetId::Album]);

        let preview = preview(&tracks, &records, &selection, 1).unwrap();

        assert_eq!(
            preview.headers,
            vec!["#", "Title", "Artists", "Album", "Release Date", "Album Type", "Total Tracks", "Label"]
        );
        assert_eq!(preview.rows.len(), 1);
        assert_eq!(preview.rows[0][0], "1");
        assert_eq!(preview.rows[0][7], "EMI");
    }
}
