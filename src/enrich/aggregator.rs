use async_trait::async_trait;
use futures::future::join_all;
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::enrich::report::{EnrichmentReport, FailedTrack};
use crate::error::Result;
use crate::spotify::{AudioFeatures, Track};

/// Where the two per-track sub-resources come from.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Full track object, including the album label.
    async fn track_detail(&self, track_id: &str) -> Result<Track>;

    async fn audio_features(&self, track_id: &str) -> Result<AudioFeatures>;
}

/// A track's detail merged with its audio features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTrack {
    pub detail: Track,
    pub features: AudioFeatures,
}

impl EnrichedTrack {
    pub fn merge(detail: Track, features: AudioFeatures) -> Self {
        Self { detail, features }
    }
}

#[derive(Debug, Clone)]
pub enum EnrichmentOutcome {
    Enriched(EnrichedTrack),
    Failed(FailedTrack),
}

/// Enriches playlist tracks chunk by chunk.
///
/// Each chunk holds at most `concurrency_limit` tracks whose sub-fetches run
/// together; the next chunk starts only once every track in the current one
/// has settled. A failed track is reported and left out of the records.
pub struct Aggregator<'a, S: TrackSource + ?Sized> {
    source: &'a S,
    concurrency_limit: usize,
    progress: Option<ProgressBar>,
}

impl<'a, S: TrackSource + ?Sized> Aggregator<'a, S> {
    pub fn new(source: &'a S, concurrency_limit: usize) -> Self {
        Self {
            source,
            concurrency_limit: concurrency_limit.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn enrich(&self, tracks: &[Track]) -> EnrichmentReport {
        let mut report = EnrichmentReport::new(tracks.len());

        info!(
            "Enriching {} tracks ({} at a time)",
            tracks.len(),
            self.concurrency_limit
        );

        for chunk in tracks.chunks(self.concurrency_limit) {
            report.chunks += 1;
            debug!("Enriching chunk {} ({} tracks)", report.chunks, chunk.len());

            let outcomes = join_all(chunk.iter().map(|track| self.enrich_track(track))).await;

            for (track, outcome) in chunk.iter().zip(outcomes) {
                report.record(&track.id, outcome);
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                }
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
        report.calculate_success_rate();

        info!(
            "Enrichment completed: {}/{} tracks enriched in {} chunks ({:.1}% success rate)",
            report.enriched, report.total_tracks, report.chunks, report.success_rate
        );

        report
    }

    async fn enrich_track(&self, track: &Track) -> EnrichmentOutcome {
        if track.id.is_empty() {
            debug!("Not enriching track without ID: {}", track.name);
            return EnrichmentOutcome::Failed(failed_track(track, NO_ID_REASON.to_string()));
        }

        let (detail, features) = tokio::join!(
            self.source.track_detail(&track.id),
            self.source.audio_features(&track.id)
        );

        match (detail, features) {
            (Ok(detail), Ok(features)) => {
                EnrichmentOutcome::Enriched(EnrichedTrack::merge(detail, features))
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to enrich track {} ({}): {}", track.name, track.id, e);
                EnrichmentOutcome::Failed(failed_track(track, e.user_message()))
            }
        }
    }
}

const NO_ID_REASON: &str = "Track has no Spotify ID (local file)";

fn failed_track(track: &Track, reason: String) -> FailedTrack {
    FailedTrack {
        id: track.id.clone(),
        name: track.name.clone(),
        artist: track.artist_names().join(", "),
        reason,
    }
}
