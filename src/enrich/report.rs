use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::enrich::aggregator::{EnrichedTrack, EnrichmentOutcome};

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentReport {
    pub total_tracks: usize,
    pub enriched: usize,
    pub failed: usize,
    pub chunks: usize,
    pub success_rate: f64,
    pub failed_tracks: Vec<FailedTrack>,
    /// Enriched tracks keyed by track ID.
    #[serde(skip)]
    pub records: HashMap<String, EnrichedTrack>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub reason: String,
}

impl EnrichmentReport {
    pub fn new(total_tracks: usize) -> Self {
        Self {
            total_tracks,
            ..Default::default()
        }
    }

    pub fn record(&mut self, track_id: &str, outcome: EnrichmentOutcome) {
        match outcome {
            EnrichmentOutcome::Enriched(record) => {
                self.enriched += 1;
                self.records.insert(track_id.to_string(), record);
            }
            EnrichmentOutcome::Failed(failed) => {
                self.failed += 1;
                self.failed_tracks.push(failed);
            }
        }
    }

    pub fn calculate_success_rate(&mut self) {
        if self.total_tracks > 0 {
            self.success_rate = (self.enriched as f64 / self.total_tracks as f64) * 100.0;
        }
    }
}
