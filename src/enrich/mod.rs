pub mod aggregator;
pub mod report;

pub use aggregator::{Aggregator, EnrichedTrack, EnrichmentOutcome, TrackSource};
pub use report::{EnrichmentReport, FailedTrack};
