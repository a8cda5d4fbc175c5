pub mod api;
pub mod config;
pub mod enrich;
pub mod error;
pub mod export;
pub mod spotify;

pub use api::{AppState, create_router, start_server};
pub use config::Config;
pub use enrich::{Aggregator, EnrichedTrack, EnrichmentReport, TrackSource};
pub use error::{AppError, Result};
pub use export::{FieldSetId, Selection, export_filename, preview, to_delimited_text};
pub use spotify::{AudioFeatures, PlaylistSnapshot, RetryPolicy, SpotifyClient, TokenCache, Track};
