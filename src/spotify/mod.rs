pub mod client;
pub mod models;
pub mod retry;
pub mod token;

pub use client::SpotifyClient;
pub use models::{Album, Artist, AudioFeatures, PlaylistSnapshot, Track};
pub use retry::{RetryPolicy, fetch_with_retry};
pub use token::{Credential, TokenCache};
