use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};

/// Cached credentials are refreshed this long before they actually expire.
const EXPIRY_MARGIN_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Process-wide holder of the client-credentials bearer token.
///
/// The slot is locked for the whole refresh, so callers arriving while a
/// token is being issued wait for it instead of requesting their own.
pub struct TokenCache {
    http_client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<Credential>>,
}

impl TokenCache {
    pub fn new(
        http_client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached: Mutex::new(None),
        }
    }

    pub fn from_config(http_client: Client, config: &Config) -> Self {
        Self::new(
            http_client,
            &config.spotify_token_url,
            &config.spotify_client_id,
            &config.spotify_client_secret,
        )
    }

    /// Return the cached credential, issuing a new one if it is missing or stale.
    pub async fn acquire(&self) -> Result<Credential> {
        let mut cached = self.cached.lock().await;

        if let Some(credential) = cached.as_ref() {
            if credential.is_fresh_at(Utc::now()) {
                return Ok(credential.clone());
            }
            debug!("Cached Spotify token expired, refreshing");
        }

        let credential = self.request_token().await?;
        *cached = Some(credential.clone());

        Ok(credential)
    }

    /// Drop the cached credential so the next `acquire` issues a new one.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    async fn request_token(&self) -> Result<Credential> {
        let issued_at = Utc::now();

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Spotify token request failed ({}): {}", status, error_text);
            return Err(AppError::Auth(format!(
                "Token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse token response: {}", e)))?;

        let lifetime = TimeDelta::try_seconds(token.expires_in)
            .filter(|lifetime| *lifetime > TimeDelta::zero())
            .ok_or_else(|| {
                AppError::Auth(format!(
                    "Token response has unusable lifetime: {}",
                    token.expires_in
                ))
            })?;

        if token.access_token.is_empty() {
            return Err(AppError::Auth("Token response has an empty access token".into()));
        }

        info!("Issued Spotify access token valid for {}s", token.expires_in);

        Ok(Credential {
            token: token.access_token,
            expires_at: issued_at + lifetime,
        })
    }
}
