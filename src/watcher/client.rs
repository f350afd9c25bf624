use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::notification::Credentials;

/// Public Trello API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.trello.com";

/// Per-fetch timeout used when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A card as returned by the Trello lists endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Card {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,
}

/// Failure to fetch the cards of a list
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Trello rejected the key/token (HTTP 401)
    #[error("Unauthorized")]
    Unauthorized,

    #[error("API Error: {0}")]
    Status(StatusCode),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Unauthorized)
    }
}

/// Read-only Trello client for list contents
pub struct BoardClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl BoardClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - API root, normally [`DEFAULT_API_BASE_URL`]
    /// * `credentials` - API key and token sent with every request
    /// * `timeout` - Upper bound for a single fetch
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).context("Invalid Trello API URL")?;

        if base_url.cannot_be_a_base() {
            anyhow::bail!("Trello API URL cannot be used as a base: {}", base_url);
        }

        let client = Client::builder()
            .user_agent(format!("trello-watcher/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// URL of the cards endpoint for a list, without credentials
    pub fn cards_url(&self, list_id: &str) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["1", "lists", list_id, "cards"]);
        }
        url
    }

    /// Fetch every card currently in a list
    pub async fn list_cards(&self, list_id: &str) -> Result<Vec<Card>, FetchError> {
        let url = self.cards_url(list_id);
        tracing::debug!("Fetching cards from: {}", url);

        let response = self
            .client
            .get(url)
            .query(&[
                ("key", self.credentials.api_key.as_str()),
                ("token", self.credentials.token.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized),
            status if !status.is_success() => Err(FetchError::Status(status)),
            _ => {
                let body = response.bytes().await?;
                let cards: Vec<Card> = serde_json::from_slice(&body)?;
                tracing::debug!("List {} returned {} cards", list_id, cards.len());
                Ok(cards)
            }
        }
    }
}
