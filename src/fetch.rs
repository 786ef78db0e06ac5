//! Fetch-more-stories endpoint access.
//!
//! When the configured end-of-deck behavior is `fetch`, the orchestrator
//! asks a [`StoryFetcher`] for more entries whenever the remaining story
//! count drops to the threshold.  The default implementation is a plain
//! HTTP GET expecting a JSON array of story entries.

use async_trait::async_trait;
use thiserror::Error;

use crate::player::story::StoryEntry;

/// Placeholder in the endpoint template replaced by the current story
/// count.
pub const OFFSET_PLACEHOLDER: &str = "${offset}";

/// Substitute the current story count into the endpoint template.
pub fn expand_endpoint(template: &str, offset: usize) -> String {
    template.replace(OFFSET_PLACEHOLDER, &offset.to_string())
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait StoryFetcher: Send + Sync {
    async fn fetch(&self, endpoint: &str) -> Result<Vec<StoryEntry>, FetchError>;
}

/// Default HTTP fetcher.
pub struct HttpStoryFetcher {
    client: reqwest::Client,
}

impl HttpStoryFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpStoryFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoryFetcher for HttpStoryFetcher {
    async fn fetch(&self, endpoint: &str) -> Result<Vec<StoryEntry>, FetchError> {
        let response = self
            .client
            .get(endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| FetchError::Http(err.to_string()))?;
        response
            .json::<Vec<StoryEntry>>()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_substitution() {
        assert_eq!(
            expand_endpoint("https://feed.example/stories?from=${offset}", 7),
            "https://feed.example/stories?from=7"
        );
        // Templates without the placeholder pass through unchanged.
        assert_eq!(
            expand_endpoint("https://feed.example/stories", 7),
            "https://feed.example/stories"
        );
    }
}
