//! Upstream catalog access.
//!
//! The catalog is an external GraphQL API listing, for one episode, the raw
//! (obfuscated) source descriptors. [`Catalog`] is the seam the resolver talks
//! to; [`GraphQlCatalog`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use anistream_core::config::UpstreamConfig;
use anistream_core::{Error, RawSourceDescriptor, Result, TranslationMode};

use crate::http::upstream_error;

const EPISODE_QUERY: &str = "query ($showId: String!, $translationType: VaildTranslationTypeEnumType!, $episodeString: String!) { episode(showId: $showId, translationType: $translationType, episodeString: $episodeString) { episodeString sourceUrls } }";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Source of raw episode descriptors.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// List the raw sources for one episode in the given mode.
    ///
    /// An episode the catalog does not know is [`Error::NotFound`].
    async fn episode_sources(
        &self,
        show_id: &str,
        episode: &str,
        mode: TranslationMode,
    ) -> Result<Vec<RawSourceDescriptor>>;
}

// ---------------------------------------------------------------------------
// GraphQL implementation
// ---------------------------------------------------------------------------

pub struct GraphQlCatalog {
    http: reqwest::Client,
    api_url: String,
    referer: String,
    timeout: Duration,
}

impl GraphQlCatalog {
    pub fn new(http: reqwest::Client, cfg: &UpstreamConfig) -> Self {
        Self {
            http,
            api_url: cfg.api_url.clone(),
            referer: cfg.referer.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<EpisodeData>,
}

#[derive(Debug, Deserialize)]
struct EpisodeData {
    episode: Option<EpisodeNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeNode {
    #[serde(default)]
    source_urls: Vec<SourceUrl>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceUrl {
    source_url: String,
    source_name: String,
    #[serde(default)]
    priority: f64,
}

#[async_trait]
impl Catalog for GraphQlCatalog {
    async fn episode_sources(
        &self,
        show_id: &str,
        episode: &str,
        mode: TranslationMode,
    ) -> Result<Vec<RawSourceDescriptor>> {
        let body = json!({
            "query": EPISODE_QUERY,
            "variables": {
                "showId": show_id,
                "translationType": mode.to_string(),
                "episodeString": episode,
            },
        });

        debug!(show_id, episode, %mode, "Catalog episode query");

        let resp = self
            .http
            .post(&self.api_url)
            .header(reqwest::header::REFERER, &self.referer)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| upstream_error(&self.api_url, e))?;

        if !resp.status().is_success() {
            return Err(Error::UpstreamStatus {
                status: resp.status().as_u16(),
                url: self.api_url.clone(),
            });
        }

        let parsed: GraphQlResponse = resp
            .json()
            .await
            .map_err(|e| Error::ManifestParse(format!("catalog response: {e}")))?;

        let node = parsed
            .data
            .and_then(|d| d.episode)
            .ok_or_else(|| Error::not_found("episode", format!("{show_id}/{episode}/{mode}")))?;

        Ok(node
            .source_urls
            .into_iter()
            .map(|s| RawSourceDescriptor::new(s.source_name, s.source_url, s.priority))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog(server: &MockServer) -> GraphQlCatalog {
        let cfg = UpstreamConfig {
            api_url: format!("{}/api", server.uri()),
            ..UpstreamConfig::default()
        };
        GraphQlCatalog::new(reqwest::Client::new(), &cfg)
    }

    #[tokio::test]
    async fn maps_source_urls_to_descriptors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("referer", "https://allmanga.to"))
            .and(body_partial_json(json!({
                "variables": {"showId": "abc", "translationType": "dub", "episodeString": "3"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"episode": {"episodeString": "3", "sourceUrls": [
                    {"sourceUrl": "--175948514e4c4f57", "sourceName": "Default", "priority": 7.7},
                    {"sourceUrl": "https://cdn.example/a.mp4", "sourceName": "Yt-mp4", "priority": 7.9}
                ]}}
            })))
            .mount(&server)
            .await;

        let sources = catalog(&server)
            .episode_sources("abc", "3", TranslationMode::Dub)
            .await
            .unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source_name, "Default");
        assert_eq!(sources[0].obfuscated_url, "--175948514e4c4f57");
        assert_eq!(sources[1].priority, 7.9);
    }

    #[tokio::test]
    async fn missing_episode_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"episode": null}})),
            )
            .mount(&server)
            .await;

        let err = catalog(&server)
            .episode_sources("abc", "99", TranslationMode::Sub)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn upstream_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = catalog(&server)
            .episode_sources("abc", "1", TranslationMode::Sub)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamStatus { status: 503, .. }));
    }
}
