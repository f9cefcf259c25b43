//! Opening/ending skip-time lookups.
//!
//! Backed by the AniSkip v2 API. Requests are rate-limited with a token bucket
//! via [`governor`]; a 404 from the service is a normal "not found" answer,
//! not an error.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use anistream_core::config::SkipConfig;
use anistream_core::{Error, Result};

use crate::http::upstream_error;

const SKIP_TYPES: [&str; 5] = ["op", "ed", "mixed-op", "mixed-ed", "recap"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Skip intervals for one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipTimes {
    pub found: bool,
    #[serde(default)]
    pub results: Vec<SkipInterval>,
}

impl SkipTimes {
    pub fn not_found() -> Self {
        Self {
            found: false,
            results: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipInterval {
    pub interval: Interval,
    pub skip_type: String,
    #[serde(default)]
    pub skip_id: Option<String>,
    #[serde(default)]
    pub episode_length: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_time: f64,
    pub end_time: f64,
}

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SkipTimeService: Send + Sync {
    /// Look up skip intervals by MyAnimeList id and episode number.
    async fn skip_times(&self, mal_id: u64, episode: u32) -> Result<SkipTimes>;
}

// ---------------------------------------------------------------------------
// AniSkip client
// ---------------------------------------------------------------------------

pub struct AniSkipClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    limiter: DefaultDirectRateLimiter,
}

impl AniSkipClient {
    pub fn new(http: reqwest::Client, cfg: &SkipConfig) -> Self {
        let per_second = NonZeroU32::new(cfg.requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
        }
    }

    fn url(&self, mal_id: u64, episode: u32) -> String {
        let types: Vec<String> = SKIP_TYPES.iter().map(|t| format!("types[]={t}")).collect();
        format!(
            "{}/skip-times/{mal_id}/{episode}?{}&episodeLength=0",
            self.base_url,
            types.join("&")
        )
    }
}

#[async_trait]
impl SkipTimeService for AniSkipClient {
    async fn skip_times(&self, mal_id: u64, episode: u32) -> Result<SkipTimes> {
        self.limiter.until_ready().await;

        let url = self.url(mal_id, episode);
        debug!(mal_id, episode, "Skip-time lookup");

        let resp = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| upstream_error(&url, e))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(SkipTimes::not_found()),
            s if s.is_success() => resp
                .json::<SkipTimes>()
                .await
                .map_err(|e| Error::upstream(&url, format!("invalid skip-time response: {e}"))),
            s => Err(Error::upstream(&url, format!("skip-time service returned {s}"))),
        }
    }
}
