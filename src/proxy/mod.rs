//! Streaming reverse proxy for upstream media, manifests, subtitles and
//! images.
//!
//! The browser never talks to a CDN directly: every fetch is made here with
//! the Referer and User-Agent the CDN expects.

pub mod manifest;
pub mod relay;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use anistream_core::config::{ProxyConfig, UpstreamConfig};
use anistream_core::{Error, Result};

use crate::http::{fetch_bytes, fetch_document, fetch_text, is_http_url, until_cancelled, upstream_error};
use crate::resolver::classify::is_manifest_url;
pub use manifest::{proxy_path, rewrite_manifest, ManifestRewriteContext};

pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
pub const SUBTITLE_CONTENT_TYPE: &str = "text/vtt; charset=utf-8";

pub struct ProxyGateway {
    http: reqwest::Client,
    user_agent: String,
    default_referer: String,
    manifest_timeout: Duration,
    stream_timeout: Duration,
    asset_timeout: Duration,
    max_image_bytes: usize,
}

impl ProxyGateway {
    pub fn new(http: reqwest::Client, upstream: &UpstreamConfig, proxy: &ProxyConfig) -> Self {
        Self {
            http,
            user_agent: upstream.user_agent.clone(),
            default_referer: upstream.referer.clone(),
            manifest_timeout: Duration::from_secs(proxy.manifest_timeout_secs),
            stream_timeout: Duration::from_secs(proxy.stream_timeout_secs),
            asset_timeout: Duration::from_secs(proxy.asset_timeout_secs),
            max_image_bytes: proxy.max_image_bytes,
        }
    }

    pub fn default_referer(&self) -> &str {
        &self.default_referer
    }

    pub fn asset_timeout(&self) -> Duration {
        self.asset_timeout
    }

    /// Proxy `url`, rewriting it when it is a manifest and streaming it
    /// otherwise.
    pub async fn proxy(
        &self,
        url: &str,
        referer: Option<&str>,
        range: Option<&HeaderValue>,
        cancel: CancellationToken,
    ) -> Result<Response> {
        if !is_http_url(url) {
            return Err(Error::Validation(format!("url must be absolute http(s), got '{url}'")));
        }
        let referer = referer
            .filter(|r| !r.is_empty())
            .unwrap_or(self.default_referer.as_str());

        if is_manifest_url(url) {
            self.manifest(url, referer, &cancel).await
        } else {
            self.stream(url, referer, range, cancel).await
        }
    }

    /// Fetch a manifest and return it with every reference proxied.
    ///
    /// Relative references resolve against the URL the manifest was finally
    /// served from, so redirects are followed correctly.
    pub async fn manifest(
        &self,
        url: &str,
        referer: &str,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let doc = fetch_document(&self.http, url, Some(referer), self.manifest_timeout, cancel).await?;
        let rewritten = rewrite_manifest(&doc.body, &ManifestRewriteContext::new(&doc.url, referer));
        debug!(url = %url, base = %doc.url, bytes = rewritten.len(), "Manifest rewritten");

        Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, MANIFEST_CONTENT_TYPE),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            rewritten,
        )
            .into_response())
    }

    /// Stream `url` through, forwarding `range` and mirroring status and
    /// headers.
    ///
    /// The wait for response headers is bounded; the body itself is not.
    pub async fn stream(
        &self,
        url: &str,
        referer: &str,
        range: Option<&HeaderValue>,
        cancel: CancellationToken,
    ) -> Result<Response> {
        let mut req = self
            .http
            .get(url)
            .header(header::USER_AGENT, self.user_agent.as_str())
            .header(header::REFERER, referer);
        if let Some(range) = range {
            req = req.header(header::RANGE, range.clone());
        }

        let upstream = until_cancelled(&cancel, async {
            match tokio::time::timeout(self.stream_timeout, req.send()).await {
                Ok(res) => res.map_err(|e| upstream_error(url, e)),
                Err(_) => Err(Error::UpstreamTimeout { url: url.to_string() }),
            }
        })
        .await?;

        debug!(url = %url, status = %upstream.status(), range = ?range, "Relaying upstream");
        Ok(relay::relay_response(upstream, cancel))
    }

    /// Fetch a subtitle file as text.
    pub async fn subtitle(&self, url: &str, cancel: &CancellationToken) -> Result<Response> {
        if !is_http_url(url) {
            return Err(Error::Validation(format!("url must be absolute http(s), got '{url}'")));
        }
        let body = fetch_text(
            &self.http,
            url,
            Some(&self.default_referer),
            self.asset_timeout,
            cancel,
        )
        .await?;

        Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, SUBTITLE_CONTENT_TYPE)],
            Body::from(body),
        )
            .into_response())
    }

    /// Fetch image bytes and their content type, refusing bodies over the
    /// configured size limit.
    pub async fn image_bytes(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(Option<String>, bytes::Bytes)> {
        if !is_http_url(url) {
            return Err(Error::Validation(format!("url must be absolute http(s), got '{url}'")));
        }
        fetch_bytes(
            &self.http,
            url,
            Some(&self.default_referer),
            self.asset_timeout,
            self.max_image_bytes,
            cancel,
        )
        .await
    }
}
