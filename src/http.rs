//! Shared upstream HTTP plumbing: client construction, error mapping, and
//! cancellable one-shot fetches.
//!
//! Every helper takes a [`CancellationToken`]; when it fires the in-flight
//! request future is dropped, which closes the upstream connection.

use std::future::Future;
use std::time::Duration;

use anistream_core::config::UpstreamConfig;
use anistream_core::{Error, Result};
use bytes::{Bytes, BytesMut};
use reqwest::header::{CONTENT_TYPE, REFERER};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// Build the shared upstream client.
///
/// No overall timeout is set here: streamed bodies can legitimately run for
/// minutes, so each call site bounds its own wait.
pub fn build_client(cfg: &UpstreamConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .connect_timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
        .build()
        .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))
}

/// Map a transport error onto the error taxonomy.
pub fn upstream_error(url: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::UpstreamTimeout { url: url.to_string() }
    } else if let Some(status) = err.status() {
        Error::UpstreamStatus {
            status: status.as_u16(),
            url: url.to_string(),
        }
    } else if err.is_decode() {
        Error::ManifestParse(format!("{url}: {err}"))
    } else if err.is_connect() || err.is_request() || err.is_body() {
        Error::upstream(url, err)
    } else {
        Error::Internal(format!("request to {url} failed: {err}"))
    }
}

/// Run `fut` unless `cancel` fires first.
pub async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = fut => res,
    }
}

/// Issue a GET with an optional Referer and return the response once the
/// status is known to be a success.
async fn get_ok(
    client: &reqwest::Client,
    url: &str,
    referer: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Response> {
    let mut req = client.get(url).timeout(timeout);
    if let Some(referer) = referer {
        req = req.header(REFERER, referer);
    }
    let resp = req.send().await.map_err(|e| upstream_error(url, e))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::UpstreamStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp)
}

/// A text document and the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct Document {
    /// Location after redirects; relative references resolve against this.
    pub url: String,
    pub body: String,
}

/// Fetch a document as text, keeping the post-redirect URL.
pub async fn fetch_document(
    client: &reqwest::Client,
    url: &str,
    referer: Option<&str>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Document> {
    until_cancelled(cancel, async {
        let resp = get_ok(client, url, referer, timeout).await?;
        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(|e| upstream_error(url, e))?;
        Ok(Document {
            url: final_url,
            body,
        })
    })
    .await
}

/// Fetch a document as text.
pub async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    referer: Option<&str>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String> {
    Ok(fetch_document(client, url, referer, timeout, cancel).await?.body)
}

/// Fetch and deserialize a JSON document.
pub async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    referer: Option<&str>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T> {
    until_cancelled(cancel, async {
        let resp = get_ok(client, url, referer, timeout).await?;
        let body = resp.bytes().await.map_err(|e| upstream_error(url, e))?;
        serde_json::from_slice(&body)
            .map_err(|e| Error::ManifestParse(format!("{url}: invalid JSON: {e}")))
    })
    .await
}

/// Fetch raw bytes together with the upstream content type.
///
/// Bodies larger than `max_bytes` are rejected, either up front from
/// `Content-Length` or as soon as the streamed total passes the limit.
pub async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    referer: Option<&str>,
    timeout: Duration,
    max_bytes: usize,
    cancel: &CancellationToken,
) -> Result<(Option<String>, Bytes)> {
    until_cancelled(cancel, async {
        let mut resp = get_ok(client, url, referer, timeout).await?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        if resp.content_length().is_some_and(|len| len > max_bytes as u64) {
            return Err(too_large(url, max_bytes));
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| upstream_error(url, e))? {
            if body.len() + chunk.len() > max_bytes {
                return Err(too_large(url, max_bytes));
            }
            body.extend_from_slice(&chunk);
        }
        Ok((content_type, body.freeze()))
    })
    .await
}

fn too_large(url: &str, max_bytes: usize) -> Error {
    Error::upstream(url, format!("body exceeds {max_bytes} bytes"))
}

/// Returns `true` for absolute http(s) URLs.
pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
