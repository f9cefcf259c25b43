//! Indirection-document and master-playlist resolution.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use anistream_core::{sort_by_resolution_desc, Error, QualityLink, Result, SubtitleTrack};

use super::classify::is_manifest_url;
use crate::http::{fetch_document, fetch_json};

/// Stream-info tag introducing a variant in a master playlist.
const STREAM_INF: &str = "#EXT-X-STREAM-INF";

// ---------------------------------------------------------------------------
// Indirection document
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IndirectionDoc {
    #[serde(default)]
    links: Vec<IndirectionLink>,
    #[serde(default)]
    subtitles: Vec<RawSubtitle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndirectionLink {
    link: String,
    #[serde(default)]
    hls: bool,
    #[serde(default)]
    resolution_str: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    subtitles: Vec<RawSubtitle>,
}

#[derive(Debug, Deserialize)]
struct RawSubtitle {
    #[serde(default)]
    lang: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    src: String,
}

/// Links and subtitles recovered from one indirection document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedLinks {
    pub links: Vec<QualityLink>,
    pub subtitles: Vec<SubtitleTrack>,
}

// ---------------------------------------------------------------------------
// ManifestFetcher
// ---------------------------------------------------------------------------

/// Follows indirection documents (and the master playlists they may point
/// at) to concrete quality links.
#[derive(Clone)]
pub struct ManifestFetcher {
    http: reqwest::Client,
    timeout: Duration,
}

impl ManifestFetcher {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Resolve one indirection reference.
    ///
    /// Fails when the document cannot be fetched or parsed, or when it lists
    /// no usable link.
    pub async fn fetch(
        &self,
        url: &str,
        referer: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedLinks> {
        let doc: IndirectionDoc =
            fetch_json(&self.http, url, Some(referer), self.timeout, cancel).await?;

        let first = doc
            .links
            .first()
            .ok_or_else(|| Error::ManifestParse(format!("{url}: indirection document has no links")))?;

        let subtitles = collect_subtitles(doc.subtitles.iter().chain(first.subtitles.iter()));

        let mut links = if first.hls {
            let link_referer = first
                .headers
                .get("Referer")
                .or_else(|| first.headers.get("referer"))
                .map(String::as_str)
                .unwrap_or(referer);
            self.expand_master(&first.link, link_referer, &first.headers, cancel)
                .await?
        } else {
            doc.links
                .iter()
                .filter_map(|l| {
                    let label = l.resolution_str.as_deref().unwrap_or("default");
                    QualityLink::new(label, l.link.as_str(), is_manifest_url(&l.link))
                        .ok()
                        .map(|q| with_headers(q, &l.headers))
                })
                .collect()
        };

        if links.is_empty() {
            return Err(Error::ManifestParse(format!("{url}: no playable links")));
        }
        sort_by_resolution_desc(&mut links);

        debug!(url = %url, links = links.len(), subtitles = subtitles.len(), "Indirection resolved");
        Ok(FetchedLinks { links, subtitles })
    }

    /// Fetch a master playlist and turn each variant into a link, falling
    /// back to a single `auto` link for the playlist itself.
    ///
    /// Variant references resolve against the post-redirect playlist URL.
    async fn expand_master(
        &self,
        manifest_url: &str,
        referer: &str,
        headers: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<QualityLink>> {
        let doc = fetch_document(&self.http, manifest_url, Some(referer), self.timeout, cancel).await?;

        let variants = parse_master_playlist(&doc.body, &doc.url);
        if variants.is_empty() {
            let auto = QualityLink::new("auto", manifest_url, true)?;
            return Ok(vec![with_headers(auto, headers)]);
        }

        Ok(variants
            .into_iter()
            .filter_map(|(label, url)| QualityLink::new(label, url, true).ok())
            .map(|q| with_headers(q, headers))
            .collect())
    }
}

fn with_headers(link: QualityLink, headers: &BTreeMap<String, String>) -> QualityLink {
    headers
        .iter()
        .fold(link, |acc, (k, v)| acc.with_header(k.as_str(), v.as_str()))
}

fn collect_subtitles<'a>(raw: impl Iterator<Item = &'a RawSubtitle>) -> Vec<SubtitleTrack> {
    let mut out: Vec<SubtitleTrack> = Vec::new();
    for sub in raw {
        if sub.src.is_empty() || out.iter().any(|t| t.url == sub.src) {
            continue;
        }
        out.push(SubtitleTrack {
            lang: sub.lang.clone(),
            label: if sub.label.is_empty() { sub.lang.clone() } else { sub.label.clone() },
            url: sub.src.clone(),
        });
    }
    out
}

// ---------------------------------------------------------------------------
// Master playlist parsing
// ---------------------------------------------------------------------------

/// Extract `(label, absolute url)` for each stream-info entry.
///
/// The label is the height from `RESOLUTION=WxH` plus `p`, or `auto` when
/// the attribute is missing. URIs are resolved against `base_url`.
pub fn parse_master_playlist(body: &str, base_url: &str) -> Vec<(String, String)> {
    let base = Url::parse(base_url).ok();
    let mut out = Vec::new();
    let mut pending: Option<String> = None;

    for line in body.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if line.starts_with(STREAM_INF) {
            pending = Some(resolution_label(line));
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        if let Some(label) = pending.take() {
            if let Some(url) = resolve_against(base.as_ref(), line) {
                out.push((label, url));
            }
        }
    }
    out
}

fn resolution_label(stream_inf: &str) -> String {
    stream_inf
        .split_once("RESOLUTION=")
        .and_then(|(_, rest)| {
            let value = rest.split(',').next()?;
            let (_, height) = value.split_once(['x', 'X'])?;
            height.trim().parse::<u32>().ok()
        })
        .map_or_else(|| "auto".to_string(), |h| format!("{h}p"))
}

/// Resolve `reference` against `base`; absolute references pass through.
pub fn resolve_against(base: Option<&Url>, reference: &str) -> Option<String> {
    if let Ok(abs) = Url::parse(reference) {
        return Some(abs.to_string());
    }
    base?.join(reference).ok().map(|u| u.to_string())
}
