//! Segmented-manifest rewriting.
//!
//! Every media reference in a playlist is made absolute and wrapped in the
//! `/proxy` form, so variant playlists, segments, keys and init sections all
//! route back through the gateway with the same referer.

use reqwest::Url;

use crate::resolver::fetcher::resolve_against;

/// Tags whose `URI="…"` attribute points at something the player fetches.
const URI_TAGS: [&str; 4] = [
    "#EXT-X-KEY",
    "#EXT-X-MEDIA",
    "#EXT-X-MAP",
    "#EXT-X-I-FRAME-STREAM-INF",
];

/// Inputs for one rewrite pass.
#[derive(Debug, Clone)]
pub struct ManifestRewriteContext {
    pub base_url: String,
    pub referer: String,
}

impl ManifestRewriteContext {
    pub fn new(base_url: impl Into<String>, referer: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            referer: referer.into(),
        }
    }
}

/// Proxy-relative URL for `target` fetched with `referer`.
pub fn proxy_path(target: &str, referer: &str) -> String {
    format!(
        "/proxy?url={}&referer={}",
        urlencoding::encode(target),
        urlencoding::encode(referer)
    )
}

/// Rewrite a manifest body line by line.
///
/// Blank lines and comments are kept as they are, except that the `URI`
/// attribute of key/media/map tags is proxied. Every other line is treated as
/// a reference relative to the manifest's own location. A line that cannot be
/// resolved is left untouched.
pub fn rewrite_manifest(body: &str, ctx: &ManifestRewriteContext) -> String {
    let base = Url::parse(&ctx.base_url).ok();
    let proxied = |reference: &str| {
        resolve_against(base.as_ref(), reference).map(|abs| proxy_path(&abs, &ctx.referer))
    };

    let mut out: Vec<String> = Vec::new();
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            out.push(line.to_string());
        } else if trimmed.starts_with('#') {
            if URI_TAGS.iter().any(|tag| trimmed.starts_with(tag)) {
                out.push(rewrite_uri_attribute(trimmed, &proxied));
            } else {
                out.push(line.to_string());
            }
        } else {
            out.push(proxied(trimmed).unwrap_or_else(|| line.to_string()));
        }
    }

    let mut rewritten = out.join("\n");
    if body.ends_with('\n') {
        rewritten.push('\n');
    }
    rewritten
}

fn rewrite_uri_attribute(line: &str, proxied: &impl Fn(&str) -> Option<String>) -> String {
    const ATTR: &str = "URI=\"";
    let Some(start) = line.find(ATTR).map(|i| i + ATTR.len()) else {
        return line.to_string();
    };
    let Some(len) = line[start..].find('"') else {
        return line.to_string();
    };
    let uri = &line[start..start + len];
    match proxied(uri) {
        Some(replacement) => format!("{}{}{}", &line[..start], replacement, &line[start + len..]),
        None => line.to_string(),
    }
}
