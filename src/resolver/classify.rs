//! URL-shape classification for decoded source links.

use anistream_core::{leading_number, sort_by_resolution_desc, QualityLink};

/// Path segment marking an indirection document.
pub const INDIRECTION_SEGMENT: &str = "/apivtwo/clock";
/// Host serving repackaged multi-quality playlists.
pub const REPACKAGER_HOST: &str = "repackager.wixmp.com";
/// Segmented-stream manifest extension.
pub const MANIFEST_EXT: &str = ".m3u8";

/// The three link shapes a decoded source can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkShape {
    /// Points at a JSON document listing the real links.
    Indirection(String),
    /// A repackager URL embedding a comma-separated quality list.
    Repackaged(String),
    /// A playable file or manifest.
    Direct(String),
}

/// Classify a decoded, normalized URL.
pub fn classify(url: &str) -> LinkShape {
    if path_of(url).contains(INDIRECTION_SEGMENT) {
        LinkShape::Indirection(ensure_json_suffix(url))
    } else if host_of(url).is_some_and(|h| h.eq_ignore_ascii_case(REPACKAGER_HOST)) {
        LinkShape::Repackaged(url.to_string())
    } else {
        LinkShape::Direct(url.to_string())
    }
}

/// Collapse repeated `/` in the path, leaving the scheme separator and the
/// query string alone.
pub fn normalize_slashes(url: &str) -> String {
    let (scheme, rest) = match url.find("://") {
        Some(i) => url.split_at(i + 3),
        None => ("", url),
    };
    let split = rest.find(['?', '#']).unwrap_or(rest.len());
    let (path, tail) = rest.split_at(split);

    let mut out = String::with_capacity(url.len());
    out.push_str(scheme);
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == '/' && prev_slash {
            continue;
        }
        prev_slash = ch == '/';
        out.push(ch);
    }
    out.push_str(tail);
    out
}

/// Insert `.json` right after the indirection segment unless it is present.
pub fn ensure_json_suffix(url: &str) -> String {
    let Some(idx) = url.find(INDIRECTION_SEGMENT) else {
        return url.to_string();
    };
    let after = idx + INDIRECTION_SEGMENT.len();
    if url[after..].starts_with(".json") {
        url.to_string()
    } else {
        format!("{}.json{}", &url[..after], &url[after..])
    }
}

/// `true` when the URL path ends in the manifest extension.
pub fn is_manifest_url(url: &str) -> bool {
    path_of(url).to_ascii_lowercase().ends_with(MANIFEST_EXT)
}

/// Expand a repackager URL into one non-segmented link per quality token,
/// highest resolution first.
///
/// `https://repackager.wixmp.com/host/path/,1080p,720p,/mp4/file.mp4.urlset/master.m3u8`
/// yields `https://host/path/1080p/mp4/file.mp4` and the 720p sibling.
/// Tokens without a numeric prefix are skipped; a URL with no token list
/// yields nothing.
pub fn repackaged_links(url: &str) -> Vec<QualityLink> {
    let scheme = if url.starts_with("http://") { "http://" } else { "https://" };
    let Some((_, origin)) = url.split_once(&format!("{REPACKAGER_HOST}/")) else {
        return Vec::new();
    };
    let origin = origin.split(".urlset").next().unwrap_or(origin);

    let Some(token_segment) = origin.split('/').find(|seg| seg.starts_with(',')) else {
        return Vec::new();
    };

    let mut links: Vec<QualityLink> = token_segment
        .split(',')
        .filter(|t| !t.is_empty())
        .filter(|t| leading_number(t).is_some())
        .filter_map(|quality| {
            let target = format!("{scheme}{}", origin.replacen(token_segment, quality, 1));
            QualityLink::new(quality, target, false).ok()
        })
        .collect();

    sort_by_resolution_desc(&mut links);
    links
}

/// A direct link labelled `default`, segmented iff it is a manifest.
pub fn direct_link(url: &str, referer: &str) -> Option<QualityLink> {
    QualityLink::new("default", url, is_manifest_url(url))
        .ok()
        .map(|link| link.with_header("Referer", referer))
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    Some(authority.rsplit('@').next().unwrap_or(authority).split(':').next().unwrap_or(""))
}

fn path_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, r)| r);
    let start = without_scheme.find('/').unwrap_or(without_scheme.len());
    let path = &without_scheme[start..];
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}
