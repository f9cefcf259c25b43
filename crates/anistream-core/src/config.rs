//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries all
//! sub-configs for the server, upstream catalog, resolver, proxy, cache, and
//! third-party lookups. Every section defaults sensibly so a completely empty
//! file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::Error;

/// Default locations probed when no explicit config path is given.
const DEFAULT_PATHS: [&str; 3] = [
    "./anistream.toml",
    "~/.config/anistream/config.toml",
    "/etc/anistream/config.toml",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub resolver: ResolverConfig,
    pub proxy: ProxyConfig,
    pub cache: CacheConfig,
    pub skip: SkipConfig,
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from `custom_path` if given, otherwise from the first default
    /// location that exists, otherwise return defaults.
    ///
    /// An explicit path that cannot be read or parsed is an error; a default
    /// location is only used when present.
    pub fn load_or_default(custom_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = custom_path {
            return Self::load(path);
        }

        for path_str in DEFAULT_PATHS {
            let expanded = shellexpand::tilde(path_str);
            let path = Path::new(expanded.as_ref());
            if path.exists() {
                tracing::info!("Loading config from {}", path.display());
                return Self::load(path);
            }
        }

        tracing::info!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        for (name, url) in [
            ("upstream.api_url", &self.upstream.api_url),
            ("upstream.media_host", &self.upstream.media_host),
            ("skip.base_url", &self.skip.base_url),
            ("schedule.page_url", &self.schedule.page_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                warnings.push(format!("{name} '{url}' is not an http(s) URL"));
            }
        }

        if self.resolver.trusted_sources.is_empty() {
            warnings.push("resolver.trusted_sources is empty; no source will ever resolve".into());
        }

        if self.resolver.fetch_timeout_secs == 0
            || self.proxy.manifest_timeout_secs == 0
            || self.proxy.stream_timeout_secs == 0
        {
            warnings.push("a timeout of 0 seconds makes every upstream call fail".into());
        }

        if self.cache.video_ttl_secs > self.cache.listing_ttl_secs {
            warnings.push(
                "cache.video_ttl_secs exceeds cache.listing_ttl_secs; resolved links may go stale"
                    .into(),
            );
        }

        if self.skip.requests_per_second == 0 {
            warnings.push("skip.requests_per_second is 0; falling back to 1".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// The obfuscated catalog and the hosts its links point at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// GraphQL endpoint of the catalog.
    pub api_url: String,
    /// Referer the catalog and its CDNs expect.
    pub referer: String,
    /// User-Agent sent on every upstream request.
    pub user_agent: String,
    /// Host prefixed to decoded links that start with `/`.
    pub media_host: String,
    /// Catalog request timeout.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.allanime.day/api".into(),
            referer: "https://allmanga.to".into(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0"
                .into(),
            media_host: "https://allanime.day".into(),
            timeout_secs: 10,
        }
    }
}

/// Source resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Case-sensitive allow-list of catalog source names.
    pub trusted_sources: Vec<String>,
    /// Timeout for indirection documents and nested manifests.
    pub fetch_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            trusted_sources: ["Default", "Yt-mp4", "S-mp4", "Luf-Mp4", "Sak", "Kir", "Fm-Hls"]
                .into_iter()
                .map(String::from)
                .collect(),
            fetch_timeout_secs: 10,
        }
    }
}

/// Streaming proxy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Timeout for fetching a manifest to rewrite.
    pub manifest_timeout_secs: u64,
    /// Timeout before the first byte of a relayed stream.
    pub stream_timeout_secs: u64,
    /// Timeout for subtitle and image fetches.
    pub asset_timeout_secs: u64,
    /// Largest upstream image the image proxy will buffer.
    pub max_image_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            manifest_timeout_secs: 15,
            stream_timeout_secs: 20,
            asset_timeout_secs: 15,
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Response cache lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Catalog listings and show metadata.
    pub listing_ttl_secs: u64,
    /// Resolved episode sources.
    pub video_ttl_secs: u64,
    /// Skip-time lookups, including "not found" answers.
    pub skip_ttl_secs: u64,
    /// Parsed airing schedules.
    pub schedule_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            listing_ttl_secs: 6 * 60 * 60,
            video_ttl_secs: 5 * 60,
            skip_ttl_secs: 24 * 60 * 60,
            schedule_ttl_secs: 60 * 60,
        }
    }
}

/// Skip-time lookup service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipConfig {
    pub base_url: String,
    pub requests_per_second: u32,
    pub timeout_secs: u64,
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.aniskip.com/v2".into(),
            requests_per_second: 4,
            timeout_secs: 10,
        }
    }
}

/// Airing schedule page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub page_url: String,
    pub timeout_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            page_url: "https://animeschedule.net/".into(),
            timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.proxy.manifest_timeout_secs, 15);
        assert_eq!(cfg.proxy.stream_timeout_secs, 20);
        assert_eq!(cfg.cache.video_ttl_secs, 300);
        assert!(cfg.resolver.trusted_sources.iter().any(|s| s == "Default"));
    }

    #[test]
    fn default_config_no_warnings() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn parse_toml_config() {
        let toml = r#"
            [server]
            port = 9090

            [resolver]
            trusted_sources = ["Default"]
        "#;
        let cfg = Config::from_toml(toml).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.resolver.trusted_sources, vec!["Default".to_string()]);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.resolver.fetch_timeout_secs, 10);
        assert_eq!(cfg.upstream.referer, "https://allmanga.to");
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn parse_invalid_toml_is_validation_error() {
        let err = Config::from_toml("server = 12").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_explicit_missing_file_is_error() {
        let err = Config::load_or_default(Some(Path::new("/nonexistent/anistream.toml")));
        assert!(err.is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anistream.toml");
        std::fs::write(&path, "[cache]\nvideo_ttl_secs = 60\n").unwrap();
        let cfg = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(cfg.cache.video_ttl_secs, 60);
    }

    #[test]
    fn empty_allow_list_warns() {
        let mut cfg = Config::default();
        cfg.resolver.trusted_sources.clear();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("trusted_sources")));
    }

    #[test]
    fn non_http_upstream_warns() {
        let mut cfg = Config::default();
        cfg.upstream.api_url = "ftp://catalog".into();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("upstream.api_url")));
    }
}
