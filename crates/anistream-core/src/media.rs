//! Playback data model: catalog source descriptors and the resolved variants
//! returned to clients.
//!
//! Wire field names are camelCase to match what the web client consumes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ---------------------------------------------------------------------------
// TranslationMode
// ---------------------------------------------------------------------------

/// Audio/subtitle flavour of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    #[default]
    Sub,
    Dub,
}

impl fmt::Display for TranslationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sub => write!(f, "sub"),
            Self::Dub => write!(f, "dub"),
        }
    }
}

impl FromStr for TranslationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sub" => Ok(Self::Sub),
            "dub" => Ok(Self::Dub),
            other => Err(Error::Validation(format!(
                "mode must be 'sub' or 'dub', got '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// RawSourceDescriptor
// ---------------------------------------------------------------------------

/// One candidate source as listed by the catalog, before decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSourceDescriptor {
    pub source_name: String,
    pub obfuscated_url: String,
    pub priority: f64,
}

impl RawSourceDescriptor {
    pub fn new(source_name: impl Into<String>, obfuscated_url: impl Into<String>, priority: f64) -> Self {
        Self {
            source_name: source_name.into(),
            obfuscated_url: obfuscated_url.into(),
            priority,
        }
    }
}

// ---------------------------------------------------------------------------
// QualityLink
// ---------------------------------------------------------------------------

/// A single playable rendition of a source.
///
/// The url is always absolute and non-empty; [`QualityLink::new`] refuses to
/// build one otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityLink {
    pub resolution_label: String,
    pub url: String,
    pub is_segmented: bool,
    /// Headers the upstream insists on (usually `Referer`).
    #[serde(
        rename = "headers",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub required_headers: BTreeMap<String, String>,
}

impl QualityLink {
    /// Build a link, rejecting empty or relative URLs.
    pub fn new(
        resolution_label: impl Into<String>,
        url: impl Into<String>,
        is_segmented: bool,
    ) -> crate::Result<Self> {
        let url = url.into();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Validation(format!(
                "quality link url must be absolute, got '{url}'"
            )));
        }
        Ok(Self {
            resolution_label: resolution_label.into(),
            url,
            is_segmented,
            required_headers: BTreeMap::new(),
        })
    }

    /// Attach a header the client has to forward when fetching this link.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.required_headers.insert(name.into(), value.into());
        self
    }

    /// Numeric resolution parsed from the leading digits of the label
    /// (`"1080p"` → 1080). `None` for labels like `"default"` or `"auto"`.
    pub fn resolution_value(&self) -> Option<u32> {
        leading_number(&self.resolution_label)
    }
}

/// Parse the leading decimal digits of `label`.
pub fn leading_number(label: &str) -> Option<u32> {
    let digits: &str = &label[..label
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(label.len())];
    digits.parse().ok()
}

/// Order links by numeric resolution, highest first. Links without a numeric
/// resolution keep their relative order after the numeric ones.
pub fn sort_by_resolution_desc(links: &mut [QualityLink]) {
    links.sort_by(|a, b| match (a.resolution_value(), b.resolution_value()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

// ---------------------------------------------------------------------------
// SubtitleTrack / SourceVariant
// ---------------------------------------------------------------------------

/// An external subtitle file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTrack {
    pub lang: String,
    pub label: String,
    pub url: String,
}

/// Everything playable from one trusted source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceVariant {
    pub source_name: String,
    pub links: Vec<QualityLink>,
    pub subtitles: Vec<SubtitleTrack>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(label: &str) -> QualityLink {
        QualityLink::new(label, format!("https://cdn.example/{label}.mp4"), false).unwrap()
    }

    #[test]
    fn translation_mode_parse() {
        assert_eq!("sub".parse::<TranslationMode>().unwrap(), TranslationMode::Sub);
        assert_eq!("dub".parse::<TranslationMode>().unwrap(), TranslationMode::Dub);
        assert!("raw".parse::<TranslationMode>().is_err());
        assert_eq!(TranslationMode::Dub.to_string(), "dub");
    }

    #[test]
    fn quality_link_rejects_empty_and_relative_urls() {
        assert!(QualityLink::new("1080p", "", false).is_err());
        assert!(QualityLink::new("1080p", "/relative.mp4", false).is_err());
        assert!(QualityLink::new("1080p", "https://cdn.example/a.mp4", false).is_ok());
    }

    #[test]
    fn resolution_value_parsing() {
        assert_eq!(link("1080p").resolution_value(), Some(1080));
        assert_eq!(link("360").resolution_value(), Some(360));
        assert_eq!(link("default").resolution_value(), None);
        assert_eq!(leading_number(""), None);
    }

    #[test]
    fn sort_puts_highest_resolution_first() {
        let mut links = vec![link("480p"), link("auto"), link("1080p"), link("720p")];
        sort_by_resolution_desc(&mut links);
        let labels: Vec<_> = links.iter().map(|l| l.resolution_label.as_str()).collect();
        assert_eq!(labels, vec!["1080p", "720p", "480p", "auto"]);
    }

    #[test]
    fn headers_serialize_only_when_present() {
        let plain = serde_json::to_value(link("720p")).unwrap();
        assert!(plain.get("headers").is_none());
        assert_eq!(plain["resolutionLabel"], "720p");
        assert_eq!(plain["isSegmented"], false);

        let with_referer = serde_json::to_value(
            link("720p").with_header("Referer", "https://allmanga.to"),
        )
        .unwrap();
        assert_eq!(with_referer["headers"]["Referer"], "https://allmanga.to");
    }

    #[test]
    fn source_variant_wire_shape() {
        let variant = SourceVariant {
            source_name: "Default".into(),
            links: vec![link("1080p")],
            subtitles: vec![SubtitleTrack {
                lang: "en".into(),
                label: "English".into(),
                url: "https://cdn.example/en.vtt".into(),
            }],
        };
        let json = serde_json::to_value(&variant).unwrap();
        assert_eq!(json["sourceName"], "Default");
        assert_eq!(json["links"][0]["url"], "https://cdn.example/1080p.mp4");
        assert_eq!(json["subtitles"][0]["lang"], "en");
    }
}
