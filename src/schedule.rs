//! Airing schedule lookups.
//!
//! The schedule comes from a third-party HTML timetable. Fetching is behind
//! [`ScheduleSource`] and HTML interpretation behind [`ScheduleParser`], so
//! either can be replaced in tests without touching the network.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use anistream_core::config::ScheduleConfig;
use anistream_core::{Error, Result};

use crate::http::fetch_text;
use crate::resolver::fetcher::resolve_against;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One show airing on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub title: String,
    pub episode: Option<u32>,
    pub airing_time: DateTime<Utc>,
    pub thumbnail: String,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Turns a timetable page into entries.
pub trait ScheduleParser: Send + Sync {
    fn parse(&self, html: &str) -> Result<Vec<ScheduleEntry>>;
}

/// Provides the shows airing on a date.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn day(&self, date: NaiveDate, cancel: &CancellationToken) -> Result<Vec<ScheduleEntry>>;
}

// ---------------------------------------------------------------------------
// Regex parser
// ---------------------------------------------------------------------------

/// Pattern-based parser for the timetable markup.
pub struct RegexScheduleParser {
    block: Regex,
    title: Regex,
    episode: Regex,
    time: Regex,
    image: Regex,
}

impl RegexScheduleParser {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Internal(format!("bad schedule pattern: {e}")))
        };
        Ok(Self {
            block: compile(r#"<div[^>]*class="[^"]*timetable-column-show[^"]*"[^>]*>"#)?,
            title: compile(r#"class="[^"]*show-title-bar[^"]*"[^>]*>\s*([^<]+?)\s*<"#)?,
            episode: compile(r#"class="[^"]*show-episode[^"]*"[^>]*>[^<0-9]*(\d+)"#)?,
            time: compile(r#"<time[^>]*datetime="([^"]+)""#)?,
            image: compile(r#"<img[^>]*?(?:data-src|src)="([^"]+)""#)?,
        })
    }

    fn parse_block(&self, block: &str) -> Option<ScheduleEntry> {
        let title = self.title.captures(block)?.get(1)?.as_str();
        let airing_time = self
            .time
            .captures(block)
            .and_then(|c| DateTime::parse_from_rfc3339(c.get(1)?.as_str()).ok())?
            .with_timezone(&Utc);
        let episode = self
            .episode
            .captures(block)
            .and_then(|c| c.get(1)?.as_str().parse().ok());
        let thumbnail = self
            .image
            .captures(block)
            .and_then(|c| c.get(1))
            .map_or_else(String::new, |m| m.as_str().to_string());

        Some(ScheduleEntry {
            title: unescape(title),
            episode,
            airing_time,
            thumbnail,
        })
    }
}

impl ScheduleParser for RegexScheduleParser {
    fn parse(&self, html: &str) -> Result<Vec<ScheduleEntry>> {
        let starts: Vec<usize> = self.block.find_iter(html).map(|m| m.start()).collect();
        let mut entries = Vec::with_capacity(starts.len());
        for (i, start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(html.len());
            if let Some(entry) = self.parse_block(&html[*start..end]) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

fn unescape(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

/// Fetches the weekly timetable page and keeps the requested day.
pub struct HttpScheduleSource {
    http: reqwest::Client,
    page_url: String,
    timeout: Duration,
    parser: Box<dyn ScheduleParser>,
}

impl HttpScheduleSource {
    pub fn new(http: reqwest::Client, cfg: &ScheduleConfig, parser: Box<dyn ScheduleParser>) -> Self {
        Self {
            http,
            page_url: cfg.page_url.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            parser,
        }
    }

    fn week_url(&self, date: NaiveDate) -> String {
        let week = date.iso_week();
        let sep = if self.page_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}year={}&week={}", self.page_url, week.year(), week.week())
    }
}

#[async_trait]
impl ScheduleSource for HttpScheduleSource {
    async fn day(&self, date: NaiveDate, cancel: &CancellationToken) -> Result<Vec<ScheduleEntry>> {
        let url = self.week_url(date);
        let html = fetch_text(&self.http, &url, None, self.timeout, cancel).await?;
        let base = Url::parse(&self.page_url).ok();

        let mut entries: Vec<ScheduleEntry> = self
            .parser
            .parse(&html)?
            .into_iter()
            .filter(|e| e.airing_time.date_naive() == date)
            .map(|mut e| {
                if !e.thumbnail.is_empty() {
                    e.thumbnail = resolve_against(base.as_ref(), &e.thumbnail).unwrap_or(e.thumbnail);
                }
                e
            })
            .collect();
        entries.sort_by_key(|e| e.airing_time);

        debug!(%date, shows = entries.len(), "Schedule parsed");
        Ok(entries)
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("date must be YYYY-MM-DD, got '{raw}'")))
}
