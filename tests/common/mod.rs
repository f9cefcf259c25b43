//! Shared test harness for integration tests.
//!
//! [`TestHarness`] builds a full [`AppContext`] around stub collaborators
//! (catalog, skip-time service, schedule source) whose answers tests can set
//! at any time. The `with_server*` constructors start axum on a random port.
//! Upstream CDNs are simulated with `wiremock`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use anistream::catalog::Catalog;
use anistream::decoder::CipherTable;
use anistream::schedule::{ScheduleEntry, ScheduleSource};
use anistream::server::context::AppContext;
use anistream::server::router::build_router;
use anistream::skip::{SkipTimeService, SkipTimes};
use anistream_core::config::Config;
use anistream_core::{Error, RawSourceDescriptor, Result, TranslationMode};

pub const REFERER: &str = "https://allmanga.to";

// ---------------------------------------------------------------------------
// Stub collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StubCatalog {
    pub sources: Mutex<Vec<RawSourceDescriptor>>,
    pub last_mode: Mutex<Option<TranslationMode>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Catalog for StubCatalog {
    async fn episode_sources(
        &self,
        _show_id: &str,
        _episode: &str,
        mode: TranslationMode,
    ) -> Result<Vec<RawSourceDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_mode.lock().unwrap() = Some(mode);
        Ok(self.sources.lock().unwrap().clone())
    }
}

/// Answers from a map; unknown episodes are "not found". `fail` makes every
/// lookup an upstream error.
#[derive(Default)]
pub struct StubSkip {
    pub answers: Mutex<HashMap<(u64, u32), SkipTimes>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl SkipTimeService for StubSkip {
    async fn skip_times(&self, mal_id: u64, episode: u32) -> Result<SkipTimes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::upstream("https://skip.test", "service unavailable"));
        }
        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(&(mal_id, episode))
            .cloned()
            .unwrap_or_else(SkipTimes::not_found))
    }
}

#[derive(Default)]
pub struct StubSchedule {
    pub entries: Mutex<Vec<ScheduleEntry>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ScheduleSource for StubSchedule {
    async fn day(&self, date: NaiveDate, _cancel: &CancellationToken) -> Result<Vec<ScheduleEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.airing_time.date_naive() == date)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct TestHarness {
    pub ctx: AppContext,
    pub catalog: Arc<StubCatalog>,
    pub skip: Arc<StubSkip>,
    pub schedule: Arc<StubSchedule>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let catalog = Arc::new(StubCatalog::default());
        let skip = Arc::new(StubSkip::default());
        let schedule = Arc::new(StubSchedule::default());

        let ctx = AppContext::with_services(
            config,
            reqwest::Client::new(),
            catalog.clone(),
            skip.clone(),
            schedule.clone(),
        );

        Self {
            ctx,
            catalog,
            skip,
            schedule,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    pub fn set_sources(&self, sources: Vec<RawSourceDescriptor>) {
        *self.catalog.sources.lock().unwrap() = sources;
    }
}

/// Config whose media host is `upstream`, so decoded `/path` links land on
/// the mock server.
pub fn config_for(upstream: &str) -> Config {
    let mut config = Config::default();
    config.upstream.media_host = upstream.to_string();
    config.upstream.referer = REFERER.to_string();
    config.proxy.stream_timeout_secs = 2;
    config.proxy.manifest_timeout_secs = 2;
    config.resolver.fetch_timeout_secs = 2;
    config
}

/// Obfuscate `plain` with the catalog cipher.
pub fn encode(plain: &str) -> String {
    let table: HashMap<char, String> = CipherTable::catalog()
        .entries()
        .map(|(pair, ch)| (ch, pair))
        .collect();
    let body: String = plain
        .chars()
        .map(|c| table.get(&c).cloned().unwrap_or_else(|| panic!("no cipher pair for {c:?}")))
        .collect();
    format!("--{body}")
}
