//! Shared application context.
//!
//! [`AppContext`] is handed to every route handler through axum state. All
//! fields are cheap to clone; the services themselves live behind `Arc`s.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use anistream_core::config::Config;
use anistream_core::Result;

use crate::cache::ResponseCache;
use crate::catalog::{Catalog, GraphQlCatalog};
use crate::decoder::{CipherTable, Decoder};
use crate::http::build_client;
use crate::proxy::ProxyGateway;
use crate::resolver::fetcher::ManifestFetcher;
use crate::resolver::SourceResolver;
use crate::schedule::{HttpScheduleSource, RegexScheduleParser, ScheduleSource};
use crate::skip::{AniSkipClient, SkipTimeService};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub cache: Arc<ResponseCache>,
    pub decoder: Arc<Decoder>,
    pub resolver: Arc<SourceResolver>,
    pub catalog: Arc<dyn Catalog>,
    pub proxy: Arc<ProxyGateway>,
    pub skip: Arc<dyn SkipTimeService>,
    pub schedule: Arc<dyn ScheduleSource>,
    /// Root token; every request's token is a child of it.
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Wire up the production services from `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let http = build_client(&config.upstream)?;
        let catalog = Arc::new(GraphQlCatalog::new(http.clone(), &config.upstream));
        let skip = Arc::new(AniSkipClient::new(http.clone(), &config.skip));
        let schedule = Arc::new(HttpScheduleSource::new(
            http.clone(),
            &config.schedule,
            Box::new(RegexScheduleParser::new()?),
        ));
        Ok(Self::with_services(config, http, catalog, skip, schedule))
    }

    /// Build a context around externally supplied collaborators.
    pub fn with_services(
        config: Config,
        http: reqwest::Client,
        catalog: Arc<dyn Catalog>,
        skip: Arc<dyn SkipTimeService>,
        schedule: Arc<dyn ScheduleSource>,
    ) -> Self {
        let decoder = Arc::new(Decoder::new(
            CipherTable::catalog(),
            config.upstream.media_host.clone(),
        ));
        let fetcher = ManifestFetcher::new(
            http.clone(),
            Duration::from_secs(config.resolver.fetch_timeout_secs),
        );
        let resolver = Arc::new(SourceResolver::new(
            Arc::clone(&decoder),
            fetcher,
            config.resolver.trusted_sources.iter().cloned(),
            config.upstream.referer.clone(),
        ));
        let proxy = Arc::new(ProxyGateway::new(http.clone(), &config.upstream, &config.proxy));

        Self {
            config: Arc::new(config),
            http,
            cache: Arc::new(ResponseCache::new()),
            decoder,
            resolver,
            catalog,
            proxy,
            skip,
            schedule,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token for one inbound request.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn video_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.video_ttl_secs)
    }

    pub fn skip_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.skip_ttl_secs)
    }

    pub fn schedule_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.schedule_ttl_secs)
    }
}
