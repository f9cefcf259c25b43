//! Episode source resolution.
//!
//! [`SourceResolver`] turns the catalog's raw descriptors into playable
//! [`SourceVariant`]s:
//!
//! 1. untrusted source names are dropped,
//! 2. the rest are ordered by priority (highest first),
//! 3. every candidate is decoded, classified and expanded concurrently,
//! 4. failed or empty candidates are dropped, the rest keep their order.

pub mod classify;
pub mod fetcher;

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use anistream_core::{Error, RawSourceDescriptor, Result, SourceVariant, TranslationMode};

use crate::catalog::Catalog;
use crate::decoder::Decoder;
use classify::{classify, direct_link, normalize_slashes, repackaged_links, LinkShape};
pub use fetcher::{FetchedLinks, ManifestFetcher};

/// Result of resolving a single candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Resolved(SourceVariant),
    Failed { source: String, reason: String },
}

pub struct SourceResolver {
    decoder: Arc<Decoder>,
    fetcher: ManifestFetcher,
    trusted: HashSet<String>,
    referer: String,
}

impl SourceResolver {
    pub fn new(
        decoder: Arc<Decoder>,
        fetcher: ManifestFetcher,
        trusted: impl IntoIterator<Item = String>,
        referer: impl Into<String>,
    ) -> Self {
        Self {
            decoder,
            fetcher,
            trusted: trusted.into_iter().collect(),
            referer: referer.into(),
        }
    }

    /// Case-sensitive allow-list check.
    pub fn is_trusted(&self, source_name: &str) -> bool {
        self.trusted.contains(source_name)
    }

    /// Ask `catalog` for an episode's sources and resolve them.
    pub async fn resolve_episode(
        &self,
        catalog: &dyn Catalog,
        show_id: &str,
        episode: &str,
        mode: TranslationMode,
        cancel: &CancellationToken,
    ) -> Result<Vec<SourceVariant>> {
        let descriptors = catalog.episode_sources(show_id, episode, mode).await?;
        let variants = self.resolve(&descriptors, cancel).await;
        if variants.is_empty() {
            return Err(Error::not_found(
                "playable sources",
                format!("{show_id}/{episode}/{mode}"),
            ));
        }
        info!(show_id, episode, %mode, sources = variants.len(), "Episode resolved");
        Ok(variants)
    }

    /// Resolve descriptors into variants ordered by descending priority.
    ///
    /// Never fails: candidates that error out are logged and left out.
    pub async fn resolve(
        &self,
        descriptors: &[RawSourceDescriptor],
        cancel: &CancellationToken,
    ) -> Vec<SourceVariant> {
        let mut candidates: Vec<&RawSourceDescriptor> = descriptors
            .iter()
            .filter(|d| {
                let trusted = self.is_trusted(&d.source_name);
                if !trusted {
                    debug!(source = %d.source_name, "Skipping untrusted source");
                }
                trusted
            })
            .collect();
        // Stable: equal priorities keep catalog order.
        candidates.sort_by(|a, b| b.priority.total_cmp(&a.priority));

        // join_all yields outputs in input order, whatever finishes first.
        let outcomes = join_all(candidates.iter().map(|d| self.resolve_candidate(d, cancel))).await;

        outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                CandidateOutcome::Resolved(variant) => Some(variant),
                CandidateOutcome::Failed { source, reason } => {
                    debug!(source = %source, reason = %reason, "Candidate dropped");
                    None
                }
            })
            .collect()
    }

    /// Decode, classify and expand one descriptor.
    pub async fn resolve_candidate(
        &self,
        descriptor: &RawSourceDescriptor,
        cancel: &CancellationToken,
    ) -> CandidateOutcome {
        let source = descriptor.source_name.clone();
        let decoded = normalize_slashes(&self.decoder.decode(&descriptor.obfuscated_url));
        debug!(source = %source, url = %decoded, "Decoded candidate");

        let (links, subtitles) = match classify(&decoded) {
            LinkShape::Indirection(url) => match self.fetcher.fetch(&url, &self.referer, cancel).await {
                Ok(FetchedLinks { links, subtitles }) => (links, subtitles),
                Err(e) => {
                    return CandidateOutcome::Failed {
                        source,
                        reason: e.to_string(),
                    }
                }
            },
            LinkShape::Repackaged(url) => (repackaged_links(&url), Vec::new()),
            LinkShape::Direct(url) => (direct_link(&url, &self.referer).into_iter().collect(), Vec::new()),
        };

        if links.is_empty() {
            return CandidateOutcome::Failed {
                source,
                reason: format!("no playable links in '{decoded}'"),
            };
        }

        CandidateOutcome::Resolved(SourceVariant {
            source_name: source,
            links,
            subtitles,
        })
    }
}
