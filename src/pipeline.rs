use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use reqwest::Url;
use tracing::{info, warn};

use crate::cache::{CachedCollections, CollectionCache, JsonFileCache};
use crate::catalogue::CatalogueWriter;
use crate::collector::PaginatedCollector;
use crate::config::Settings;
use crate::enrich::LevelEnricher;
use crate::error::CatalogueError;
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::model::Collection;
use crate::reconcile::reconcile;
use crate::store::{CsvTableStore, TableStore};

#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshOptions {
    /// Collect from the network even when the cache is usable.
    pub ignore_cache: bool,
}

/// What a refresh produced, for the front end's status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub location: PathBuf,
    pub vak: usize,
    pub rsci: usize,
    pub in_rsci: usize,
    pub with_level: usize,
    pub from_cache: bool,
}

/// The refresh operation over injected network, cache and store.
#[derive(Clone)]
pub struct Pipeline {
    settings: Settings,
    index_url: Url,
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<dyn CollectionCache>,
    store: Arc<dyn TableStore>,
}

impl Pipeline {
    pub fn new(
        settings: Settings,
        fetcher: Arc<dyn PageFetcher>,
        cache: Arc<dyn CollectionCache>,
        store: Arc<dyn TableStore>,
    ) -> anyhow::Result<Self> {
        let index_url = Url::parse(&settings.base_url)?;
        Ok(Pipeline {
            settings,
            index_url,
            fetcher,
            cache,
            store,
        })
    }

    /// HTTP fetcher, JSON cache file and CSV tables, all from `settings`.
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let fetcher = Arc::new(HttpFetcher::from_settings(&settings)?);
        let cache = Arc::new(JsonFileCache::new(settings.cache_path()));
        Self::new(settings, fetcher, cache, Arc::new(CsvTableStore))
    }

    /// collect (or cache) → reconcile → enrich → write; each stage drains
    /// completely before the next starts.
    pub async fn refresh(&self, opts: RefreshOptions) -> Result<RefreshReport, CatalogueError> {
        let started = Instant::now();
        let (collections, from_cache) = self.collections(opts).await;
        let rsci_count = collections.rsci.len();

        let mut vak = reconcile(collections.vak, &collections.rsci);
        let in_rsci = vak.iter().filter(|r| r.in_rsci == Some(true)).count();

        let enricher = LevelEnricher::new(Arc::clone(&self.fetcher), self.settings.workers())
            .with_progress(self.settings.progress);
        let with_level = enricher.enrich(&mut vak).await;

        let location = self.writer().write(&mut vak)?;
        info!(
            vak = vak.len(),
            rsci = rsci_count,
            in_rsci,
            with_level,
            from_cache,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refresh finished"
        );

        Ok(RefreshReport {
            location,
            vak: vak.len(),
            rsci: rsci_count,
            in_rsci,
            with_level,
            from_cache,
        })
    }

    /// Cached listings when usable, otherwise both collected afresh and the
    /// cache overwritten with them.
    async fn collections(&self, opts: RefreshOptions) -> (CachedCollections, bool) {
        if !opts.ignore_cache {
            if let Some(cached) = self.cache.load_usable() {
                info!(
                    vak = cached.vak.len(),
                    rsci = cached.rsci.len(),
                    saved_at = %cached.saved_at,
                    "using cached listings"
                );
                return (cached, true);
            }
        }

        let collector = PaginatedCollector::new(
            Arc::clone(&self.fetcher),
            &self.index_url,
            self.settings.workers(),
        )
        .with_max_pages(self.settings.max_pages)
        .with_progress(self.settings.progress);
        let per_page = self.settings.per_page;
        let vak = collector.collect_collection(Collection::Vak, per_page).await;
        let rsci = collector.collect_collection(Collection::Rsci, per_page).await;

        let fresh = CachedCollections::new(vak, rsci);
        if let Err(e) = self.cache.store(&fresh) {
            warn!(error = %e, "could not save listing cache");
        }
        (fresh, false)
    }

    pub fn writer(&self) -> CatalogueWriter {
        CatalogueWriter::new(
            Arc::clone(&self.store),
            &self.settings.catalogue_path,
            &self.settings.fallback_path,
        )
    }
}
