use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::fetch::PageFetcher;
use crate::model::{Collection, JournalRecord};
use crate::parser::ListingParser;
use crate::pool::TaskGroup;

/// Pulls every listing page of one collection from the index.
#[derive(Clone)]
pub struct PaginatedCollector {
    fetcher: Arc<dyn PageFetcher>,
    parser: ListingParser,
    index_url: String,
    workers: usize,
    max_pages: u32,
    progress: bool,
}

/// Ceiling on the page count a listing may advertise.
pub const DEFAULT_MAX_PAGES: u32 = 1000;

impl PaginatedCollector {
    pub fn new(fetcher: Arc<dyn PageFetcher>, index_url: &Url, workers: usize) -> Self {
        PaginatedCollector {
            fetcher,
            parser: ListingParser::new(index_url),
            index_url: index_url.to_string(),
            workers,
            max_pages: DEFAULT_MAX_PAGES,
            progress: false,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    pub async fn collect_collection(&self, collection: Collection, per_page: u32) -> Vec<JournalRecord> {
        let records = self.collect(&collection.query(per_page)).await;
        info!(collection = %collection, records = records.len(), "collected listing");
        records
    }

    /// Page 1 decides everything: no page or no records means an empty
    /// result. Pages 2..=T are merged in completion order.
    pub async fn collect(&self, query: &[(String, String)]) -> Vec<JournalRecord> {
        let first = match self.fetcher.fetch(&self.index_url, query).await {
            Ok(html) => self.parser.parse(&html),
            Err(e) => {
                debug!(error = %e, "first listing page unavailable");
                return Vec::new();
            }
        };
        if first.records.is_empty() {
            return Vec::new();
        }

        let total = if first.total_pages > self.max_pages {
            warn!(
                advertised = first.total_pages,
                max_pages = self.max_pages,
                "listing advertises more pages than allowed, truncating"
            );
            self.max_pages
        } else {
            first.total_pages
        };
        let mut records = first.records;
        if total <= 1 {
            return records;
        }
        debug!(total_pages = total, "fanning out listing pages");

        let mut group = TaskGroup::new(self.workers).with_progress("pages", self.progress);
        for page in 2..=total {
            let fetcher = Arc::clone(&self.fetcher);
            let parser = self.parser.clone();
            let url = self.index_url.clone();
            let mut page_query = query.to_vec();
            page_query.push(("page".to_string(), page.to_string()));

            group.spawn(async move {
                let html = fetcher.fetch(&url, &page_query).await?;
                Ok::<_, FetchError>(parser.parse(&html).records)
            });
        }

        for outcome in group.join_all().await {
            match outcome {
                Ok(page_records) => records.extend(page_records),
                Err(e) => debug!(error = %e, "listing page skipped"),
            }
        }
        records
    }
}
