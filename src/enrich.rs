use std::convert::Infallible;
use std::sync::Arc;

use tracing::{debug, info};

use crate::fetch::PageFetcher;
use crate::model::{JournalRecord, NO_DATA};
use crate::parser::parse_level;
use crate::pool::TaskGroup;

/// Attaches a quality level to each record by visiting its detail page.
#[derive(Clone)]
pub struct LevelEnricher {
    fetcher: Arc<dyn PageFetcher>,
    workers: usize,
    progress: bool,
}

impl LevelEnricher {
    pub fn new(fetcher: Arc<dyn PageFetcher>, workers: usize) -> Self {
        LevelEnricher {
            fetcher,
            workers,
            progress: false,
        }
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    /// Every record leaves with a level: digits, or the sentinel when it has
    /// no link or its page could not be read. Returns how many got digits.
    pub async fn enrich(&self, records: &mut [JournalRecord]) -> usize {
        let mut group = TaskGroup::new(self.workers).with_progress("levels", self.progress);
        for (idx, record) in records.iter().enumerate() {
            let Some(link) = record.detail_link.clone() else {
                continue;
            };
            let fetcher = Arc::clone(&self.fetcher);
            group.spawn(async move {
                let level = match fetcher.fetch(&link, &[]).await {
                    Ok(html) => parse_level(&html),
                    Err(e) => {
                        debug!(link = %link, error = %e, "detail page unavailable");
                        NO_DATA.to_string()
                    }
                };
                Ok::<_, Infallible>((idx, level))
            });
        }
        let submitted = group.len();

        for outcome in group.join_all().await {
            match outcome {
                Ok((idx, level)) => records[idx].level = Some(level),
                Err(e) => debug!(error = %e, "level task lost"),
            }
        }

        let mut numeric = 0;
        for record in records.iter_mut() {
            if record.level.is_none() {
                record.level = Some(NO_DATA.to_string());
            }
            if record.has_numeric_level() {
                numeric += 1;
            }
        }
        info!(submitted, numeric, "levels enriched");
        numeric
    }
}
