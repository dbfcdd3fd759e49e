use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::CatalogueError;
use crate::model::{JournalRecord, RsciFilter};
use crate::store::{CatalogueRow, CsvTableStore, TableStore};

/// Catalogue order: RSCI members first, then level descending, then title.
///
/// Levels compare as strings, not numbers. "10" sorts below "9" and the
/// sentinel sorts above every digit string. Consumers of the written table
/// depend on this order, so keep it textual.
pub fn catalogue_order(a: &JournalRecord, b: &JournalRecord) -> Ordering {
    let a_rsci = a.in_rsci.unwrap_or(false);
    let b_rsci = b.in_rsci.unwrap_or(false);
    b_rsci
        .cmp(&a_rsci)
        .then_with(|| b.level_or_sentinel().cmp(a.level_or_sentinel()))
        .then_with(|| a.title.cmp(&b.title))
}

pub fn sort_catalogue(records: &mut [JournalRecord]) {
    records.sort_by(catalogue_order);
}

/// Writes the enriched catalogue, falling back to a second location.
#[derive(Clone)]
pub struct CatalogueWriter {
    store: Arc<dyn TableStore>,
    primary: PathBuf,
    fallback: PathBuf,
}

impl CatalogueWriter {
    pub fn new(store: Arc<dyn TableStore>, primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        CatalogueWriter {
            store,
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    /// Sorts `records` in place and returns where the table landed.
    pub fn write(&self, records: &mut [JournalRecord]) -> Result<PathBuf, CatalogueError> {
        sort_catalogue(records);
        let rows: Vec<CatalogueRow> = records.iter().map(CatalogueRow::from).collect();

        let primary_err = match self.store.write_table(&rows, &self.primary) {
            Ok(()) => {
                info!(rows = rows.len(), path = %self.primary.display(), "catalogue written");
                return Ok(self.primary.clone());
            }
            Err(e) => e,
        };
        warn!(error = %primary_err, fallback = %self.fallback.display(), "primary catalogue write failed");

        match self.store.write_table(&rows, &self.fallback) {
            Ok(()) => {
                info!(rows = rows.len(), path = %self.fallback.display(), "catalogue written to fallback");
                Ok(self.fallback.clone())
            }
            Err(fallback_err) => Err(CatalogueError::WriteFailed {
                primary: Box::new(primary_err),
                fallback: Box::new(fallback_err),
            }),
        }
    }
}

/// Reads the current catalogue and writes the subset a caller asked for.
#[derive(Clone)]
pub struct CatalogueFilter {
    store: Arc<dyn TableStore>,
    primary: PathBuf,
    fallback: PathBuf,
    output: PathBuf,
}

impl CatalogueFilter {
    pub fn new(
        store: Arc<dyn TableStore>,
        primary: impl Into<PathBuf>,
        fallback: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        CatalogueFilter {
            store,
            primary: primary.into(),
            fallback: fallback.into(),
            output: output.into(),
        }
    }

    /// CSV tables at the configured locations. Touches neither the network
    /// nor the cache.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(CsvTableStore),
            &settings.catalogue_path,
            &settings.fallback_path,
            &settings.filtered_path,
        )
    }

    /// Primary if present, else fallback.
    ///
    /// The primary wins even when it is older than the fallback, which
    /// happens after a refresh could only write the fallback. That case is
    /// logged; remove the stale primary to read the fallback.
    pub fn source(&self) -> Option<&Path> {
        match (self.primary.exists(), self.fallback.exists()) {
            (true, _) => {
                if self.primary_is_stale() {
                    warn!(
                        primary = %self.primary.display(),
                        fallback = %self.fallback.display(),
                        "fallback catalogue is newer than primary, reading primary"
                    );
                }
                Some(self.primary.as_path())
            }
            (false, true) => Some(self.fallback.as_path()),
            (false, false) => None,
        }
    }

    /// Both tables exist and the fallback was modified after the primary.
    pub fn primary_is_stale(&self) -> bool {
        match (modified(&self.primary), modified(&self.fallback)) {
            (Some(primary), Some(fallback)) => fallback > primary,
            _ => false,
        }
    }

    pub fn read_catalogue(&self) -> Result<Vec<CatalogueRow>, CatalogueError> {
        let source = self.source().ok_or_else(|| CatalogueError::Missing {
            primary: self.primary.clone(),
            fallback: self.fallback.clone(),
        })?;
        Ok(self.store.read_table(source)?)
    }

    /// An empty `levels` set keeps every level. Levels match the stored text
    /// exactly, so the sentinel can be asked for too.
    pub fn filter(&self, levels: &BTreeSet<String>, rsci: RsciFilter) -> Result<PathBuf, CatalogueError> {
        let rows = self.read_catalogue()?;
        let total = rows.len();
        let kept = select_rows(rows, levels, rsci);

        self.store.write_table(&kept, &self.output)?;
        info!(
            total,
            kept = kept.len(),
            path = %self.output.display(),
            "filtered catalogue written"
        );
        Ok(self.output.clone())
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

pub fn select_rows(rows: Vec<CatalogueRow>, levels: &BTreeSet<String>, rsci: RsciFilter) -> Vec<CatalogueRow> {
    rows.into_iter()
        .filter(|row| levels.is_empty() || levels.contains(row.level.trim()))
        .filter(|row| rsci.accepts(row.is_in_rsci()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::NO_DATA;
    use crate::store::{FLAG_NO, FLAG_YES};

    fn rec(title: &str, level: &str, in_rsci: bool) -> JournalRecord {
        let mut r = JournalRecord::new(title);
        r.level = Some(level.into());
        r.in_rsci = Some(in_rsci);
        r
    }

    fn row(title: &str, level: &str, in_rsci: bool) -> CatalogueRow {
        CatalogueRow::from(&rec(title, level, in_rsci))
    }

    fn levels(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn order_is_rsci_then_level_text_then_title() {
        let mut records = vec![
            rec("b", "1", false),
            rec("a", "1", false),
            rec("z", "2", false),
            rec("c", "1", true),
            rec("d", "3", true),
            rec("e", NO_DATA, false),
        ];
        sort_catalogue(&mut records);
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["d", "c", "e", "z", "a", "b"]);
    }

    #[test]
    fn level_comparison_is_textual() {
        let mut records = vec![rec("ten", "10", false), rec("nine", "9", false)];
        sort_catalogue(&mut records);
        assert_eq!(records[0].title, "nine");
    }

    #[test]
    fn sorting_is_idempotent() {
        let mut records = vec![
            rec("x", "2", true),
            rec("y", "4", false),
            rec("w", "2", true),
            rec("v", NO_DATA, true),
        ];
        sort_catalogue(&mut records);
        let once = records.clone();
        sort_catalogue(&mut records);
        assert_eq!(records, once);
        for pair in records.windows(2) {
            assert_ne!(catalogue_order(&pair[0], &pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn select_by_level_and_rsci() {
        let rows = vec![row("one", "1", true), row("three", "3", true), row("two", "2", false)];
        let kept = select_rows(rows, &levels(&["1", "2"]), RsciFilter::Included);
        assert_eq!(kept, vec![row("one", "1", true)]);
    }

    #[test]
    fn select_everything() {
        let rows = vec![row("one", "1", true), row("nd", NO_DATA, false)];
        assert_eq!(select_rows(rows.clone(), &BTreeSet::new(), RsciFilter::Any), rows);
    }

    #[test]
    fn sentinel_can_be_selected() {
        let rows = vec![row("one", "1", true), row("nd", NO_DATA, false)];
        let kept = select_rows(rows, &levels(&[NO_DATA]), RsciFilter::Excluded);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "nd");
        assert_eq!(kept[0].in_rsci, FLAG_NO);
    }

    #[test]
    fn writer_uses_primary() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CatalogueWriter::new(
            Arc::new(CsvTableStore),
            dir.path().join("main.csv"),
            dir.path().join("alt.csv"),
        );
        let mut records = vec![rec("b", "1", false), rec("a", "2", true)];
        let path = writer.write(&mut records).unwrap();

        assert_eq!(path, dir.path().join("main.csv"));
        assert!(!dir.path().join("alt.csv").exists());
        let stored = CsvTableStore.read_table(&path).unwrap();
        assert_eq!(stored[0].title, "a");
        assert_eq!(stored[0].in_rsci, FLAG_YES);
    }

    #[test]
    fn writer_falls_back_when_primary_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        // a directory squatting on the primary path makes the rename fail
        let primary = dir.path().join("main.csv");
        std::fs::create_dir(&primary).unwrap();
        let writer = CatalogueWriter::new(Arc::new(CsvTableStore), &primary, dir.path().join("alt.csv"));

        let path = writer.write(&mut [rec("a", "1", true)]).unwrap();
        assert_eq!(path, dir.path().join("alt.csv"));
    }

    struct BrokenStore;

    impl TableStore for BrokenStore {
        fn read_table(&self, path: &Path) -> Result<Vec<CatalogueRow>, StoreError> {
            Err(StoreError::io(path, std::io::Error::other("unreadable")))
        }

        fn write_table(&self, _rows: &[CatalogueRow], path: &Path) -> Result<(), StoreError> {
            Err(StoreError::io(path, std::io::Error::other("read-only")))
        }
    }

    #[test]
    fn writer_reports_both_failures() {
        let writer = CatalogueWriter::new(Arc::new(BrokenStore), "main.csv", "alt.csv");
        let err = writer.write(&mut [rec("a", "1", true)]).unwrap_err();
        assert!(matches!(err, CatalogueError::WriteFailed { .. }));
    }

    #[test]
    fn filter_without_catalogue_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let filter = CatalogueFilter::new(
            Arc::new(CsvTableStore),
            dir.path().join("main.csv"),
            dir.path().join("alt.csv"),
            dir.path().join("filtered.csv"),
        );
        let err = filter.filter(&BTreeSet::new(), RsciFilter::Any).unwrap_err();
        assert!(matches!(err, CatalogueError::Missing { .. }));
        assert!(!dir.path().join("filtered.csv").exists());
    }

    #[test]
    fn filter_reads_fallback_when_primary_absent() {
        let dir = tempfile::tempdir().unwrap();
        let alt = dir.path().join("alt.csv");
        CsvTableStore
            .write_table(&[row("one", "1", true), row("two", "2", false)], &alt)
            .unwrap();

        let filter = CatalogueFilter::new(
            Arc::new(CsvTableStore),
            dir.path().join("main.csv"),
            &alt,
            dir.path().join("filtered.csv"),
        );
        assert_eq!(filter.source(), Some(alt.as_path()));

        let out = filter.filter(&levels(&["2"]), RsciFilter::Any).unwrap();
        let rows = CsvTableStore.read_table(&out).unwrap();
        assert_eq!(rows, vec![row("two", "2", false)]);
    }

    #[test]
    fn filter_overwrites_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.csv");
        CsvTableStore
            .write_table(&[row("one", "1", true), row("two", "2", false)], &main)
            .unwrap();
        let filter = CatalogueFilter::new(
            Arc::new(CsvTableStore),
            &main,
            dir.path().join("alt.csv"),
            dir.path().join("filtered.csv"),
        );

        filter.filter(&BTreeSet::new(), RsciFilter::Any).unwrap();
        let out = filter.filter(&BTreeSet::new(), RsciFilter::Excluded).unwrap();
        assert_eq!(CsvTableStore.read_table(&out).unwrap(), vec![row("two", "2", false)]);
    }

    #[test]
    fn newer_fallback_is_flagged_but_primary_still_read() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.csv");
        let alt = dir.path().join("alt.csv");
        CsvTableStore.write_table(&[row("old", "1", true)], &main).unwrap();
        CsvTableStore.write_table(&[row("new", "2", true)], &alt).unwrap();

        let hour_ago = SystemTime::now() - std::time::Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&main)
            .unwrap()
            .set_modified(hour_ago)
            .unwrap();

        let filter = CatalogueFilter::new(
            Arc::new(CsvTableStore),
            &main,
            &alt,
            dir.path().join("filtered.csv"),
        );
        assert!(filter.primary_is_stale());
        assert_eq!(filter.source(), Some(main.as_path()));
        assert_eq!(filter.read_catalogue().unwrap()[0].title, "old");

        std::fs::remove_file(&main).unwrap();
        assert!(!filter.primary_is_stale());
        assert_eq!(filter.read_catalogue().unwrap()[0].title, "new");
    }

    #[test]
    fn filter_from_settings_leaves_cache_alone() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            catalogue_path: dir.path().join("main.csv"),
            fallback_path: dir.path().join("alt.csv"),
            filtered_path: dir.path().join("filtered.csv"),
            cache_dir: dir.path().join("cache"),
            ..Settings::default()
        };
        CsvTableStore
            .write_table(&[row("one", "1", true), row("two", "2", false)], &settings.catalogue_path)
            .unwrap();

        let out = CatalogueFilter::from_settings(&settings)
            .filter(&levels(&["1"]), RsciFilter::Any)
            .unwrap();
        assert_eq!(out, settings.filtered_path);
        assert_eq!(CsvTableStore.read_table(&out).unwrap(), vec![row("one", "1", true)]);
        assert!(!settings.cache_dir.exists());
    }
}
