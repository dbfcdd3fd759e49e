use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::model::{JournalRecord, NO_DATA};

pub const FLAG_YES: &str = "Yes";
pub const FLAG_NO: &str = "No";

/// One catalogue row exactly as it sits in the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogueRow {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "ISSN")]
    pub issn: String,
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Publisher")]
    pub publisher: String,
    #[serde(rename = "Level")]
    pub level: String,
    #[serde(rename = "InRSCI")]
    pub in_rsci: String,
}

impl CatalogueRow {
    pub fn is_in_rsci(&self) -> bool {
        self.in_rsci.trim() == FLAG_YES
    }
}

impl From<&JournalRecord> for CatalogueRow {
    fn from(r: &JournalRecord) -> Self {
        CatalogueRow {
            title: r.title.clone(),
            issn: r.issn_display(),
            link: r.detail_link.clone().unwrap_or_default(),
            publisher: if r.publisher.is_empty() {
                NO_DATA.to_string()
            } else {
                r.publisher.clone()
            },
            level: r.level_or_sentinel().to_string(),
            in_rsci: if r.in_rsci.unwrap_or(false) { FLAG_YES } else { FLAG_NO }.to_string(),
        }
    }
}

/// Where catalogue tables live.
pub trait TableStore: Send + Sync {
    fn read_table(&self, path: &Path) -> Result<Vec<CatalogueRow>, StoreError>;
    fn write_table(&self, rows: &[CatalogueRow], path: &Path) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvTableStore;

impl TableStore for CsvTableStore {
    fn read_table(&self, path: &Path) -> Result<Vec<CatalogueRow>, StoreError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| StoreError::csv(path, e))?;
        reader
            .deserialize()
            .collect::<Result<Vec<CatalogueRow>, _>>()
            .map_err(|e| StoreError::csv(path, e))
    }

    fn write_table(&self, rows: &[CatalogueRow], path: &Path) -> Result<(), StoreError> {
        write_atomic(path, |out| {
            let mut writer = csv::Writer::from_writer(out);
            if rows.is_empty() {
                // keep the header so readers see the columns
                writer
                    .write_record(["Title", "ISSN", "Link", "Publisher", "Level", "InRSCI"])
                    .map_err(|e| StoreError::csv(path, e))?;
            }
            for row in rows {
                writer.serialize(row).map_err(|e| StoreError::csv(path, e))?;
            }
            writer.flush().map_err(|e| StoreError::io(path, e))
        })
    }
}

/// Writes through a temp file in the target directory and renames it into
/// place, so `path` is either fully replaced or left as it was.
pub fn write_atomic<F>(path: &Path, fill: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut BufWriter<&File>) -> Result<(), StoreError>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        fill(&mut out)?;
        out.flush().map_err(|e| StoreError::io(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}
