use std::collections::HashMap;

use tracing::info;

use crate::model::{JournalRecord, NO_DATA};

/// Trimmed ISSN, or `None` for blanks and the sentinel.
pub fn normalize_issn(raw: &str) -> Option<&str> {
    let issn = raw.trim();
    (!issn.is_empty() && issn != NO_DATA).then_some(issn)
}

/// ISSN → RSCI title. Later records overwrite earlier ones on collision.
pub fn rsci_index(rsci: &[JournalRecord]) -> HashMap<&str, &str> {
    let mut index = HashMap::new();
    for record in rsci {
        for issn in record.issn.iter().filter_map(|i| normalize_issn(i)) {
            index.insert(issn, record.title.as_str());
        }
    }
    index
}

/// Flags each VAK record that shares at least one ISSN with the RSCI set.
pub fn reconcile(mut vak: Vec<JournalRecord>, rsci: &[JournalRecord]) -> Vec<JournalRecord> {
    let index = rsci_index(rsci);
    let mut matched = 0usize;
    for record in vak.iter_mut() {
        let hit = record
            .issn
            .iter()
            .filter_map(|i| normalize_issn(i))
            .any(|issn| index.contains_key(issn));
        if hit {
            matched += 1;
        }
        record.in_rsci = Some(hit);
    }
    info!(
        vak = vak.len(),
        rsci_issns = index.len(),
        matched,
        "reconciled collections"
    );
    vak
}
