use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder stored wherever a field could not be scraped.
pub const NO_DATA: &str = "no data";

/// One catalogue entry as scraped from a listing page.
///
/// `level` stays `None` until enrichment runs; `in_rsci` stays `None` until
/// reconciliation runs. Both are `Some` on every record the writer sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub title: String,
    #[serde(rename = "issn_list")]
    pub issn: Vec<String>,
    pub detail_link: Option<String>,
    pub publisher: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_rsci: Option<bool>,
}

impl JournalRecord {
    pub fn new(title: impl Into<String>) -> Self {
        JournalRecord {
            title: title.into(),
            issn: Vec::new(),
            detail_link: None,
            publisher: NO_DATA.to_string(),
            level: None,
            in_rsci: None,
        }
    }

    /// ISSNs joined for display, or the sentinel when there are none.
    pub fn issn_display(&self) -> String {
        if self.issn.is_empty() {
            NO_DATA.to_string()
        } else {
            self.issn.join(", ")
        }
    }

    pub fn level_or_sentinel(&self) -> &str {
        self.level.as_deref().unwrap_or(NO_DATA)
    }

    /// True when enrichment produced an actual digit string.
    pub fn has_numeric_level(&self) -> bool {
        self.level
            .as_deref()
            .is_some_and(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_digit()))
    }
}

/// The two listings pulled from the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Vak,
    Rsci,
}

impl Collection {
    /// Fixed query for this listing; `page` is appended per request.
    pub fn query(self, per_page: u32) -> Vec<(String, String)> {
        let flag = match self {
            Collection::Vak => "vak",
            Collection::Rsci => "rs",
        };
        vec![
            ("adv".to_string(), "true".to_string()),
            (flag.to_string(), "true".to_string()),
            ("per_page".to_string(), per_page.to_string()),
        ]
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Vak => f.write_str("VAK"),
            Collection::Rsci => f.write_str("RSCI"),
        }
    }
}

/// Which catalogue rows to keep by their RSCI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RsciFilter {
    #[default]
    Any,
    Included,
    Excluded,
}

impl RsciFilter {
    pub fn accepts(self, in_rsci: bool) -> bool {
        match self {
            RsciFilter::Any => true,
            RsciFilter::Included => in_rsci,
            RsciFilter::Excluded => !in_rsci,
        }
    }
}
