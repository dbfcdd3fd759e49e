use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::model::{JournalRecord, NO_DATA};

static ITEM_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".list-group-item").unwrap());
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".tx-uppercase").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static ISSN_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".tx-dark").unwrap());
static PUBLISHER_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".tx-gray-500").unwrap());
static PAGE_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".pagination .page-item .page-link").unwrap());

const DETAIL_PATH_MARKERS: &[&str] = &["/record/", "/journal/"];

/// Records found on one listing page plus the page count it advertises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub records: Vec<JournalRecord>,
    pub total_pages: u32,
}

/// Parses listing pages of the journal index.
#[derive(Debug, Clone)]
pub struct ListingParser {
    origin: Url,
}

impl ListingParser {
    /// `base` is any URL on the site; links resolve against its origin.
    pub fn new(base: &Url) -> Self {
        let origin = base.join("/").unwrap_or_else(|_| base.clone());
        ListingParser { origin }
    }

    pub fn parse(&self, html: &str) -> ListingPage {
        let doc = Html::parse_document(html);

        let records: Vec<JournalRecord> = doc
            .select(&ITEM_SEL)
            .filter_map(|item| self.parse_item(item))
            .collect();

        if records.is_empty() {
            return ListingPage {
                records,
                total_pages: 1,
            };
        }

        ListingPage {
            records,
            total_pages: total_pages(&doc),
        }
    }

    fn parse_item(&self, item: ElementRef<'_>) -> Option<JournalRecord> {
        let title_el = item.select(&TITLE_SEL).next()?;
        let title = text_of(title_el);
        if title.is_empty() {
            return None;
        }

        let mut record = JournalRecord::new(title);
        record.detail_link = find_link(item, title_el).and_then(|href| self.resolve(href));

        for issn in item.select(&ISSN_SEL).map(text_of) {
            if !issn.is_empty() && issn != NO_DATA && !record.issn.contains(&issn) {
                record.issn.push(issn);
            }
        }

        if let Some(publisher) = item.select(&PUBLISHER_SEL).next().map(text_of) {
            if !publisher.is_empty() {
                record.publisher = publisher;
            }
        }

        Some(record)
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        if href.starts_with("http://") || href.starts_with("https://") {
            return Some(href.to_string());
        }
        // site-relative either way: "/record/1" and "record/1" both hang off the origin
        let path = format!("/{}", href.trim_start_matches('/'));
        self.origin.join(&path).ok().map(String::from)
    }
}

fn find_link<'a>(item: ElementRef<'a>, title_el: ElementRef<'a>) -> Option<&'a str> {
    if title_el.value().name() == "a" {
        return title_el.value().attr("href");
    }
    item.select(&ANCHOR_SEL)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| DETAIL_PATH_MARKERS.iter().any(|m| href.contains(m)))
}

/// Largest plain page number in the pagination control, 1 without one.
fn total_pages(doc: &Html) -> u32 {
    doc.select(&PAGE_LINK_SEL)
        .map(text_of)
        .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|t| t.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .max()
        .unwrap_or(1)
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ListingParser {
        let base = Url::parse("https://journalrank.rcsi.science/ru/record-sources/").unwrap();
        ListingParser::new(&base)
    }

    const PAGE: &str = r#"
<html><body>
  <div class="list-group">
    <div class="list-group-item">
      <a class="tx-uppercase" href="/ru/record-sources/details/101">Вопросы философии</a>
      <span class="tx-dark">0042-8744</span>
      <span class="tx-dark"> 2949-3692 </span>
      <span class="tx-dark">0042-8744</span>
      <span class="tx-gray-500">Наука</span>
    </div>
    <div class="list-group-item">
      <h5 class="tx-uppercase">Journal Without Anchor Title</h5>
      <a href="/ru/about">About</a>
      <a href="ru/record/202">Open</a>
    </div>
    <div class="list-group-item">
      <h5 class="tx-uppercase">Bare Journal</h5>
    </div>
    <div class="list-group-item"><span class="tx-dark">1111-1111</span></div>
  </div>
  <ul class="pagination">
    <li class="page-item"><a class="page-link">«</a></li>
    <li class="page-item"><a class="page-link">1</a></li>
    <li class="page-item"><a class="page-link">2</a></li>
    <li class="page-item"><a class="page-link">…</a></li>
    <li class="page-item"><a class="page-link">17</a></li>
    <li class="page-item"><a class="page-link">»</a></li>
  </ul>
</body></html>
"#;

    #[test]
    fn parses_records_in_source_order() {
        let page = parser().parse(PAGE);
        let titles: Vec<_> = page.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Вопросы философии", "Journal Without Anchor Title", "Bare Journal"]
        );
    }

    #[test]
    fn anchor_title_link_resolved_against_origin() {
        let page = parser().parse(PAGE);
        assert_eq!(
            page.records[0].detail_link.as_deref(),
            Some("https://journalrank.rcsi.science/ru/record-sources/details/101")
        );
    }

    #[test]
    fn fallback_link_must_look_like_a_record() {
        let page = parser().parse(PAGE);
        assert_eq!(
            page.records[1].detail_link.as_deref(),
            Some("https://journalrank.rcsi.science/ru/record/202")
        );
        assert_eq!(page.records[2].detail_link, None);
    }

    #[test]
    fn issn_trimmed_and_deduplicated() {
        let page = parser().parse(PAGE);
        assert_eq!(page.records[0].issn, vec!["0042-8744", "2949-3692"]);
        assert!(page.records[1].issn.is_empty());
        assert_eq!(page.records[1].issn_display(), NO_DATA);
    }

    #[test]
    fn publisher_or_sentinel() {
        let page = parser().parse(PAGE);
        assert_eq!(page.records[0].publisher, "Наука");
        assert_eq!(page.records[1].publisher, NO_DATA);
    }

    #[test]
    fn total_pages_is_max_numeric_link() {
        assert_eq!(parser().parse(PAGE).total_pages, 17);
    }

    #[test]
    fn absolute_links_kept_as_is() {
        let html = r#"<div class="list-group-item">
            <a class="tx-uppercase" href="https://other.example/journal/9">X</a></div>"#;
        let page = parser().parse(html);
        assert_eq!(
            page.records[0].detail_link.as_deref(),
            Some("https://other.example/journal/9")
        );
    }

    #[test]
    fn no_pagination_means_single_page() {
        let html = r#"<div class="list-group-item"><b class="tx-uppercase">Solo</b></div>"#;
        let page = parser().parse(html);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn unparseable_pagination_defaults_to_one() {
        let html = r#"<div class="list-group-item"><b class="tx-uppercase">Solo</b></div>
            <ul class="pagination"><li class="page-item"><a class="page-link">next</a></li></ul>"#;
        assert_eq!(parser().parse(html).total_pages, 1);
    }

    #[test]
    fn empty_page() {
        let page = parser().parse("<html><body><p>Nothing found</p></body></html>");
        assert!(page.records.is_empty());
        assert_eq!(page.total_pages, 1);
    }
}
