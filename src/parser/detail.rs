use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::model::NO_DATA;

static LEVEL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".level-circle.level-value").unwrap());
static LEVEL_LIKE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[class*="level"]"#).unwrap());

/// Extracts the quality level from a journal's detail page.
///
/// The dedicated indicator wins when it carries digits; otherwise the first
/// element with "level" in its class that carries digits. Returns the
/// sentinel when nothing qualifies.
pub fn parse_level(html: &str) -> String {
    let doc = Html::parse_document(html);

    let primary = doc.select(&LEVEL_SEL).next().and_then(digits_of);
    primary
        .or_else(|| doc.select(&LEVEL_LIKE_SEL).find_map(digits_of))
        .unwrap_or_else(|| NO_DATA.to_string())
}

fn digits_of(el: ElementRef<'_>) -> Option<String> {
    let digits: String = el
        .text()
        .flat_map(str::chars)
        .filter(char::is_ascii_digit)
        .collect();
    (!digits.is_empty()).then_some(digits)
}
