//! Outbound link discovery
//!
//! Extracts `<a href>` targets from a parsed document and resolves them to
//! absolute URLs. Anchors, `javascript:`, `mailto:`, `tel:` and `data:`
//! targets are skipped.

use scraper::{Html, Selector};
use url::Url;

/// Extracts absolute outbound link targets in document order
///
/// # Example
///
/// ```
/// use gleaner::crawler::discover_links;
/// use scraper::Html;
/// use url::Url;
///
/// let html = Html::parse_document(r#"<a href="/page">Link</a><a href="mailto:x@y.z">Mail</a>"#);
/// let base = Url::parse("https://example.com/docs/").unwrap();
/// assert_eq!(discover_links(&html, &base), vec!["https://example.com/page"]);
/// ```
pub fn discover_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: schemes and data: URIs
/// - hrefs that do not resolve against the base URL
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    base_url.join(href).ok().map(|url| url.to_string())
}
