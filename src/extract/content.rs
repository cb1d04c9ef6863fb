//! Main-content extraction
//!
//! Boilerplate is stripped from a clone of the parsed document so the
//! original stays intact for link discovery and product extraction.

use scraper::{ElementRef, Html, Selector};

/// Pages with fewer words than this are discarded
pub const MIN_WORD_COUNT: usize = 10;

/// An element's text must be longer than this (in bytes) to count as content
const MIN_CONTENT_LEN: usize = 100;

/// Elements removed before any text is read
const BOILERPLATE_SELECTOR: &str = "script, style, noscript, nav, footer, header, aside, \
     .nav, .navbar, .footer, .header, .sidebar, .advertisement, .ads, .skip-link";

/// Main-content candidates, most specific first
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    ".main-content",
    ".content",
    "#content",
    ".post",
    ".entry",
    "body",
];

/// Title and cleaned text of a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Trimmed text of the `<title>` element (empty when missing)
    pub title: String,

    /// Readable text, one non-blank line per line
    pub content: String,
}

impl ExtractedContent {
    /// Number of whitespace-separated words in the content
    pub fn word_count(&self) -> usize {
        word_count(&self.content)
    }

    /// Whether the content meets the minimum word threshold
    pub fn is_substantial(&self) -> bool {
        self.word_count() >= MIN_WORD_COUNT
    }
}

/// Extracts the title and main content of a parsed document
///
/// # Content Selection
///
/// Selectors are tried in order (`main`, `article`, `[role=main]`, common
/// class/id conventions, then `body`). The first selector with at least one
/// element whose text exceeds 100 characters wins, and the text of every such
/// element is concatenated. If nothing qualifies the whole body text is used.
///
/// # Example
///
/// ```
/// use gleaner::extract::extract;
/// use scraper::Html;
///
/// let html = Html::parse_document(
///     "<html><head><title> Docs </title></head><body><nav>Menu</nav><p>Hello</p></body></html>",
/// );
/// let extracted = extract(&html);
/// assert_eq!(extracted.title, "Docs");
/// assert_eq!(extracted.content, "Hello");
/// ```
pub fn extract(document: &Html) -> ExtractedContent {
    ExtractedContent {
        title: extract_title(document),
        content: extract_main_content(document),
    }
}

/// Returns the trimmed `<title>` text, or an empty string
pub fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Extracts cleaned main content from a copy of the document
pub fn extract_main_content(document: &Html) -> String {
    let cleaned = strip_boilerplate(document);
    let root = cleaned.root_element();

    let mut content = String::new();

    for css in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };

        for element in root.select(&selector) {
            let text = element_text(element);
            let text = text.trim();
            if text.len() > MIN_CONTENT_LEN {
                content.push_str(text);
                content.push_str("\n\n");
            }
        }

        if !content.is_empty() {
            break;
        }
    }

    if content.is_empty() {
        if let Ok(body) = Selector::parse("body") {
            for element in root.select(&body) {
                content.push_str(&element_text(element));
            }
        }
    }

    collapse_blank_lines(&content)
}

/// Counts whitespace-separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Returns a copy of the document with boilerplate elements detached
///
/// Detached nodes stay in the tree's arena, so callers must traverse from
/// `root_element()` rather than `Html::select` to skip them.
fn strip_boilerplate(document: &Html) -> Html {
    let mut cleaned = document.clone();

    let Ok(selector) = Selector::parse(BOILERPLATE_SELECTOR) else {
        return cleaned;
    };

    let ids: Vec<_> = cleaned
        .root_element()
        .select(&selector)
        .map(|element| element.id())
        .collect();

    for id in ids {
        if let Some(mut node) = cleaned.tree.get_mut(id) {
            node.detach();
        }
    }

    cleaned
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Trims every line, drops blank ones, and rejoins with single newlines
fn collapse_blank_lines(text: &str) -> String {
    text.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
