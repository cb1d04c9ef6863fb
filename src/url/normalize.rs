use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a URL into the canonical string used as the dedup key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Remove fragment (everything after #)
/// 3. Lowercase scheme and host
/// 4. Drop the port when it is the scheme default (80 for http, 443 for https)
/// 5. Normalize path:
///    - Empty path becomes /
///    - Trailing slashes are removed (except for root /)
///
/// The query string is kept as-is. Normalization is idempotent.
///
/// # Examples
///
/// ```
/// use gleaner::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.com:80/A/#top").unwrap();
/// assert_eq!(url, "http://example.com/A");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<String> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    Ok(normalize_parsed(url))
}

/// Normalizes an already parsed URL
///
/// The `url` crate lowercases scheme and host and drops default ports while
/// parsing, so only the fragment and path need attention here.
pub fn normalize_parsed(mut url: Url) -> String {
    url.set_fragment(None);

    let path = normalize_path(url.path());
    if path != url.path() {
        url.set_path(&path);
    }

    url.to_string()
}

/// Strips trailing slashes from non-root paths
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
