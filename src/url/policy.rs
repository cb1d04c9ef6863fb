use crate::config::CrawlConfig;
use crate::url::domain::strip_www;
use url::Url;

/// Path and query fragments that never lead to readable pages
const EXCLUDED_PATTERNS: &[&str] = &[
    "/wp-json/",
    "/api/",
    "/ajax/",
    ".pdf",
    ".jpg",
    ".jpeg",
    ".png",
    ".gif",
    ".svg",
    ".css",
    ".js",
    ".xml",
    "/feed/",
    "/rss/",
    "/atom/",
    "/search?",
    "/?s=",
    "/wp-admin/",
    "/wp-includes/",
];

/// Decides whether a normalized URL may be visited
///
/// A URL must pass every check:
///
/// 1. Scheme is `http` or `https`
/// 2. Host (case-folded, `www.`-stripped) equals an allowed domain or is a
///    subdomain of one
/// 3. Path starts with one of the configured prefixes, if any are set
/// 4. Neither path nor query contains an excluded pattern
///
/// # Arguments
///
/// * `normalized` - The canonical URL string
/// * `config` - The crawl configuration (path prefixes)
/// * `allowed_domains` - The job's resolved domain allow-list
///
/// # Examples
///
/// ```
/// use gleaner::config::CrawlConfig;
/// use gleaner::url::is_allowed;
///
/// let config = CrawlConfig::new("https://example.com/");
/// let domains = vec!["example.com".to_string()];
/// assert!(is_allowed("https://blog.example.com/post", &config, &domains));
/// assert!(!is_allowed("https://other.com/post", &config, &domains));
/// ```
pub fn is_allowed(normalized: &str, config: &CrawlConfig, allowed_domains: &[String]) -> bool {
    let Ok(url) = Url::parse(normalized) else {
        return false;
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    if !allowed_domains.is_empty() {
        let host = url.host_str().unwrap_or_default().to_lowercase();
        if !allowed_domains
            .iter()
            .any(|domain| matches_domain(domain, &host))
        {
            return false;
        }
    }

    if !config.allowed_paths.is_empty()
        && !config
            .allowed_paths
            .iter()
            .any(|prefix| url.path().starts_with(prefix.as_str()))
    {
        return false;
    }

    !is_excluded(&url)
}

/// Checks if a host equals an allowed domain or is one of its subdomains
///
/// Both sides are compared case-folded with any leading `www.` removed, so
/// `www.example.com` and `example.com` grant each other.
pub fn matches_domain(allowed: &str, host: &str) -> bool {
    let allowed = allowed.to_lowercase();
    let allowed = strip_www(&allowed);
    let host = host.to_lowercase();
    let host = strip_www(&host);

    if allowed.is_empty() || host.is_empty() {
        return false;
    }

    host == allowed || host.ends_with(&format!(".{}", allowed))
}

/// Checks the path and query against the exclusion list
///
/// Canonical URLs have no trailing slash, so directory patterns are matched
/// against the path with one appended. Query patterns such as `/?s=` are
/// matched against the path joined to its query.
fn is_excluded(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    let directory = if path.ends_with('/') {
        path.clone()
    } else {
        format!("{}/", path)
    };
    let request = match url.query() {
        Some(query) => format!("{}?{}", path, query.to_lowercase()),
        None => path.clone(),
    };

    EXCLUDED_PATTERNS
        .iter()
        .any(|pattern| directory.contains(pattern) || request.contains(pattern))
}
