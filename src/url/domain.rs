use url::Url;

/// Extracts the lowercase host of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use gleaner::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Resolves the domain allow-list for a job
///
/// An explicit list wins. Otherwise the list is derived from the seed host
/// so same-site crawling works without configuration: the bare host, its
/// `www.` form, and the host as the caller typed it.
///
/// # Arguments
///
/// * `explicit` - The configured allow-list (may be empty)
/// * `raw_seed` - The seed URL as given by the caller
/// * `seed` - The parsed seed URL
pub fn resolve_allowed_domains(explicit: &[String], raw_seed: &str, seed: &Url) -> Vec<String> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }

    let Some(host) = seed.host_str() else {
        return Vec::new();
    };

    let bare = strip_www(&host.to_lowercase()).to_string();
    let mut domains = vec![bare.clone(), format!("www.{}", bare)];

    let original = original_host_casing(raw_seed, host).unwrap_or_else(|| host.to_string());
    if !domains.contains(&original) {
        domains.push(original);
    }

    domains
}

/// Removes a leading `www.` label
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Finds the host inside the raw seed string, preserving its casing
fn original_host_casing(raw_seed: &str, host: &str) -> Option<String> {
    let lowered = raw_seed.to_ascii_lowercase();
    let start = lowered.find(&host.to_ascii_lowercase())?;
    raw_seed.get(start..start + host.len()).map(str::to_string)
}
