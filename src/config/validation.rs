use crate::config::types::CrawlConfig;
use crate::{ConfigError, ConfigResult, UrlError, UrlResult};
use url::Url;

/// Validates a crawl configuration
pub fn validate(config: &CrawlConfig) -> ConfigResult<()> {
    if config.max_pages == 0 {
        return Err(ConfigError::Validation(
            "max_pages must be greater than 0".to_string(),
        ));
    }

    validate_seed(&config.url)?;

    for domain in &config.allowed_domains {
        if domain.trim().is_empty() {
            return Err(ConfigError::Validation(
                "allowed_domains cannot contain empty entries".to_string(),
            ));
        }
    }

    for prefix in &config.allowed_paths {
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "allowed path prefix '{}' must start with '/'",
                prefix
            )));
        }
    }

    if config.politeness.parallelism < 1 {
        return Err(ConfigError::Validation(
            "politeness.parallelism must be >= 1".to_string(),
        ));
    }

    if config.politeness.max_concurrency < 1 {
        return Err(ConfigError::Validation(
            "politeness.max_concurrency must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Adds a default `https://` scheme to a seed URL that has none
///
/// `example.com/docs` parses as a relative reference, so a seed typed
/// without a scheme is repaired before it ever reaches the URL parser.
pub fn repair_seed_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    }
}

fn validate_seed(raw: &str) -> ConfigResult<()> {
    if raw.trim().is_empty() {
        return Err(ConfigError::Validation("url cannot be empty".to_string()));
    }

    parse_seed(raw)?;
    Ok(())
}

/// Repairs and parses a seed URL
///
/// The seed must have a host and an `http` or `https` scheme.
pub fn parse_seed(raw: &str) -> UrlResult<Url> {
    let repaired = repair_seed_url(raw);
    let url = Url::parse(&repaired).map_err(|e| UrlError::Parse(format!("{}: {}", repaired, e)))?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    Ok(url)
}
