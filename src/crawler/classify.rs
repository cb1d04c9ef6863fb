//! Fetch failure classification
//!
//! Maps an HTTP status or transport error into a failure kind and decides
//! whether it is terminal for the job. Only failures of the seed URL can be
//! terminal; followed links never abort a crawl.
//!
//! | Condition | Kind | Terminal |
//! |-----------|------|----------|
//! | HTTP 403 | Blocked | seed only |
//! | HTTP 429 | RateLimited | seed only |
//! | HTTP 5xx | OriginServerError | seed only |
//! | "already visited" | DuplicateSignal | never |
//! | timeout / unresolved host | NetworkError | seed only |
//! | anything else | Other | seed only |

use crate::CrawlError;
use serde::Serialize;

/// Transport error fragments that indicate a network-level failure
const NETWORK_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "no such host",
    "dns error",
    "failed to lookup address",
];

/// Category of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// HTTP 403
    Blocked,
    /// HTTP 429
    RateLimited,
    /// HTTP 5xx
    OriginServerError,
    /// Timeout or DNS failure
    NetworkError,
    /// The fetcher reported the URL as already visited
    DuplicateSignal,
    /// Any other HTTP or transport failure
    Other,
}

/// Classification of one failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub kind: FailureKind,

    /// Whether the failure is a candidate for failing the whole job
    pub terminal: bool,
}

/// Classifies a failed fetch
///
/// # Arguments
///
/// * `status` - The HTTP status code, if a response was received
/// * `transport_error` - The transport error message, if the request failed
/// * `is_seed` - Whether the failed URL is the job's seed URL
///
/// # Example
///
/// ```
/// use gleaner::crawler::{classify, FailureKind};
///
/// let outcome = classify(Some(403), None, true);
/// assert_eq!(outcome.kind, FailureKind::Blocked);
/// assert!(outcome.terminal);
///
/// let outcome = classify(Some(403), None, false);
/// assert!(!outcome.terminal);
/// ```
pub fn classify(status: Option<u16>, transport_error: Option<&str>, is_seed: bool) -> Outcome {
    let kind = match status {
        Some(403) => FailureKind::Blocked,
        Some(429) => FailureKind::RateLimited,
        Some(code) if code >= 500 => FailureKind::OriginServerError,
        _ => classify_transport(transport_error),
    };

    let terminal = is_seed && kind != FailureKind::DuplicateSignal;

    Outcome { kind, terminal }
}

fn classify_transport(transport_error: Option<&str>) -> FailureKind {
    let Some(message) = transport_error else {
        return FailureKind::Other;
    };
    let message = message.to_lowercase();

    if message.contains("already visited") {
        FailureKind::DuplicateSignal
    } else if NETWORK_MARKERS.iter().any(|marker| message.contains(marker)) {
        FailureKind::NetworkError
    } else {
        FailureKind::Other
    }
}

/// Builds the job-level error for a terminal seed failure
pub fn terminal_error(
    kind: FailureKind,
    url: &str,
    status: Option<u16>,
    message: Option<&str>,
) -> CrawlError {
    let url = url.to_string();
    match (kind, status) {
        (FailureKind::Blocked, _) => CrawlError::Blocked { url },
        (FailureKind::RateLimited, _) => CrawlError::RateLimited { url },
        (FailureKind::OriginServerError, Some(status)) => CrawlError::OriginServer { url, status },
        (FailureKind::NetworkError, _) => CrawlError::Network {
            url,
            message: message.unwrap_or("connection failed").to_string(),
        },
        (_, Some(status)) => CrawlError::Http { url, status },
        _ => CrawlError::SeedFailed {
            url,
            message: message.unwrap_or("unknown error").to_string(),
        },
    }
}
