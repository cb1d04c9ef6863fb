//! URL handling module for Gleaner
//!
//! This module provides URL canonicalization (the crawl's sole dedup key),
//! domain extraction and allow-list resolution, and the visit policy.

mod domain;
mod normalize;
mod policy;

// Re-export main functions
pub use domain::{extract_domain, resolve_allowed_domains, strip_www};
pub use normalize::{normalize_parsed, normalize_url};
pub use policy::{is_allowed, matches_domain};
