//! Configuration module for Gleaner
//!
//! A crawl job is described by a [`CrawlConfig`], built in code or loaded
//! from a TOML file and validated before the job starts.
//!
//! # Example
//!
//! ```no_run
//! use gleaner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawling {} (budget {})", config.url, config.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CrawlConfig, PolitenessConfig, DEFAULT_MAX_PAGES, DEFAULT_NETWORK_IDLE_MS,
    DEFAULT_RENDER_TIMEOUT_MS, DEFAULT_TIMEOUT_MS,
};

// Re-export parser and validation functions
pub use parser::{load_config, parse_config, read_config};
pub use validation::{parse_seed, repair_seed_url, validate};
