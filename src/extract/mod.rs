//! Content extraction for fetched documents
//!
//! - Main-content extraction with boilerplate removal
//! - Best-effort product records for e-commerce pages

mod content;
mod products;

pub use content::{
    extract, extract_main_content, extract_title, word_count, ExtractedContent, MIN_WORD_COUNT,
};
pub use products::{clean_price, extract_page_products, extract_product, extract_products, Product};
