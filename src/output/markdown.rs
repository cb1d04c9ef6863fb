//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a crawl,
//! including statistics, the captured pages, and failures.

use crate::crawler::CrawlResult;
use crate::output::stats::CrawlStatistics;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Number of characters of each page's content quoted in the report
const EXCERPT_CHARS: usize = 200;

/// Writes a markdown summary of a crawl
///
/// # Arguments
///
/// * `result` - The finished crawl
/// * `output_path` - Path where the markdown file should be written
pub fn write_markdown_summary(result: &CrawlResult, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_summary(result);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl as markdown
pub fn format_markdown_summary(result: &CrawlResult) -> String {
    let stats = CrawlStatistics::from_result(result);
    let mut md = String::new();

    md.push_str("# Gleaner Crawl Summary\n\n");

    md.push_str("## Overview\n\n");
    md.push_str(&format!("- **Seed**: {}\n", result.url));
    md.push_str(&format!("- **Title**: {}\n", result.title));
    md.push_str(&format!("- **Pages Crawled**: {}\n", stats.pages_crawled));
    md.push_str(&format!("- **HTML Responses**: {}\n", stats.pages_found));
    md.push_str(&format!("- **Words Captured**: {}\n", stats.total_words));
    md.push_str(&format!("- **Products Found**: {}\n", stats.products));
    md.push_str(&format!(
        "- **Capture Rate**: {:.2}%\n\n",
        stats.capture_rate()
    ));

    md.push_str("## Pages\n\n");
    md.push_str("| URL | Title | Words | Status |\n");
    md.push_str("|-----|-------|-------|--------|\n");
    for page in &result.pages {
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            page.url,
            escape_cell(&page.title),
            page.word_count,
            page.status_code
        ));
    }
    md.push('\n');

    for page in &result.pages {
        md.push_str(&format!("### {}\n\n", page.url));
        md.push_str(&format!("> {}\n\n", excerpt(&page.content)));
    }

    if !result.products.is_empty() {
        md.push_str("## Products\n\n");
        md.push_str("| Name | Price | URL |\n");
        md.push_str("|------|-------|-----|\n");
        for product in &result.products {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                escape_cell(&product.name),
                product.price.as_deref().unwrap_or("-"),
                product.url
            ));
        }
        md.push('\n');
    }

    if !result.failures.is_empty() {
        md.push_str("## Failures\n\n");
        md.push_str("| URL | Kind | Status |\n");
        md.push_str("|-----|------|--------|\n");
        for failure in &result.failures {
            md.push_str(&format!(
                "| {} | {:?} | {} |\n",
                failure.url,
                failure.kind,
                failure
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string())
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn excerpt(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}
