//! Best-effort product extraction for e-commerce style pages
//!
//! Nothing here is required to find anything: pages without product markup
//! simply yield an empty name or no records.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::Value;
use url::Url;

const NAME_SELECTORS: &[&str] = &[
    "h1.product-title",
    "h1.product-name",
    "h1[itemprop='name']",
    ".product-title",
    ".product-name",
    "h1",
];

const PRICE_SELECTORS: &[&str] = &[
    ".price",
    ".product-price",
    "[itemprop='price']",
    ".current-price",
    ".sale-price",
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    ".product-description",
    "[itemprop='description']",
    ".description",
];

const IMAGE_SELECTORS: &[&str] = &[
    ".product-image img",
    "[itemprop='image']",
    "img[itemprop='image']",
    ".main-image img",
];

const PRODUCT_PAGE_MARKERS: &str =
    "[itemtype*='schema.org/Product'], h1.product-title, h1.product-name, .product-detail";

const CARD_SELECTORS: &[&str] = &[".product-item", ".product-card", "[data-product-id]", ".product"];

const CARD_NAME_SELECTORS: &[&str] = &["h2", "h3", ".product-name", ".title", "[itemprop='name']"];

const CARD_PRICE_SELECTORS: &[&str] = &[".price", ".product-price", "[itemprop='price']"];

/// A product record scraped from a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub name: String,
    pub price: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub url: String,
    pub in_stock: Option<bool>,
    pub extracted_at: DateTime<Utc>,
}

impl Product {
    fn empty(url: &str) -> Self {
        Self {
            name: String::new(),
            price: None,
            sku: None,
            description: None,
            image_url: None,
            url: url.to_string(),
            in_stock: None,
            extracted_at: Utc::now(),
        }
    }
}

/// Extracts a single product from a product detail page
///
/// Visible markup is read first; JSON-LD structured data fills in the SKU
/// and any name, price, or description the markup did not provide.
pub fn extract_product(document: &Html, page_url: &str) -> Product {
    let mut product = Product::empty(page_url);
    let root = document.root_element();

    product.name = first_text(root, NAME_SELECTORS).unwrap_or_default();
    product.price = first_text(root, PRICE_SELECTORS).map(|p| clean_price(&p));

    for data in json_ld_objects(document) {
        if let Some(sku) = json_str(&data, "sku").or_else(|| json_str(&data, "mpn")) {
            product.sku = Some(sku);
        }
        if product.name.is_empty() {
            if let Some(name) = json_str(&data, "name") {
                product.name = name;
            }
        }
        if product.price.is_none() {
            product.price = json_price(&data);
        }
        if let Some(description) = json_str(&data, "description") {
            product.description = Some(description);
        }
    }

    if product.description.is_none() {
        product.description = first_text(root, DESCRIPTION_SELECTORS).or_else(|| meta_description(document));
    }

    product.image_url = first_image(root);
    product.in_stock = stock_status(root);

    product.name = product.name.trim().to_string();
    product.description = product
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    product
}

/// Extracts every named product card from a listing page
///
/// The first card selector with any match defines the cards. Card links are
/// resolved against `base_url`; cards without a name are dropped.
pub fn extract_products(document: &Html, base_url: &str) -> Vec<Product> {
    let root = document.root_element();
    let base = Url::parse(base_url).ok();

    let cards: Vec<ElementRef<'_>> = CARD_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .map(|selector| root.select(&selector).collect::<Vec<_>>())
        .find(|matches| !matches.is_empty())
        .unwrap_or_default();

    let mut products = Vec::new();

    for card in cards {
        let mut product = Product::empty(base_url);

        if let Some(href) = first_attr(card, "a", "href") {
            product.url = match &base {
                Some(base) => base
                    .join(&href)
                    .map(|u| u.to_string())
                    .unwrap_or(href),
                None => href,
            };
        }

        product.name = first_text(card, CARD_NAME_SELECTORS).unwrap_or_default();
        product.price = first_text(card, CARD_PRICE_SELECTORS).map(|p| clean_price(&p));

        if !product.name.is_empty() {
            products.push(product);
        }
    }

    products
}

/// Extracts whatever products a captured page holds
///
/// Listing cards win; otherwise a page carrying product detail markup
/// yields a single product. Pages with neither yield nothing.
pub fn extract_page_products(document: &Html, page_url: &str) -> Vec<Product> {
    let listing = extract_products(document, page_url);
    if !listing.is_empty() {
        return listing;
    }

    if !is_product_page(document) {
        return Vec::new();
    }

    let product = extract_product(document, page_url);
    if product.name.is_empty() {
        Vec::new()
    } else {
        vec![product]
    }
}

/// Checks for product detail markup or a JSON-LD `Product`
fn is_product_page(document: &Html) -> bool {
    let has_markup = Selector::parse(PRODUCT_PAGE_MARKERS)
        .map(|selector| document.root_element().select(&selector).next().is_some())
        .unwrap_or(false);

    has_markup
        || json_ld_objects(document)
            .iter()
            .any(|data| json_str(data, "@type").as_deref() == Some("Product"))
}

/// Strips currency symbols and thousands separators from a price
pub fn clean_price(price: &str) -> String {
    price
        .chars()
        .filter(|c| !matches!(*c, '$' | '€' | '£' | '₹' | ','))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Returns the trimmed text of the first non-empty match among the selectors
fn first_text(scope: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|selector| {
            scope
                .select(&selector)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|text| !text.is_empty())
        })
}

fn first_attr(scope: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    scope
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

fn first_image(scope: ElementRef<'_>) -> Option<String> {
    IMAGE_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|selector| {
            let element = scope.select(&selector).next()?;
            element
                .value()
                .attr("src")
                .or_else(|| element.value().attr("data-src"))
                .filter(|src| !src.is_empty())
                .map(str::to_string)
        })
}

fn stock_status(scope: ElementRef<'_>) -> Option<bool> {
    let any = |css: &str| {
        Selector::parse(css)
            .map(|selector| scope.select(&selector).next().is_some())
            .unwrap_or(false)
    };

    if any(".in-stock, .available, [data-in-stock='true']") {
        Some(true)
    } else if any(".out-of-stock, .unavailable, [data-in-stock='false']") {
        Some(false)
    } else {
        None
    }
}

fn meta_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name='description']").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

/// Parses every JSON-LD block that holds a JSON object
fn json_ld_objects(document: &Html) -> Vec<Value> {
    let Ok(selector) = Selector::parse("script[type='application/ld+json']") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|el| serde_json::from_str::<Value>(&el.text().collect::<String>()).ok())
        .filter(Value::is_object)
        .collect()
}

fn json_str(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

fn json_price(data: &Value) -> Option<String> {
    json_str(data, "price").or_else(|| data.get("offers").and_then(|offers| json_str(offers, "price")))
}
