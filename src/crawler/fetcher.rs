//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared transport with compression enabled
//! - A realistic browser header set on every request
//! - Skipping non-HTML responses
//! - Charset detection and transcoding to UTF-8

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE, REFERER,
    UPGRADE_INSECURE_REQUESTS,
};
use reqwest::{redirect::Policy, Client};
use std::error::Error as _;
use std::time::Duration;
use url::Url;

/// User agent sent by both the HTTP transport and the headless browser
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,\
     image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body, transcoded to UTF-8
        body: String,
    },

    /// Page is not HTML (Content-Type mismatch)
    NotHtml {
        /// The actual Content-Type received
        content_type: String,
    },

    /// The server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// The request failed before a usable response arrived
    TransportError {
        /// Error description, including the source chain
        error: String,
    },
}

/// HTTP transport shared by every request of a crawler
///
/// The transport is built once and handed to the crawler explicitly. The
/// underlying client decodes gzip, brotli and deflate bodies, advertising
/// them in `Accept-Encoding`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport with compression enabled and the browser user agent
    ///
    /// # Example
    ///
    /// ```no_run
    /// use gleaner::crawler::HttpTransport;
    ///
    /// let transport = HttpTransport::new().unwrap();
    /// ```
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(10))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { client })
    }

    /// Wraps an existing client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches a URL with the browser header set
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `timeout` - Per-request timeout
    ///
    /// # Returns
    ///
    /// A FetchResult indicating success or the type of failure
    pub async fn fetch(&self, url: &str, timeout: Duration) -> FetchResult {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return FetchResult::TransportError {
                    error: format!("invalid URL {}: {}", url, e),
                }
            }
        };

        let request = self
            .client
            .get(parsed.clone())
            .headers(browser_headers(&parsed))
            .timeout(timeout);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return FetchResult::TransportError {
                    error: describe_error(&e),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            return FetchResult::NotHtml { content_type };
        }

        match response.bytes().await {
            Ok(bytes) => FetchResult::Success {
                final_url,
                status_code: status.as_u16(),
                body: decode_body(&bytes, &content_type),
                content_type,
            },
            Err(e) => FetchResult::TransportError {
                error: describe_error(&e),
            },
        }
    }
}

/// Builds the browser-like request headers for `url`
///
/// The referer is the origin of the request itself so every request looks
/// like same-site navigation. `Accept-Encoding` is left to the client, which
/// advertises exactly the encodings it can decode. Cache-control and pragma
/// are never sent.
pub fn browser_headers(url: &Url) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    let static_headers: [(&'static str, &'static str); 7] = [
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("sec-fetch-user", "?1"),
        (
            "sec-ch-ua",
            r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#,
        ),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", r#""Windows""#),
    ];
    for (name, value) in static_headers {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    if let Some(host) = url.host_str() {
        let origin = match url.port() {
            Some(port) => format!("{}://{}:{}/", url.scheme(), host, port),
            None => format!("{}://{}/", url.scheme(), host),
        };
        if let Ok(value) = HeaderValue::from_str(&origin) {
            headers.insert(REFERER, value);
        }
    }

    headers
}

/// Checks whether a Content-Type denotes an HTML document
///
/// A missing Content-Type is treated as HTML.
pub fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}

/// Transcodes a response body to UTF-8
///
/// The charset comes from the Content-Type header, then from a `<meta>`
/// declaration in the first 1024 bytes, then defaults to UTF-8. A byte order
/// mark overrides all of these.
pub fn decode_body(bytes: &[u8], content_type: &str) -> String {
    let encoding = charset_from_content_type(content_type)
        .or_else(|| sniff_meta_charset(bytes))
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches(|c: char| c == '"' || c == '\''))
        })
        .and_then(|label| Encoding::for_label(label.as_bytes()))
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]).to_ascii_lowercase();
    let start = head.find("charset=")? + "charset=".len();

    let label: String = head[start..]
        .trim_start_matches(|c: char| c == '"' || c == '\'')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(*c, '-' | '_' | ':' | '.'))
        .collect();

    Encoding::for_label(label.as_bytes())
}

/// Flattens a reqwest error and its sources into one message
fn describe_error(error: &reqwest::Error) -> String {
    let mut message = if error.is_timeout() {
        format!("request timeout: {}", error)
    } else {
        error.to_string()
    };

    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    message
}
