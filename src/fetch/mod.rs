//! HTTP fetch layer
//!
//! Fetches a URL with redirects handled manually against an explicit
//! budget, and validates that the final response is HTML. Every failure
//! mode — network error, exhausted redirect budget, non-200 status, wrong
//! content type — collapses to "no result"; the crawler treats an empty
//! fetch as a skipped page, so nothing here is ever fatal.

use crate::FetchConfig;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use std::time::Duration;
use url::Url;

/// Default number of redirects to follow for a given URL.
pub const REDIRECT_LIMIT: usize = 3;

/// Builds the blocking HTTP client used by crawl workers.
///
/// Redirects are disabled on the client; [`fetch`] follows them itself so
/// the budget and the content-type gate stay under our control.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, following up to `max_redirects` redirects.
///
/// Returns the body as a single string with platform-independent line
/// endings when the final response is a 200 with an HTML content type.
/// Returns `None` if the URL does not parse, the redirect budget runs out
/// while the server is still redirecting, the final status is not 200, the
/// content type is not HTML, or any network error occurs.
pub fn fetch(client: &Client, url: &str, max_redirects: usize) -> Option<String> {
    let mut current = Url::parse(url).ok()?;
    let mut remaining = max_redirects;

    loop {
        tracing::trace!("Fetching {}", current);
        let response = match client.get(current.clone()).send() {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Fetch failed for {}: {}", current, e);
                return None;
            }
        };

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())?;
            if remaining == 0 {
                tracing::debug!("Redirect budget exhausted at {}", current);
                return None;
            }
            // Location may be relative; resolve against the current URL.
            current = current.join(location).ok()?;
            remaining -= 1;
            continue;
        }

        if status.as_u16() != 200 {
            tracing::debug!("Non-200 status {} for {}", status, current);
            return None;
        }

        if !is_html(response.headers().get(CONTENT_TYPE)?.to_str().ok()?) {
            tracing::debug!("Non-HTML content type for {}", current);
            return None;
        }

        let body = response.text().ok()?;
        return Some(body.replace("\r\n", "\n"));
    }
}

/// Returns true if a Content-Type header value indicates HTML.
fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}
