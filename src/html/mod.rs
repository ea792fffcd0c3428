//! HTML parsing: metadata, content text, and link extraction
//!
//! One parse of the document feeds three consumers: the title and
//! description meta tag populate page metadata, the visible text (comments,
//! scripts, styles, and head content excluded) feeds the indexer, and the
//! `a[href]` targets resolved against the page's own URL become new crawl
//! tasks.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Everything the crawler needs from one parsed page.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from the first `<title>` tag).
    pub title: Option<String>,

    /// The description meta tag content, if present.
    pub description: Option<String>,

    /// Visible text content, for indexing.
    pub text: String,

    /// Absolute URLs of all extracted links, fragments stripped.
    pub links: Vec<String>,
}

/// Parses HTML content and extracts metadata, text, and links.
///
/// Relative links resolve against `base_url`. Individual links that fail to
/// parse or resolve are skipped; a malformed link never fails the page.
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        text: extract_text(&document),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the first `<title>` tag.
fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Extracts the content of `<meta name="description">`, if any.
fn extract_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name='description'][content]").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|description| !description.is_empty())
}

/// Elements whose text never counts as page content.
const NON_CONTENT: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Collects the visible text of the document, whitespace-joined. Comments
/// and non-content elements contribute nothing.
pub fn extract_text(document: &Html) -> String {
    let mut out = String::new();
    collect_text(document.root_element(), &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef, out: &mut String) {
    if NON_CONTENT.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        }
    }
}

/// Extracts all valid `a[href]` targets as absolute URLs.
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();
    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute) = resolve_link(href, base_url) {
                    links.push(absolute);
                }
            }
        }
    }
    links
}

/// Resolves an href to an absolute http(s) URL with the fragment stripped.
///
/// Returns None for links that should be excluded: javascript:/mailto:/
/// tel:/data: schemes, fragment-only anchors, unparseable hrefs, and
/// non-HTTP(S) results.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(mut absolute) => {
            if absolute.scheme() == "http" || absolute.scheme() == "https" {
                absolute.set_fragment(None);
                Some(absolute.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title>  Test Page  </title></head><body></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_extract_description() {
        let html = r#"<html><head><meta name="description" content="About cats"></head></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.description, Some("About cats".to_string()));
    }

    #[test]
    fn test_text_skips_scripts_comments_and_head() {
        let html = r#"
            <html>
            <head><title>Skipped</title><style>body { color: red }</style></head>
            <body>
                <!-- skipped comment -->
                <script>var skipped = 1;</script>
                <p>kept text</p>
                <div>more <b>kept</b></div>
            </body>
            </html>
        "#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.text, "kept text more kept");
    }

    #[test]
    fn test_extract_relative_link() {
        let html = r#"<html><body><a href="/other">Link</a></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links, vec!["https://example.com/other"]);
    }

    #[test]
    fn test_extract_path_relative_link() {
        let html = r#"<html><body><a href="other">Link</a></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links, vec!["https://example.com/other"]);
    }

    #[test]
    fn test_link_fragment_stripped() {
        let html = r#"<html><body><a href="/other#section">Link</a></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links, vec!["https://example.com/other"]);
    }

    #[test]
    fn test_skip_special_schemes_and_anchors() {
        let html = r##"
            <html><body>
                <a href="javascript:void(0)">js</a>
                <a href="mailto:a@b.com">mail</a>
                <a href="tel:+123">tel</a>
                <a href="data:text/html,x">data</a>
                <a href="#section">anchor</a>
                <a href="/valid">valid</a>
            </body></html>
        "##;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links, vec!["https://example.com/valid"]);
    }

    #[test]
    fn test_malformed_link_skipped_others_kept() {
        let html = r#"<html><body><a href="http://[bad">bad</a><a href="/ok">ok</a></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links, vec!["https://example.com/ok"]);
    }
}
