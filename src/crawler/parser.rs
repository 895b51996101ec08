//! Link extraction for the recursive strategy's frontier

use scraper::{Html, Selector};
use url::Url;

/// Extracts followable links from an HTML body, resolved against the
/// page URL.
///
/// Skips `javascript:`, `mailto:`, `tel:` and data URIs, anchors with a
/// `download` attribute, and hrefs that fail to resolve.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return links,
    };

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }
        if let Some(href) = element.value().attr("href") {
            if let Some(absolute) = resolve_link(href, base_url) {
                links.push(absolute);
            }
        }
    }

    links
}

/// Resolves an href to an absolute HTTP(S) URL, or None if it should
/// be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let trimmed = href.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_lowercase();
    for prefix in ["javascript:", "mailto:", "tel:", "data:"] {
        if lower.starts_with(prefix) {
            return None;
        }
    }

    let resolved = base_url.join(trimmed).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    Some(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/").unwrap()
    }

    #[test]
    fn test_extracts_absolute_and_relative_links() {
        let html = r#"<html><body>
            <a href="https://example.com/a">A</a>
            <a href="guide">Guide</a>
            <a href="/api">API</a>
        </body></html>"#;
        let links = extract_links(html, &base());
        assert_eq!(
            links,
            vec![
                "https://example.com/a",
                "https://example.com/docs/guide",
                "https://example.com/api",
            ]
        );
    }

    #[test]
    fn test_skips_non_http_schemes() {
        let html = r#"<a href="mailto:x@y.z">m</a><a href="javascript:void(0)">j</a>
                      <a href="tel:123">t</a><a href="ftp://example.com/f">f</a>"#;
        assert!(extract_links(html, &base()).is_empty());
    }

    #[test]
    fn test_skips_download_links() {
        let html = r#"<a href="/file.zip" download>get</a>"#;
        assert!(extract_links(html, &base()).is_empty());
    }

    #[test]
    fn test_empty_html() {
        assert!(extract_links("", &base()).is_empty());
    }
}
