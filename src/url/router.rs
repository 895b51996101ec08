//! Request-URL classification
//!
//! Pure routing logic that decides which fetch strategy handles a crawl
//! request. No network calls happen here; classification looks only at
//! the URL path and the requested depth.

use url::Url;

/// File extensions treated as plain-text/markdown documents
const MARKDOWN_EXTENSIONS: &[&str] = &[".md", ".markdown", ".mdx", ".txt", ".rst"];

/// Sitemap file names recognized at the end of a URL path
const SITEMAP_SUFFIXES: &[&str] = &["sitemap.xml", "sitemap_index.xml", "sitemap-index.xml"];

/// The fetch pattern a request URL maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlKind {
    /// A plain-text or markdown file, fetched verbatim
    MarkdownFile,
    /// A sitemap (or sitemap index), expanded to a URL list and batch-fetched
    Sitemap,
    /// A page crawled recursively up to the requested depth
    Recursive,
    /// A single page fetch
    SinglePage,
}

impl UrlKind {
    /// Label recorded in progress metadata as `crawl_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarkdownFile => "markdown_file",
            Self::Sitemap => "sitemap",
            Self::Recursive => "recursive",
            Self::SinglePage => "single_page",
        }
    }
}

/// Classifies a request URL into the fetch strategy that should handle it.
///
/// Precedence (first match wins):
///
/// 1. Path ends in a recognized markdown/plain-text extension → [`UrlKind::MarkdownFile`]
/// 2. Path ends in `sitemap.xml` or a sitemap-index name → [`UrlKind::Sitemap`]
/// 3. `max_depth > 1` → [`UrlKind::Recursive`]
/// 4. Everything else (including unparseable URLs) → [`UrlKind::SinglePage`]
pub fn classify_url(raw_url: &str, max_depth: u32) -> UrlKind {
    let path = match Url::parse(raw_url) {
        Ok(url) => url.path().to_lowercase(),
        // Ambiguous input defaults to the most conservative strategy.
        Err(_) => return UrlKind::SinglePage,
    };

    if MARKDOWN_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return UrlKind::MarkdownFile;
    }

    if SITEMAP_SUFFIXES.iter().any(|name| path.ends_with(name)) {
        return UrlKind::Sitemap;
    }

    if max_depth > 1 {
        UrlKind::Recursive
    } else {
        UrlKind::SinglePage
    }
}
