use crate::UrlError;
use url::Url;

/// Normalizes a URL for frontier de-duplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or non-HTTP(S)
/// 2. Lowercase the host
/// 3. Strip the default port (80 for http, 443 for https)
/// 4. Remove trailing slash from the path (except for root /)
/// 5. Remove fragment (everything after #)
///
/// The query string is kept: two URLs that differ only in query
/// parameters are distinct crawl targets. Self-link comparison, which
/// ignores the query entirely, lives in [`crate::url::is_self_link`].
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use kumo_crawl::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM:443/page/#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // Lowercase the host
    match url.host_str() {
        Some(host) => {
            let lowered = host.to_lowercase();
            url.set_host(Some(&lowered))
                .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;
        }
        None => return Err(UrlError::MissingHost),
    }

    // Strip default ports. The url crate already treats an explicit
    // default port as no port, but be explicit for other parsers' output.
    if url.port() == Some(default_port(url.scheme())) {
        let _ = url.set_port(None);
    }

    // Remove trailing slash from the path, keeping the root
    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }

    url.set_fragment(None);

    Ok(url)
}

/// Returns the default port for a scheme (80 for http, 443 for https)
fn default_port(scheme: &str) -> u16 {
    if scheme == "http" {
        80
    } else {
        443
    }
}

/// Builds the comparison key used by self-link detection: normalized
/// scheme, host, and path only, with the query string dropped as well.
pub(crate) fn comparison_key(url_str: &str) -> Result<String, UrlError> {
    let mut url = normalize_url(url_str)?;
    url.set_query(None);
    Ok(url.to_string())
}
