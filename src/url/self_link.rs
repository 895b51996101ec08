use super::normalize::comparison_key;

/// Checks whether a discovered link resolves to the page currently
/// being crawled.
///
/// Comparison is done on a normalized form of both URLs: lowercased
/// scheme and host, default ports (80/443) stripped, trailing slash
/// removed from the path, and query string and fragment ignored
/// entirely. Two URLs are self-links iff the normalized
/// scheme + host + path match.
///
/// If either URL fails to parse, the comparison degrades to raw string
/// equality instead of erroring. A garbled href should never abort a
/// crawl, only fail the self-link check conservatively.
///
/// # Examples
///
/// ```
/// use kumo_crawl::url::is_self_link;
///
/// assert!(is_self_link("https://EX.com:443/a/", "https://ex.com/a"));
/// assert!(is_self_link("https://ex.com/a?x=1#y", "https://ex.com/a"));
/// assert!(!is_self_link("https://ex.com/b", "https://ex.com/a"));
/// ```
pub fn is_self_link(candidate: &str, base: &str) -> bool {
    match (comparison_key(candidate), comparison_key(base)) {
        (Ok(c), Ok(b)) => c == b,
        _ => candidate == base,
    }
}
