//! URL handling module for Kumo-Crawl
//!
//! This module provides URL normalization for frontier de-duplication,
//! self-link detection, and request-URL classification.

mod normalize;
mod router;
mod self_link;

// Re-export main functions
pub use normalize::normalize_url;
pub use router::{classify_url, UrlKind};
pub use self_link::is_self_link;
