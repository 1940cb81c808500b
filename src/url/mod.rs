//! URL handling for Seine
//!
//! This module provides URL normalization (the canonical form used for
//! frontier dedup) and campaign domain scoping.

mod normalize;
mod scope;

// Re-export main functions
pub use normalize::{normalize_link, normalize_url};
pub use scope::{domain_suffix_match, normalize_domain, registrable_domain, CampaignScope};

use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use seine::url::extract_host;
///
/// let url = Url::parse("https://Shop.Example.com/path").unwrap();
/// assert_eq!(extract_host(&url), Some("shop.example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_host(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_extract_host_with_port() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(extract_host(&url), Some("127.0.0.1".to_string()));
    }
}
