use crate::UrlError;
use url::Url;

/// Normalizes a URL into the canonical form used for frontier dedup
///
/// Two URLs that normalize identically are the same page as far as a
/// campaign is concerned, so every URL is normalized before it touches
/// the seen-set or the crawled_pages table.
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject non-HTTP(S) schemes (javascript:, mailto:, ftp:, ...)
/// 3. Lowercase the host
/// 4. Strip the default port (:80 for http, :443 for https)
/// 5. Remove the fragment (everything after #)
/// 6. Collapse trailing slashes (but keep the root path as /)
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
/// use seine::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM:443/page/#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    // Step 1: Parse the URL. The url crate lowercases registered hosts and
    // drops default ports during parsing, which covers steps 3 and 4.
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    // Step 2: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    // Step 5: Remove fragment
    url.set_fragment(None);

    // Step 6: Collapse trailing slashes
    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            url.set_path("/");
        } else {
            url.set_path(&trimmed);
        }
    }

    Ok(url)
}

/// Resolves a possibly-relative link against its source page and normalizes it
///
/// Used for links extracted from HTML, where hrefs are routinely relative.
pub fn normalize_link(base: &Url, href: &str) -> Result<Url, UrlError> {
    let absolute = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_url(absolute.as_str())
}
