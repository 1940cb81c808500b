//! Anti-bot block detection
//!
//! Detection is two-pronged: the handful of HTTP statuses CDNs and
//! rate limiters answer denials with, and body markers that catch
//! challenge pages served with a 200. The marker list is data rather
//! than an enum so operators can extend it from config as vendors
//! change their wording.

/// HTTP statuses treated as blocks rather than plain errors
pub const BLOCK_STATUSES: [u16; 3] = [403, 429, 503];

/// Challenge phrasings looked for in response bodies, lowercase
const DEFAULT_MARKERS: [&str; 8] = [
    "just a moment",
    "checking your browser",
    "attention required",
    "cf-browser-verification",
    "captcha",
    "are you a robot",
    "access denied",
    "unusual traffic",
];

/// Classifies fetch responses as blocked or not
pub struct BlockDetector {
    markers: Vec<String>,
}

impl BlockDetector {
    /// Creates a detector with the built-in markers plus any extras
    ///
    /// # Arguments
    ///
    /// * `extra_markers` - Additional body markers from configuration
    pub fn new(extra_markers: &[String]) -> Self {
        let mut markers: Vec<String> = DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect();
        markers.extend(extra_markers.iter().map(|m| m.trim().to_lowercase()));
        markers.retain(|m| !m.is_empty());
        Self { markers }
    }

    /// Classifies a response, returning the block reason if it is one
    ///
    /// # Arguments
    ///
    /// * `http_status` - Status code when the transport surfaced one
    /// * `body` - Response body
    ///
    /// # Returns
    ///
    /// * `Some(reason)` - The response is a block
    /// * `None` - The response is a regular success or failure
    pub fn classify(&self, http_status: Option<u16>, body: &str) -> Option<String> {
        if let Some(status) = http_status {
            if BLOCK_STATUSES.contains(&status) {
                return Some(format!("http status {}", status));
            }
        }

        // Challenge pages are served with a 200, so the body scan runs
        // regardless of status
        let haystack = body.to_lowercase();
        self.markers
            .iter()
            .find(|marker| haystack.contains(marker.as_str()))
            .map(|marker| format!("challenge marker '{}'", marker))
    }
}

impl Default for BlockDetector {
    fn default() -> Self {
        Self::new(&[])
    }
}
