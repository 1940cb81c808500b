use url::Url;

/// Accepts a URL or bare domain and returns the lowercase host
///
/// Policy rows and allowed-domain lists are entered by operators, who paste
/// anything from `Example.com` to `https://shop.example.com/path`. All of it
/// funnels through here before comparison.
pub fn normalize_domain(value: &str) -> String {
    let candidate = value.trim().to_lowercase();
    let with_scheme = if candidate.contains("://") {
        candidate.clone()
    } else {
        format!("https://{}", candidate)
    };

    match Url::parse(&with_scheme) {
        Ok(url) => url
            .host_str()
            .map(|h| h.trim_start_matches('.').to_string())
            .unwrap_or(candidate),
        Err(_) => candidate.trim_start_matches('.').to_string(),
    }
}

/// Returns true if `host` is `domain` or a subdomain of it
///
/// Matching is on label boundaries: `shop.example.com` matches
/// `example.com`, but `notexample.com` does not.
pub fn domain_suffix_match(host: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Approximates the registrable domain of a host
///
/// Takes the two rightmost labels; multi-part public suffixes (co.uk)
/// are not special-cased. IP hosts are returned whole.
pub fn registrable_domain(host: &str) -> String {
    if host.parse::<std::net::IpAddr>().is_ok() {
        return host.to_string();
    }

    let labels: Vec<&str> = host.rsplitn(3, '.').collect();
    if labels.len() < 2 {
        return host.to_string();
    }
    format!("{}.{}", labels[1], labels[0])
}

/// Domain scope of a single campaign
///
/// With an explicit allowed-domain list, a candidate is in scope when its
/// host suffix-matches any entry. Without one, it must share a registrable
/// domain with one of the campaign's seeds.
#[derive(Debug, Clone)]
pub struct CampaignScope {
    allowed: Option<Vec<String>>,
    seed_domains: Vec<String>,
}

impl CampaignScope {
    /// Builds a scope from a campaign's allowed-domain list and seed URLs
    ///
    /// Unparseable seeds contribute nothing to the scope; creation-time
    /// validation rejects campaigns with no parseable seeds at all.
    pub fn new(allowed_domains: Option<&[String]>, seed_urls: &[Url]) -> Self {
        let allowed = allowed_domains.map(|domains| {
            domains
                .iter()
                .map(|d| normalize_domain(d))
                .filter(|d| !d.is_empty())
                .collect()
        });

        let seed_domains = seed_urls
            .iter()
            .filter_map(|u| u.host_str())
            .map(registrable_domain)
            .collect();

        Self {
            allowed,
            seed_domains,
        }
    }

    /// Returns true if the URL is within this campaign's crawl scope
    pub fn admits(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_lowercase();

        match &self.allowed {
            Some(domains) => domains.iter().any(|d| domain_suffix_match(&host, d)),
            None => {
                let candidate = registrable_domain(&host);
                self.seed_domains.iter().any(|d| d == &candidate)
            }
        }
    }
}
