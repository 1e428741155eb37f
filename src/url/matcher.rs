use url::Url;

/// Checks if a host equals a domain or is one of its subdomains
///
/// Matching is case-insensitive and happens on a `.` boundary, so
/// `notexample.com` does not match `example.com`.
///
/// # Examples
///
/// ```
/// use curio::url::matches_domain;
///
/// assert!(matches_domain("example.com", "example.com"));
/// assert!(matches_domain("example.com", "Docs.Example.com"));
/// assert!(!matches_domain("example.com", "notexample.com"));
/// ```
pub fn matches_domain(domain: &str, host: &str) -> bool {
    let domain = domain.trim_end_matches('.').to_lowercase();
    let host = host.trim_end_matches('.').to_lowercase();

    if domain.is_empty() || host.is_empty() {
        return false;
    }

    host == domain
        || host
            .strip_suffix(&domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Checks whether a URL's host is covered by the domain whitelist
///
/// Unparseable URLs and URLs without a host are never whitelisted.
///
/// # Examples
///
/// ```
/// use curio::url::is_whitelisted;
///
/// let whitelist = vec!["example.com".to_string()];
/// assert!(is_whitelisted("https://docs.example.com/x", &whitelist));
/// assert!(!is_whitelisted("https://notexample.com/x", &whitelist));
/// ```
pub fn is_whitelisted(url: &str, domains: &[String]) -> bool {
    match Url::parse(url) {
        Ok(parsed) => is_url_whitelisted(&parsed, domains),
        Err(_) => false,
    }
}

/// Same as [`is_whitelisted`] for an already parsed URL
pub fn is_url_whitelisted(url: &Url, domains: &[String]) -> bool {
    url.host_str()
        .is_some_and(|host| is_host_whitelisted(host, domains))
}

/// Checks a bare host against the whitelist
pub fn is_host_whitelisted(host: &str, domains: &[String]) -> bool {
    domains.iter().any(|domain| matches_domain(domain, host))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whitelist() -> Vec<String> {
        vec!["example.com".to_string()]
    }

    #[test]
    fn test_exact_match() {
        assert!(matches_domain("example.com", "example.com"));
        assert!(matches_domain("blog.example.com", "blog.example.com"));
    }

    #[test]
    fn test_subdomains_match() {
        assert!(matches_domain("example.com", "blog.example.com"));
        assert!(matches_domain("example.com", "api.v2.example.com"));
    }

    #[test]
    fn test_parent_does_not_match_child_entry() {
        assert!(!matches_domain("blog.example.com", "example.com"));
    }

    #[test]
    fn test_no_match_on_partial_label() {
        assert!(!matches_domain("example.com", "notexample.com"));
        assert!(!matches_domain("example.com", "myexample.com"));
        assert!(!matches_domain("example.com", "example.com.org"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches_domain("Example.COM", "example.com"));
        assert!(matches_domain("example.com", "DOCS.EXAMPLE.COM"));
    }

    #[test]
    fn test_empty_strings() {
        assert!(!matches_domain("example.com", ""));
        assert!(!matches_domain("", "example.com"));
        assert!(!matches_domain("", ""));
    }

    #[test]
    fn test_is_whitelisted_urls() {
        let domains = whitelist();
        assert!(is_whitelisted("https://example.com/x", &domains));
        assert!(is_whitelisted("https://docs.example.com/x", &domains));
        assert!(!is_whitelisted("https://notexample.com/x", &domains));
        assert!(!is_whitelisted("https://example.org/x", &domains));
    }

    #[test]
    fn test_is_whitelisted_invalid_url() {
        let domains = whitelist();
        assert!(!is_whitelisted("not a url", &domains));
        assert!(!is_whitelisted("mailto:someone@example.com", &domains));
    }

    #[test]
    fn test_empty_whitelist_allows_nothing() {
        assert!(!is_whitelisted("https://example.com/", &[]));
    }
}
