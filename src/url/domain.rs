use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use curio::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.trim_end_matches('.').to_lowercase())
        .filter(|h| !h.is_empty())
}

/// Checks whether a host is a literal address inside internal infrastructure
///
/// Blocks loopback, RFC 1918 private ranges, link-local, carrier-grade NAT,
/// unspecified and broadcast IPv4 addresses, and the IPv6 loopback,
/// unspecified, unique-local (`fc00::/7`) and link-local (`fe80::/10`)
/// ranges, including IPv4-mapped forms. Bracketed IPv6 literals are accepted.
///
/// Domain names are never blocked here; domain policy is the whitelist's job.
///
/// # Examples
///
/// ```
/// use curio::url::is_blocked_host;
///
/// assert!(is_blocked_host("127.0.0.1"));
/// assert!(is_blocked_host("[::1]"));
/// assert!(!is_blocked_host("example.com"));
/// ```
pub fn is_blocked_host(host: &str) -> bool {
    let literal = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    match literal.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_blocked_ipv4(ip),
        Ok(IpAddr::V6(ip)) => is_blocked_ipv6(ip),
        Err(_) => false,
    }
}

fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();

    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 0.0.0.0/8 "this network"
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xC0) == 64)
}

fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_blocked_ipv4(v4);
    }

    let first = ip.segments()[0];

    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}
