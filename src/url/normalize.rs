use crate::UrlError;
use url::Url;

/// Tracking query parameters removed during normalization
///
/// Any `utm_*` parameter is removed as well.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "mc_eid", "mc_cid", "msclkid", "yclid", "_ga", "ref",
];

/// Normalizes a URL into its canonical form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not `http` or `https`
/// 3. Lowercase the host (parsing already drops default ports)
/// 4. Remove the fragment
/// 5. Remove trailing slashes from non-root paths
/// 6. Remove tracking query parameters, and the `?` if nothing is left
///
/// Remaining query parameters keep their order. Normalizing an already
/// canonical URL returns it unchanged.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Canonical URL
/// * `Err(UrlError)` - The URL is invalid and must be skipped
///
/// # Examples
///
/// ```
/// use curio::url::normalize_url;
///
/// let url = normalize_url("HTTPS://Docs.Example.COM:443/guide/?utm_source=x#intro").unwrap();
/// assert_eq!(url.as_str(), "https://docs.example.com/guide");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => return Err(UrlError::MissingDomain),
    };
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    url.set_fragment(None);

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&normalized);
    }

    if url.query().is_some() {
        strip_tracking_params(&mut url);
    }

    Ok(url)
}

/// Removes tracking parameters, re-serializing the query only when needed
fn strip_tracking_params(url: &mut Url) {
    let total = url.query_pairs().count();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else if kept.len() != total {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}
