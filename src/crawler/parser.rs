//! Link discovery on fetched pages
//!
//! Links are read from the original parsed page, never from the copy the
//! extractor strips, so navigation menus still feed the frontier.
//!
//! **Included:** `<a href>` anywhere in the page and `<link rel="canonical">`.
//!
//! **Excluded:** `javascript:`, `mailto:`, `tel:` and `data:` hrefs,
//! fragment-only anchors, `<a download>` and anything that does not resolve
//! to http(s).
//!
//! `rel="nofollow"` links are followed; whitelist and robots.txt decide what
//! actually gets crawled.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts absolute link targets from a parsed page
///
/// Relative links resolve against `<base href>` when present, else against
/// `page_url`. Duplicates are dropped, first occurrence wins.
pub fn discover_links(document: &Html, page_url: &Url) -> Vec<String> {
    let base = base_url(document, page_url);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |href: &str| {
        if let Some(absolute) = resolve_link(href, &base) {
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Parses `html` and extracts its links
pub fn parse_links(html: &str, page_url: &Url) -> Vec<String> {
    discover_links(&Html::parse_document(html), page_url)
}

fn base_url(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .filter_map(|el| el.value().attr("href"))
                .next()
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .filter(|base| matches!(base.scheme(), "http" | "https"))
        .unwrap_or_else(|| page_url.clone())
}

/// Resolves an href to an absolute http(s) URL, `None` if it must be skipped
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    matches!(absolute_url.scheme(), "http" | "https").then(|| absolute_url.to_string())
}
