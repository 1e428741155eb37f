//! Content extraction module
//!
//! Turns raw HTML into a title, normalized plain text, an excerpt and a
//! quality grade. The pipeline is:
//! - classify the page into a [`SiteType`] and look up its [`Strategy`]
//! - strip boilerplate and the strategy's widgets from a copy of the DOM
//! - take the first strategy container with enough text, else the densest
//!   block, else the whole body
//! - normalize, cap, summarize and grade the result

mod boilerplate;
mod density;
mod excerpt;
mod quality;
mod site_type;
mod text;
mod title;

pub use boilerplate::{remove_boilerplate, strip_elements};
pub use density::{densest_element, density_score};
pub use excerpt::make_excerpt;
pub use quality::{assess_quality, Issue, IssueLevel, Quality};
pub use site_type::{detect_type, SiteType, Strategy};
pub use text::{element_to_text, normalize_text, strip_code_blocks, truncate_content};
pub use title::{clean_title, extract_title, MAX_TITLE_CHARS};

use crate::config::ExtractionConfig;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Strategy candidates with less text than this are rejected
pub const MIN_CANDIDATE_CHARS: usize = 500;

/// Everything extracted from one page
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub quality: Quality,
    pub site_type: SiteType,
    pub issues: Vec<Issue>,
}

/// Parses `html` and extracts its content
///
/// # Example
///
/// ```
/// use curio::config::ExtractionConfig;
/// use curio::extract::{extract, Quality};
/// use url::Url;
///
/// let html = "<html><head><title>Not Found - Example</title></head>\
///             <body><p>404 not found</p></body></html>";
/// let url = Url::parse("https://example.com/missing").unwrap();
/// let page = extract(html, &url, &ExtractionConfig::default());
/// assert_eq!(page.title, "Not Found");
/// assert_eq!(page.quality, Quality::Low);
/// ```
pub fn extract(html: &str, url: &Url, config: &ExtractionConfig) -> ExtractedContent {
    let document = Html::parse_document(html);
    extract_document(&document, url, config)
}

/// Extracts content from an already parsed page
///
/// `document` is only read; all stripping happens on a copy, so the caller
/// can keep using it for link discovery.
pub fn extract_document(document: &Html, url: &Url, config: &ExtractionConfig) -> ExtractedContent {
    let site_type = detect_type(document, url);
    let strategy = site_type.strategy();

    let mut cleaned = remove_boilerplate(document);
    strip_elements(&mut cleaned, strategy.cleanup);

    let raw = if strategy.verbatim {
        verbatim_text(&cleaned)
    } else {
        strategy_text(&cleaned, strategy)
            .or_else(|| density_text(&cleaned))
            .unwrap_or_else(|| body_text(&cleaned))
    };

    let content = truncate_content(&raw, config.max_content_length);

    let mut title = extract_title(document, &content);
    if title.is_empty() {
        title = title_from_url(url);
    }

    let excerpt = make_excerpt(&content, config.excerpt_length);
    let (quality, issues) = assess_quality(&title, &content, config.min_content_length);

    debug!(
        "Extracted {} ({}): {} chars, quality {}",
        url,
        site_type,
        content.len(),
        quality
    );

    ExtractedContent {
        title,
        content,
        excerpt,
        quality,
        site_type,
        issues,
    }
}

/// Parses a hardcoded CSS selector, `None` if it is invalid
pub(crate) fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn strategy_text(document: &Html, strategy: &Strategy) -> Option<String> {
    for css in strategy.selectors {
        let Some(sel) = selector(css) else {
            continue;
        };

        for candidate in document.root_element().select(&sel) {
            let text = normalize_text(&element_to_text(candidate));
            if text.chars().count() >= MIN_CANDIDATE_CHARS {
                return Some(text);
            }
        }
    }
    None
}

fn density_text(document: &Html) -> Option<String> {
    let element = densest_element(document)?;
    let text = normalize_text(&element_to_text(element));
    (text.chars().count() >= density::MIN_DENSITY_CHARS).then_some(text)
}

fn body_text(document: &Html) -> String {
    let root = selector("body")
        .and_then(|sel| document.root_element().select(&sel).next())
        .unwrap_or_else(|| document.root_element());
    normalize_text(&element_to_text(root))
}

fn verbatim_text(document: &Html) -> String {
    let root = selector("body")
        .and_then(|sel| document.root_element().select(&sel).next())
        .unwrap_or_else(|| document.root_element());
    normalize_text(&root.text().collect::<String>())
}

fn title_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_default()
}
