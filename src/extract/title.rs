//! Title priority chain

use scraper::Html;

use super::selector;
use super::text::ELLIPSIS;

pub const MAX_TITLE_CHARS: usize = 150;

/// Separators that introduce a trailing site name, e.g. `Page - Site`
const SITE_SUFFIX_SEPARATORS: &[&str] = &[" - ", " | ", " — ", " – ", " · ", " :: "];

/// Picks the page title
///
/// Tries `<title>`, a sole `<h1>`, `og:title`, `twitter:title` and the first
/// `<h2>` in that order, then falls back to the opening line of `content`.
/// The result has its site suffix removed and is capped at 150 characters.
pub fn extract_title(document: &Html, content: &str) -> String {
    let candidates = [
        first_text(document, "title"),
        sole_h1(document),
        meta_content(document, "meta[property='og:title']"),
        meta_content(document, "meta[name='twitter:title']"),
        first_text(document, "h2"),
    ];

    let title = candidates
        .into_iter()
        .flatten()
        .map(|t| clean_title(&t))
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| title_from_content(content));

    cap_title(&title)
}

/// Collapses whitespace and removes a trailing site name
pub fn clean_title(raw: &str) -> String {
    let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let cut = SITE_SUFFIX_SEPARATORS
        .iter()
        .filter_map(|sep| title.rfind(sep))
        .max();

    match cut {
        Some(index) if !title[..index].trim().is_empty() => title[..index].trim().to_string(),
        _ => title,
    }
}

fn cap_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let keep = MAX_TITLE_CHARS - ELLIPSIS.len();
    let mut capped: String = title.chars().take(keep).collect();
    capped.truncate(capped.trim_end().len());
    capped.push_str(ELLIPSIS);
    capped
}

/// First line of the content, shortened to its first sentence
fn title_from_content(content: &str) -> String {
    let Some(line) = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("```"))
    else {
        return String::new();
    };

    let sentence_end = line
        .match_indices(['.', '?', '!'])
        .map(|(i, _)| i)
        .find(|&i| line[i + 1..].starts_with(' '));

    match sentence_end {
        Some(i) => line[..=i].to_string(),
        None => line.to_string(),
    }
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .root_element()
        .select(&sel)
        .map(|el| el.text().collect::<String>())
        .find(|text| !text.trim().is_empty())
}

fn sole_h1(document: &Html) -> Option<String> {
    let sel = selector("h1")?;
    let mut headings = document.root_element().select(&sel);
    let first = headings.next()?;
    if headings.next().is_some() {
        return None;
    }
    Some(first.text().collect())
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .root_element()
        .select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(str::to_string)
        .find(|content| !content.trim().is_empty())
}
