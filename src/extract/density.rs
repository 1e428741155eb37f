//! Text-density fallback for pages no strategy understands
//!
//! Every block element is scored as
//! `text_len / (tag_count + link_density * 20 + 1)` where
//! `link_density = link_count / (text_len / 100 + 1)`, so long runs of text
//! with little markup and few links win.

use scraper::{ElementRef, Html};

use super::selector;

pub const MIN_DENSITY_SCORE: f64 = 5.0;
pub const MIN_DENSITY_CHARS: usize = 100;

const CANDIDATES: &str = "div, section, article, main, td, blockquote";

/// Score of one element
pub fn density_score(element: ElementRef<'_>) -> f64 {
    let text_len = visible_len(element) as f64;
    let mut tag_count = 0usize;
    let mut link_count = 0usize;

    for node in element.descendants().skip(1) {
        if let Some(child) = ElementRef::wrap(node) {
            tag_count += 1;
            if child.value().name() == "a" {
                link_count += 1;
            }
        }
    }

    let link_density = link_count as f64 / (text_len / 100.0 + 1.0);
    text_len / (tag_count as f64 + link_density * 20.0 + 1.0)
}

/// Finds the densest block element above the score and length thresholds
pub fn densest_element(document: &Html) -> Option<ElementRef<'_>> {
    let sel = selector(CANDIDATES)?;

    document
        .root_element()
        .select(&sel)
        .filter(|el| visible_len(*el) >= MIN_DENSITY_CHARS)
        .map(|el| (density_score(el), el))
        .filter(|(score, _)| *score >= MIN_DENSITY_SCORE)
        .fold(None, |best: Option<(f64, ElementRef<'_>)>, (score, el)| match best {
            Some((best_score, _)) if best_score >= score => best,
            _ => Some((score, el)),
        })
        .map(|(_, el)| el)
}

fn visible_len(element: ElementRef<'_>) -> usize {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .map(|word| word.chars().count() + 1)
        .sum::<usize>()
        .saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_text_over_link_lists() {
        let links: String = (0..30)
            .map(|i| format!("<li><a href=\"/p{}\">Link number {}</a></li>", i, i))
            .collect();
        let prose = "This paragraph carries the actual article text. ".repeat(10);
        let html = format!(
            r#"<html><body><div id="links"><ul>{}</ul></div><div id="story"><p>{}</p></div></body></html>"#,
            links, prose
        );
        let document = Html::parse_document(&html);

        let best = densest_element(&document).unwrap();
        assert_eq!(best.value().attr("id"), Some("story"));
    }

    #[test]
    fn test_short_elements_are_ignored() {
        let document = Html::parse_document("<html><body><div>tiny</div></body></html>");
        assert!(densest_element(&document).is_none());
    }

    #[test]
    fn test_score_formula() {
        let document = Html::parse_document(&format!(
            "<html><body><div id=\"d\">{}</div></body></html>",
            "a".repeat(200)
        ));
        let sel = selector("#d").unwrap();
        let div = document.root_element().select(&sel).next().unwrap();
        // 200 chars, no child tags, no links
        assert!((density_score(div) - 200.0).abs() < f64::EPSILON);
    }
}
