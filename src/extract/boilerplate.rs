//! Boilerplate removal on a cloned DOM
//!
//! The parsed page is shared with link discovery, so stripping always happens
//! on a copy. Detached nodes stay in the arena but are unreachable from the
//! root element; callers must select through `root_element()`.

use scraper::Html;

use super::selector;

/// Page chrome, ads, banners and hidden elements
///
/// `<form>` itself is absent: some frameworks wrap the entire page in one.
/// Only its controls are dropped.
const BOILERPLATE: &[&str] = &[
    "script",
    "style",
    "noscript",
    "iframe",
    "svg",
    "canvas",
    "template",
    "select",
    "textarea",
    "button",
    "[role='search']",
    "nav",
    "header",
    "footer",
    "aside",
    "[role='navigation']",
    "[role='banner']",
    "[role='contentinfo']",
    "[role='complementary']",
    ".ad",
    ".ads",
    ".advert",
    ".advertisement",
    ".sponsored",
    "[id^='google_ads']",
    "[class*='ad-banner']",
    ".cookie-banner",
    ".cookie-notice",
    ".cookie-consent",
    "#cookie-consent",
    "#cookie-banner",
    ".gdpr",
    ".social-share",
    ".share-buttons",
    ".social-links",
    ".skip-link",
    ".popup",
    ".modal",
    "[hidden]",
    "[aria-hidden='true']",
    "[style*='display:none']",
    "[style*='display: none']",
    "[style*='visibility:hidden']",
    "[style*='visibility: hidden']",
];

/// Returns a copy of the document with the boilerplate catalogue removed
pub fn remove_boilerplate(document: &Html) -> Html {
    let mut cleaned = document.clone();
    strip_elements(&mut cleaned, BOILERPLATE);
    cleaned
}

/// Detaches every element matching one of `selectors`
///
/// Returns how many elements were removed. Selectors that fail to parse are
/// skipped.
pub fn strip_elements(document: &mut Html, selectors: &[&str]) -> usize {
    let mut removed = 0;

    for css in selectors {
        let Some(sel) = selector(css) else {
            continue;
        };

        let ids: Vec<_> = document.root_element().select(&sel).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
                removed += 1;
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_text(document: &Html) -> String {
        document.root_element().text().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_removes_structural_chrome() {
        let html = Html::parse_document(
            r#"<html><body>
                <nav>Menu</nav>
                <header>Site header</header>
                <p>Real content</p>
                <footer>Copyright</footer>
                <script>var x = 1;</script>
            </body></html>"#,
        );

        let text = body_text(&remove_boilerplate(&html));
        assert!(text.contains("Real content"));
        assert!(!text.contains("Menu"));
        assert!(!text.contains("Site header"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn test_page_wrapping_form_keeps_content() {
        let html = Html::parse_document(
            r#"<html><body><form id="aspnetForm" method="post">
                <div class="content"><p>Quarterly report for the harbour board</p></div>
                <select name="year"><option>2019</option></select>
                <button type="submit">Go</button>
            </form></body></html>"#,
        );

        let text = body_text(&remove_boilerplate(&html));
        assert!(text.contains("Quarterly report for the harbour board"));
        assert!(!text.contains("2019"));
        assert!(!text.contains("Go"));
    }

    #[test]
    fn test_removes_hidden_elements() {
        let html = Html::parse_document(
            r#"<html><body>
                <div hidden>Secret one</div>
                <div aria-hidden="true">Secret two</div>
                <div style="display: none">Secret three</div>
                <div class="cookie-banner">We use cookies</div>
                <p>Visible</p>
            </body></html>"#,
        );

        let text = body_text(&remove_boilerplate(&html));
        assert!(text.contains("Visible"));
        assert!(!text.contains("Secret"));
        assert!(!text.contains("cookies"));
    }

    #[test]
    fn test_original_is_not_mutated() {
        let html = Html::parse_document(
            r#"<html><body><nav><a href="/next">Next</a></nav><p>Body</p></body></html>"#,
        );
        let _cleaned = remove_boilerplate(&html);

        let nav = selector("nav a").unwrap();
        assert_eq!(html.root_element().select(&nav).count(), 1);
    }

    #[test]
    fn test_strip_elements_counts() {
        let mut html = Html::parse_document(
            r#"<html><body><div class="toc">1</div><div class="toc">2</div><p>x</p></body></html>"#,
        );
        assert_eq!(strip_elements(&mut html, &[".toc", "invalid((("]), 2);
        assert!(!body_text(&html).contains('1'));
    }
}
