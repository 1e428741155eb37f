//! Element-to-text conversion and whitespace normalization

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node};

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?```").expect("Invalid fenced block regex"));

static HORIZONTAL_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new("[ \t\u{a0}\u{2000}-\u{200a}\u{3000}]+").expect("Invalid space regex"));

pub(crate) const ELLIPSIS: &str = "...";

/// Elements that start and end a paragraph
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "blockquote",
    "dd",
    "details",
    "div",
    "dl",
    "dt",
    "figcaption",
    "figure",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "li",
    "main",
    "ol",
    "p",
    "section",
    "summary",
    "table",
    "tr",
    "ul",
];

/// Zero-width and other invisible characters
const INVISIBLE: &[char] = &[
    '\u{200b}', '\u{200c}', '\u{200d}', '\u{2060}', '\u{feff}', '\u{00ad}',
];

/// Converts an element subtree to plain text
///
/// `<pre>` becomes a fenced block, `<code>` outside `<pre>` becomes inline
/// backticks, `<br>` a newline and block elements paragraph breaks. Text
/// nodes are copied as-is apart from source line breaks.
pub fn element_to_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    write_element(element, &mut out);
    out
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    match element.value().name() {
        "pre" => {
            let code: String = element.text().collect();
            let code = code.trim_matches(|c| c == '\n' || c == '\r').trim_end();
            if !code.trim().is_empty() {
                out.push_str("\n\n```\n");
                out.push_str(code);
                out.push_str("\n```\n\n");
            }
        }
        "code" => {
            let code: String = element.text().collect();
            let code = code.trim();
            if !code.is_empty() {
                out.push('`');
                out.push_str(code);
                out.push('`');
            }
        }
        "br" => out.push('\n'),
        name if BLOCK_ELEMENTS.contains(&name) => {
            out.push_str("\n\n");
            write_children(element, out);
            out.push_str("\n\n");
        }
        _ => write_children(element, out),
    }
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            write_element(child_element, out);
        } else if let Node::Text(text) = child.value() {
            let text: &str = text;
            out.extend(text.chars().map(|c| match c {
                '\n' | '\r' | '\t' => ' ',
                other => other,
            }));
        }
    }
}

/// Normalizes extracted text, leaving fenced code blocks untouched
///
/// Prose segments get invisible characters stripped, runs of spaces collapsed
/// to one, lines trimmed and consecutive blank lines merged into a single
/// paragraph break.
pub fn normalize_text(raw: &str) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut last = 0;

    for block in FENCED_BLOCK.find_iter(raw) {
        segments.push(normalize_prose(&raw[last..block.start()]));
        segments.push(block.as_str().to_string());
        last = block.end();
    }
    segments.push(normalize_prose(&raw[last..]));

    segments
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn normalize_prose(prose: &str) -> String {
    let visible: String = prose.chars().filter(|c| !INVISIBLE.contains(c)).collect();
    let collapsed = HORIZONTAL_SPACE.replace_all(&visible, " ");

    let mut out = String::with_capacity(collapsed.len());
    let mut blank_run = false;

    for line in collapsed.lines() {
        let line = line.trim();
        if line.is_empty() {
            blank_run = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        blank_run = false;
    }

    out
}

/// Caps text at `max_chars`, reserving room for a trailing ellipsis
pub fn truncate_content(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Strips fenced code blocks and flattens the rest into one line
pub fn strip_code_blocks(text: &str) -> String {
    let without_blocks = FENCED_BLOCK.replace_all(text, " ");
    let without_fences = without_blocks.replace("```", " ");
    without_fences.split_whitespace().collect::<Vec<_>>().join(" ")
}
