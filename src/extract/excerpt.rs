use super::text::{strip_code_blocks, ELLIPSIS};

/// Builds a short plain-text summary of `content`
///
/// Code blocks are removed first. Longer text is cut at the last sentence end
/// past half of `max_chars`, else at the last word break past 70%, else hard.
/// A truncated excerpt always ends with `...`, so the result never exceeds
/// `max_chars + 3` characters.
pub fn make_excerpt(content: &str, max_chars: usize) -> String {
    let text = strip_code_blocks(content);
    if text.chars().count() <= max_chars {
        return text;
    }

    let window: String = text.chars().take(max_chars).collect();
    let window_chars = |byte_index: usize| window[..byte_index].chars().count();

    let sentence_end = [". ", "? ", "! "]
        .iter()
        .filter_map(|boundary| window.rfind(boundary))
        .max()
        .map(|i| i + 1);

    if let Some(end) = sentence_end.filter(|&end| window_chars(end) * 2 > max_chars) {
        return format!("{}{}", &window[..end], ELLIPSIS);
    }

    let word_end = window.rfind(' ');
    if let Some(end) = word_end.filter(|&end| window_chars(end) * 10 > max_chars * 7) {
        return format!("{}{}", window[..end].trim_end(), ELLIPSIS);
    }

    format!("{}{}", window.trim_end(), ELLIPSIS)
}
