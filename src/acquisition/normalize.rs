/*!
 * Whitespace normalization for extracted document text.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Separator placed between pages when they are concatenated
pub const PAGE_SEPARATOR: &str = "\n\n";

// Hyphen, line break, then the first character of the word's continuation
static HYPHEN_BREAK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-\n(\w)").expect("hyphen break pattern is valid")
});

static BLANK_RUN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n{3,}").expect("blank run pattern is valid")
});

/// Join words that a line break split with a hyphen.
///
/// Applied until nothing matches, so "a-\n-\nb" collapses fully and a second
/// call is always a no-op.
pub fn merge_hyphenated_breaks(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let merged = HYPHEN_BREAK_REGEX.replace_all(&current, "$1");
        if merged == current {
            return current;
        }
        current = merged.into_owned();
    }
}

/// Normalize raw extracted text: drop carriage returns, merge hyphenated
/// line breaks, keep at most one blank line in a row, trim.
pub fn normalize_text(raw: &str) -> String {
    let text = raw.replace('\r', "");
    let text = merge_hyphenated_breaks(&text);
    let text = BLANK_RUN_REGEX.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Concatenate per-page texts in page order and normalize the result
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let joined = pages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR);
    normalize_text(&joined)
}

/// Cut text to at most `max_chars` characters, on a char boundary.
///
/// Returns the text and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (text[..byte_index].to_string(), true),
        None => (text.to_string(), false),
    }
}
