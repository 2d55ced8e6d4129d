//! Word-boundary phrase matching shared by the rule tables.
//!
//! Text is folded to lower-case words separated by single spaces and padded
//! with a leading and trailing space, so a phrase only matches whole words:
//! `"hi"` matches `"hi there"` but not `"this"`.

/// Normalise free text for phrase lookups.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .map(|c| match c {
            '\u{2019}' | '\'' => '\'',
            c if c.is_alphanumeric() => c,
            _ => ' ',
        })
        .collect::<String>()
        .to_lowercase();

    let mut out = String::with_capacity(folded.len() + 2);
    out.push(' ');
    for word in folded.split_whitespace() {
        out.push_str(word);
        out.push(' ');
    }
    out
}

/// Byte offset of `phrase` in an already-normalised text, if present.
pub fn find_phrase(normalized: &str, phrase: &str) -> Option<usize> {
    let needle = normalize(phrase);
    if needle.trim().is_empty() {
        return None;
    }
    normalized.find(&needle)
}

/// Like [`find_phrase`] but the phrase may start or end inside a word, so
/// `"escalate"` is found in `"escalated"` and `"supervisor"` in `"supervisors"`.
pub fn find_substring(normalized: &str, phrase: &str) -> Option<usize> {
    let needle = normalize(phrase);
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }
    normalized.find(needle)
}

pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    find_phrase(normalized, phrase).is_some()
}

/// Returns the value whose keyword occurs earliest in `text`.
pub fn earliest_keyword<T: Copy>(text: &str, table: &[(T, &[&str])]) -> Option<T> {
    let normalized = normalize(text);
    table
        .iter()
        .flat_map(|(value, keywords)| {
            keywords
                .iter()
                .filter_map(|kw| find_phrase(&normalized, kw))
                .map(move |pos| (pos, *value))
        })
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, value)| value)
}

/// Value of a `Label: value` line, tolerating markdown decoration such as
/// `**Label:** value`, `## Label` or `- label: value`.
///
/// A bare heading yields `Some("")`. Anything else after the label (e.g.
/// `Summary of the call`) is not a match.
pub fn labelled_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let line = line.trim_start_matches(|c: char| matches!(c, '*' | '#' | '-') || c.is_whitespace());
    let head = line.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }

    let rest = line[label.len()..].trim_start_matches(|c: char| c == '*' || c.is_whitespace());
    if rest.is_empty() {
        return Some("");
    }
    let value = rest.strip_prefix(':')?;
    Some(value.trim_matches(|c: char| c == '*' || c.is_whitespace()))
}
