//! Locates a remembered passage inside normalized text, disambiguating
//! repeated occurrences by the context captured around the passage.

use crate::model::{Highlight, Span};
use crate::normalize::{NormalizedSource, fold_fragment};

/// Finds the best occurrence of `target` in `haystack` (both already
/// folded), in visible byte coordinates.
///
/// One occurrence is accepted unconditionally. With several, the first whose
/// surrounding windows agree with the expected prefix/suffix on every side
/// that has context wins; when no occurrence survives, the first one is
/// returned outright as a documented best-effort fallback.
pub fn find_visible_span(
    haystack: &str,
    target: &str,
    prefix: &str,
    suffix: &str,
) -> Option<(usize, usize)> {
    if target.is_empty() {
        return None;
    }

    let occurrences: Vec<usize> = haystack.match_indices(target).map(|(i, _)| i).collect();
    match occurrences.len() {
        0 => None,
        1 => Some((occurrences[0], occurrences[0] + target.len())),
        _ => {
            let prefix_chars = prefix.chars().count();
            let suffix_chars = suffix.chars().count();
            for &start in &occurrences {
                let end = start + target.len();
                let before = window_before(haystack, start, prefix_chars);
                let after = window_after(haystack, end, suffix_chars);
                if prefix_matches(before, prefix) && suffix_matches(after, suffix) {
                    return Some((start, end));
                }
            }
            Some((occurrences[0], occurrences[0] + target.len()))
        }
    }
}

/// Resolves one highlight against a normalized document, projecting the
/// winning occurrence into source coordinates. `None` means the passage is
/// not present in the current revision; the caller keeps the highlight.
pub fn match_highlight<'a>(norm: &NormalizedSource, highlight: &'a Highlight) -> Option<Span<'a>> {
    let target = fold_fragment(&highlight.text);
    let prefix = fold_fragment(&highlight.prefix);
    let suffix = fold_fragment(&highlight.suffix);

    let (start, end) = find_visible_span(&norm.text, &target, &prefix, &suffix)?;
    let source = norm.project(start, end)?;

    Some(Span {
        start: source.start,
        end: source.end,
        highlight,
    })
}

fn window_before(haystack: &str, start: usize, chars: usize) -> &str {
    let mut idx = start;
    let mut taken = 0;
    while taken < chars {
        match haystack[..idx].chars().next_back() {
            Some(c) => {
                idx -= c.len_utf8();
                taken += 1;
            }
            None => break,
        }
    }
    &haystack[idx..start]
}

fn window_after(haystack: &str, end: usize, chars: usize) -> &str {
    let mut idx = end;
    let mut taken = 0;
    while taken < chars {
        match haystack[idx..].chars().next() {
            Some(c) => {
                idx += c.len_utf8();
                taken += 1;
            }
            None => break,
        }
    }
    &haystack[end..idx]
}

// Whitespace boundaries shift between renders, so the actual window may be a
// right- or left-trimmed variant of the expected context.
fn prefix_matches(window: &str, expected: &str) -> bool {
    let expected = expected.trim();
    if expected.is_empty() {
        return true;
    }
    let window = window.trim();
    !window.is_empty() && (window.ends_with(expected) || expected.ends_with(window))
}

fn suffix_matches(window: &str, expected: &str) -> bool {
    let expected = expected.trim();
    if expected.is_empty() {
        return true;
    }
    let window = window.trim();
    !window.is_empty() && (window.starts_with(expected) || expected.starts_with(window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_source;

    fn highlight(text: &str, prefix: &str, suffix: &str) -> Highlight {
        Highlight {
            id: "h1".to_string(),
            text: text.to_string(),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            created_at: String::new(),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_single_occurrence_no_context() {
        assert_eq!(find_visible_span("hello world", "hello", "", ""), Some((0, 5)));
    }

    #[test]
    fn test_no_occurrence() {
        assert_eq!(find_visible_span("hello world", "absent", "", ""), None);
    }

    #[test]
    fn test_repeated_phrase_selected_by_prefix() {
        let haystack = "alpha shared phrase omega beta shared phrase gamma";
        let second = haystack.rfind("shared phrase").unwrap();
        assert_eq!(
            find_visible_span(haystack, "shared phrase", "beta ", ""),
            Some((second, second + "shared phrase".len()))
        );
        assert_eq!(
            find_visible_span(haystack, "shared phrase", "alpha ", ""),
            Some((6, 6 + "shared phrase".len()))
        );
    }

    #[test]
    fn test_repeated_phrase_selected_by_suffix() {
        let haystack = "x target y target z";
        let second = haystack.rfind("target").unwrap();
        assert_eq!(
            find_visible_span(haystack, "target", "", " z"),
            Some((second, second + 6))
        );
    }

    #[test]
    fn test_ambiguous_falls_back_to_first() {
        let haystack = "one two one two";
        assert_eq!(find_visible_span(haystack, "two", "nomatch", ""), Some((4, 7)));
    }

    #[test]
    fn test_trimmed_context_still_matches() {
        let haystack = "alpha beta target gamma";
        // captured prefix carries a trailing space the window lost
        let start = haystack.find("target").unwrap();
        assert_eq!(
            find_visible_span(haystack, "target", "beta ", ""),
            Some((start, start + 6))
        );
    }

    #[test]
    fn test_match_highlight_projects_to_source() {
        let source = "# Title\n\nSome **bold** passage here";
        let norm = normalize_source(source);
        let h = highlight("bold passage", "Some ", " here");
        let span = match_highlight(&norm, &h).unwrap();
        assert_eq!(&source[span.start..span.end], "bold** passage");
    }

    #[test]
    fn test_match_highlight_folds_typographic_text() {
        let source = "she said \u{201C}hello there\u{201D} quietly";
        let norm = normalize_source(source);
        // captured from a render that already shows plain quotes
        let h = highlight("\"hello there\"", "said ", "");
        let span = match_highlight(&norm, &h).unwrap();
        assert_eq!(span.start, source.find('\u{201C}').unwrap());
    }

    #[test]
    fn test_unmatched_highlight_is_none_not_error() {
        let norm = normalize_source("present text");
        let h = highlight("missing text", "", "");
        assert!(match_highlight(&norm, &h).is_none());
    }
}
