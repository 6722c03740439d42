//! Projects raw document source into the "visible text" used for matching,
//! keeping a byte-accurate map back to source offsets so matched ranges can
//! be projected into the editable source.

/// Byte range in the original source that produced a visible byte.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
struct Section {
    start: usize,
    heading: String,
}

/// The markup-stripped projection of a document. `map` carries one entry per
/// byte of `text`, pointing at the source bytes that produced it.
#[derive(Debug)]
pub struct NormalizedSource {
    pub text: String,
    map: Vec<SourceSpan>,
    sections: Vec<Section>,
}

impl NormalizedSource {
    /// Projects a visible `[start, end)` range into source coordinates.
    pub fn project(&self, start: usize, end: usize) -> Option<SourceSpan> {
        if start >= end || end > self.map.len() {
            return None;
        }
        Some(SourceSpan {
            start: self.map[start].start,
            end: self.map[end - 1].end,
        })
    }

    /// The nearest heading preceding the given visible offset, if any.
    pub fn section_for(&self, visible_offset: usize) -> Option<&str> {
        let mut current = None;
        for section in &self.sections {
            if section.start <= visible_offset {
                current = Some(section.heading.as_str());
            } else {
                break;
            }
        }
        current
    }
}

#[derive(Default)]
struct Builder {
    text: String,
    map: Vec<SourceSpan>,
    pending: Option<SourceSpan>,
}

impl Builder {
    fn mark_space(&mut self, span: SourceSpan) {
        if self.pending.is_none() {
            self.pending = Some(span);
        }
    }

    fn push(&mut self, ch: char, span: SourceSpan) {
        if let Some(space) = self.pending.take() {
            if !self.text.is_empty() {
                self.text.push(' ');
                self.map.push(space);
            }
        }
        let before = self.text.len();
        self.text.push(ch);
        for _ in before..self.text.len() {
            self.map.push(span);
        }
    }

    // where the next visible character will land
    fn next_visible_offset(&self) -> usize {
        if self.pending.is_some() && !self.text.is_empty() {
            self.text.len() + 1
        } else {
            self.text.len()
        }
    }
}

/// Applies the character-level folding (whitespace collapse, typographic
/// normalization) to a bare fragment, returning the folded string and a map
/// into the fragment's own byte offsets.
pub fn fold_text(fragment: &str) -> (String, Vec<SourceSpan>) {
    let mut b = Builder::default();
    for (i, ch) in fragment.char_indices() {
        let span = SourceSpan {
            start: i,
            end: i + ch.len_utf8(),
        };
        if ch.is_whitespace() {
            b.mark_space(span);
        } else {
            b.push(normalize_char(ch), span);
        }
    }
    (b.text, b.map)
}

/// Folding for captured snippets (targets, prefixes, suffixes).
pub fn fold_fragment(fragment: &str) -> String {
    fold_text(fragment).0
}

pub fn normalize_source(source: &str) -> NormalizedSource {
    let len = source.len();
    let mut b = Builder::default();
    let mut sections: Vec<Section> = Vec::new();

    let mut i = front_matter_end(source);
    let mut at_line_start = true;
    let mut in_fence: Option<char> = None;
    let mut heading_start: Option<usize> = None;
    // (index of the label-closing ']', index just past the url ')')
    let mut link_stack: Vec<(usize, usize)> = Vec::new();

    while i < len {
        if let Some(&(label_end, resume)) = link_stack.last() {
            if i == label_end {
                link_stack.pop();
                i = resume;
                continue;
            }
        }

        if at_line_start {
            let line_end = source[i..].find('\n').map(|n| i + n).unwrap_or(len);
            let line = &source[i..line_end];
            let trimmed = line.trim_start_matches([' ', '\t']);
            let indent = line.len() - trimmed.len();

            match in_fence {
                Some(fence) => {
                    if is_fence_close(trimmed, fence) {
                        in_fence = None;
                        i = line_end;
                    }
                    at_line_start = false;
                    continue;
                }
                None => {
                    if let Some(fence) = fence_open(trimmed) {
                        in_fence = Some(fence);
                        i = line_end;
                        at_line_start = false;
                        continue;
                    }
                    if is_rule_line(trimmed) {
                        i = line_end;
                        at_line_start = false;
                        continue;
                    }
                    let (consumed, is_heading) = strip_line_prefix(trimmed);
                    i += indent + consumed;
                    if is_heading {
                        heading_start = Some(b.next_visible_offset());
                    }
                    at_line_start = false;
                    continue;
                }
            }
        }

        let rest = &source[i..];
        let ch = match rest.chars().next() {
            Some(c) => c,
            None => break,
        };
        let ch_len = ch.len_utf8();

        if ch == '\n' {
            if let Some(start) = heading_start.take() {
                close_section(&mut sections, &b.text, start);
            }
            b.mark_space(SourceSpan { start: i, end: i + 1 });
            i += 1;
            at_line_start = true;
            continue;
        }

        if ch.is_whitespace() {
            b.mark_space(SourceSpan {
                start: i,
                end: i + ch_len,
            });
            i += ch_len;
            continue;
        }

        if in_fence.is_none() {
            // comments (including previously written highlight markers)
            // contribute no visible characters and no offsets
            if rest.starts_with("<!--") {
                i = rest.find("-->").map(|n| i + n + 3).unwrap_or(len);
                continue;
            }
            if ch == '<' && looks_like_tag(rest) {
                if let Some(n) = rest.find('>') {
                    i += n + 1;
                    continue;
                }
            }
            if ch == '!' && rest[1..].starts_with('[') {
                if let Some(ends) = scan_link(source, i + 1) {
                    link_stack.push(ends);
                    i += 2;
                    continue;
                }
            }
            if ch == '[' {
                if let Some(ends) = scan_link(source, i) {
                    link_stack.push(ends);
                    i += 1;
                    continue;
                }
            }
            if ch == '*' || ch == '`' {
                i += 1;
                continue;
            }
            if ch == '~' && rest[1..].starts_with('~') {
                i += 2;
                continue;
            }
            if ch == '_' && !is_intraword_underscore(source, i) {
                i += 1;
                continue;
            }
        }

        b.push(
            normalize_char(ch),
            SourceSpan {
                start: i,
                end: i + ch_len,
            },
        );
        i += ch_len;
    }

    if let Some(start) = heading_start.take() {
        close_section(&mut sections, &b.text, start);
    }

    NormalizedSource {
        text: b.text,
        map: b.map,
        sections,
    }
}

fn close_section(sections: &mut Vec<Section>, text: &str, start: usize) {
    if start >= text.len() {
        return;
    }
    let heading = text[start..].trim().to_string();
    if !heading.is_empty() {
        sections.push(Section { start, heading });
    }
}

fn normalize_char(ch: char) -> char {
    match ch {
        '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
        '\u{2018}' | '\u{2019}' => '\'',
        '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
        _ => ch,
    }
}

/// Byte offset just past a leading YAML front matter block, or 0 when the
/// source has none. The block is excluded from matching entirely.
pub fn front_matter_end(source: &str) -> usize {
    let Some(rest) = source.strip_prefix("---") else {
        return 0;
    };
    let Some(first_nl) = rest.find('\n') else {
        return 0;
    };
    if !rest[..first_nl].trim().is_empty() {
        return 0;
    }

    let mut offset = 3 + first_nl + 1;
    while offset < source.len() {
        let line_end = source[offset..]
            .find('\n')
            .map(|n| offset + n)
            .unwrap_or(source.len());
        let line = source[offset..line_end].trim_end();
        if line == "---" || line == "..." {
            return (line_end + 1).min(source.len());
        }
        offset = line_end + 1;
    }
    0
}

fn fence_open(trimmed: &str) -> Option<char> {
    for fence in ['`', '~'] {
        let run = trimmed.chars().take_while(|&c| c == fence).count();
        if run >= 3 {
            return Some(fence);
        }
    }
    None
}

fn is_fence_close(trimmed: &str, fence: char) -> bool {
    let run = trimmed.chars().take_while(|&c| c == fence).count();
    run >= 3 && trimmed[run..].trim().is_empty()
}

fn is_rule_line(trimmed: &str) -> bool {
    if trimmed.len() < 3 {
        return false;
    }
    for rule in ['-', '*', '_', '='] {
        if trimmed.chars().all(|c| c == rule || c == ' ')
            && trimmed.chars().filter(|&c| c == rule).count() >= 3
        {
            return true;
        }
    }
    false
}

// consumes heading/list/quote prefixes; returns (bytes consumed, was heading)
fn strip_line_prefix(trimmed: &str) -> (usize, bool) {
    let mut consumed = 0;
    let mut is_heading = false;

    loop {
        let rest = &trimmed[consumed..];
        let spaces = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        if spaces > 0 {
            consumed += spaces;
            continue;
        }

        if rest.starts_with('>') {
            consumed += 1;
            continue;
        }

        let hashes = rest.chars().take_while(|&c| c == '#').count();
        if (1..=6).contains(&hashes)
            && rest[hashes..]
                .chars()
                .next()
                .map(|c| c == ' ' || c == '\t')
                .unwrap_or(true)
        {
            consumed += hashes;
            is_heading = true;
            continue;
        }

        if (rest.starts_with("- ") || rest.starts_with("* ") || rest.starts_with("+ "))
            && rest.len() > 2
        {
            consumed += 2;
            continue;
        }

        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0
            && (rest[digits..].starts_with(". ") || rest[digits..].starts_with(") "))
        {
            consumed += digits + 2;
            continue;
        }

        break;
    }

    (consumed, is_heading)
}

fn looks_like_tag(rest: &str) -> bool {
    match rest[1..].chars().next() {
        Some(c) => c.is_ascii_alphabetic() || c == '/',
        None => false,
    }
}

fn is_intraword_underscore(source: &str, i: usize) -> bool {
    let before = source[..i].chars().next_back();
    let after = source[i + 1..].chars().next();
    matches!(before, Some(c) if c.is_alphanumeric()) && matches!(after, Some(c) if c.is_alphanumeric())
}

// finds the `](…)` tail of a link opened at `bracket`; aborts on blank lines
fn scan_link(source: &str, bracket: usize) -> Option<(usize, usize)> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut j = bracket + 1;
    let label_end = loop {
        if j >= bytes.len() {
            return None;
        }
        match bytes[j] {
            b'[' => depth += 1,
            b']' => {
                if depth == 0 {
                    break j;
                }
                depth -= 1;
            }
            b'\n' => {
                if source[j + 1..].trim_start_matches([' ', '\t']).starts_with('\n') {
                    return None;
                }
            }
            _ => {}
        }
        j += 1;
    };

    if bytes.get(label_end + 1) != Some(&b'(') {
        return None;
    }

    let mut parens = 0usize;
    let mut k = label_end + 2;
    while k < bytes.len() {
        match bytes[k] {
            b'(' => parens += 1,
            b')' => {
                if parens == 0 {
                    return Some((label_end, k + 1));
                }
                parens -= 1;
            }
            b'\n' => return None,
            _ => {}
        }
        k += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_identity() {
        let norm = normalize_source("hello world");
        assert_eq!(norm.text, "hello world");
        let span = norm.project(0, 5).unwrap();
        assert_eq!((span.start, span.end), (0, 5));
    }

    #[test]
    fn test_heading_marker_dropped_content_kept() {
        let norm = normalize_source("# Title\n\nBody text");
        assert_eq!(norm.text, "Title Body text");
    }

    #[test]
    fn test_link_keeps_label_only() {
        let norm = normalize_source("see [the docs](https://example.com/x) here");
        assert_eq!(norm.text, "see the docs here");
        // projection of the label lands inside the label, not the url
        let start = norm.text.find("the docs").unwrap();
        let span = norm.project(start, start + 8).unwrap();
        assert_eq!(&"see [the docs](https://example.com/x) here"[span.start..span.end], "the docs");
    }

    #[test]
    fn test_image_keeps_alt_only() {
        let norm = normalize_source("before ![an image](pic.png) after");
        assert_eq!(norm.text, "before an image after");
    }

    #[test]
    fn test_comments_contribute_nothing() {
        let norm = normalize_source("one <!--hl id=abc created_at=t--> two");
        assert_eq!(norm.text, "one two");
    }

    #[test]
    fn test_whitespace_collapses() {
        let norm = normalize_source("a  b\t\tc\n\nd\u{a0}e");
        assert_eq!(norm.text, "a b c d e");
    }

    #[test]
    fn test_typographic_normalization() {
        let norm = normalize_source("\u{201C}quoted\u{201D} \u{2018}x\u{2019} a\u{2014}b");
        assert_eq!(norm.text, "\"quoted\" 'x' a-b");
    }

    #[test]
    fn test_emphasis_delimiters_dropped() {
        let norm = normalize_source("some **bold** and `code` and _emph_ text");
        assert_eq!(norm.text, "some bold and code and emph text");
    }

    #[test]
    fn test_intraword_underscore_kept() {
        let norm = normalize_source("call foo_bar here");
        assert_eq!(norm.text, "call foo_bar here");
    }

    #[test]
    fn test_front_matter_excluded() {
        let source = "---\ntitle: x\n---\nreal content";
        let norm = normalize_source(source);
        assert_eq!(norm.text, "real content");
        let span = norm.project(0, 4).unwrap();
        assert_eq!(&source[span.start..span.end], "real");
    }

    #[test]
    fn test_list_markers_dropped() {
        let norm = normalize_source("- first\n- second\n1. third\n> quoted");
        assert_eq!(norm.text, "first second third quoted");
    }

    #[test]
    fn test_fence_lines_dropped_body_kept() {
        let norm = normalize_source("before\n```rust\nlet x = 1;\n```\nafter");
        assert_eq!(norm.text, "before let x = 1; after");
    }

    #[test]
    fn test_rule_line_dropped() {
        let norm = normalize_source("above\n---\nbelow");
        assert_eq!(norm.text, "above below");
    }

    #[test]
    fn test_section_tracking() {
        let norm = normalize_source("intro\n\n# First\n\nalpha beta\n\n## Second\n\ngamma");
        let alpha = norm.text.find("alpha").unwrap();
        let gamma = norm.text.find("gamma").unwrap();
        assert_eq!(norm.section_for(0), None);
        assert_eq!(norm.section_for(alpha), Some("First"));
        assert_eq!(norm.section_for(gamma), Some("Second"));
    }

    #[test]
    fn test_projection_through_markup() {
        let source = "# Title\n\nSome **bold** text";
        let norm = normalize_source(source);
        let start = norm.text.find("bold").unwrap();
        let span = norm.project(start, start + 4).unwrap();
        assert_eq!(&source[span.start..span.end], "bold");
    }

    #[test]
    fn test_fold_fragment() {
        assert_eq!(fold_fragment("  a\u{2019}b   c  "), "a'b c");
    }
}
