//! Rewrites a document's editable source so every consolidated span is
//! bracketed by an invisible, idempotent begin/end comment pair.

use std::sync::OnceLock;

use regex::Regex;

use crate::consolidate::consolidate;
use crate::matcher::match_highlight;
use crate::model::{ConsolidatedSpan, Highlight, Span};
use crate::normalize::normalize_source;

const END_MARKER: &str = "<!--/hl-->";

fn marker_pattern() -> &'static Regex {
    static MARKER_REGEX: OnceLock<Regex> = OnceLock::new();
    MARKER_REGEX.get_or_init(|| Regex::new(r"<!--/?hl\b[^>]*-->").expect("valid marker regex"))
}

/// Removes every previously written marker pair. Running the writer always
/// starts from this baseline, so markers never accumulate across runs.
pub fn strip_markers(source: &str) -> String {
    marker_pattern().replace_all(source, "").into_owned()
}

/// Produces an updated source in which the current highlight list is
/// re-anchored from scratch: stale markers stripped, spans re-derived from
/// the canonical list, fresh markers inserted. Highlights that cannot be
/// located in the current revision are omitted, never deleted.
pub fn write_markers(source: &str, highlights: &[Highlight]) -> String {
    let clean = strip_markers(source);
    let norm = normalize_source(&clean);

    let spans: Vec<Span> = highlights
        .iter()
        .filter_map(|h| match_highlight(&norm, h))
        .collect();
    let consolidated = consolidate(&spans);
    if consolidated.is_empty() {
        return clean;
    }

    let mut insertions: Vec<Insertion> = Vec::with_capacity(consolidated.len() * 2);
    for span in &consolidated {
        insertions.push(Insertion {
            offset: span.start,
            // begin markers sort after end markers at the same offset;
            // among begins, the span reaching further sorts first
            rank: 1,
            tiebreak: -(span.end as i64),
            text: begin_marker(span),
        });
        insertions.push(Insertion {
            offset: span.end,
            rank: 0,
            tiebreak: -(span.start as i64),
            text: END_MARKER.to_string(),
        });
    }
    insertions.sort_by_key(|ins| (ins.offset, ins.rank, ins.tiebreak));

    let mut out = String::with_capacity(clean.len() + insertions.len() * 48);
    let mut cursor = 0;
    for ins in &insertions {
        out.push_str(&clean[cursor..ins.offset]);
        out.push_str(&ins.text);
        cursor = ins.offset;
    }
    out.push_str(&clean[cursor..]);
    out
}

struct Insertion {
    offset: usize,
    rank: u8,
    tiebreak: i64,
    text: String,
}

fn begin_marker(span: &ConsolidatedSpan) -> String {
    let ids = span.all_ids();
    if ids.len() > 1 {
        format!(
            "<!--hl ids={} id={} created_at={}-->",
            ids.join(","),
            span.primary_id,
            span.created_at
        )
    } else {
        format!(
            "<!--hl id={} created_at={}-->",
            span.primary_id, span.created_at
        )
    }
}
