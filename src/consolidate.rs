//! Merges overlapping matched spans into disjoint renderable units without
//! losing any contributing highlight's identity.

use crate::model::{ConsolidatedSpan, Span};

/// Sorts spans by `(start, end)` and sweeps left to right, growing a group
/// while the next span starts strictly before the group's running maximum
/// end. Each closed group becomes one `ConsolidatedSpan` covering
/// `[min start, max end)`. The primary highlight is the longest contributor
/// (ties to the earliest start); every other distinct id is kept as a
/// secondary, order preserved.
pub fn consolidate(spans: &[Span]) -> Vec<ConsolidatedSpan> {
    if spans.is_empty() {
        return Vec::new();
    }

    let mut ordered: Vec<&Span> = spans.iter().collect();
    ordered.sort_by_key(|s| (s.start, s.end));

    let mut consolidated = Vec::new();
    let mut group: Vec<&Span> = vec![ordered[0]];
    let mut max_end = ordered[0].end;

    for span in ordered.into_iter().skip(1) {
        if span.start < max_end {
            max_end = max_end.max(span.end);
            group.push(span);
        } else {
            consolidated.push(close_group(&group, max_end));
            max_end = span.end;
            group = vec![span];
        }
    }
    consolidated.push(close_group(&group, max_end));

    consolidated
}

fn close_group(group: &[&Span], max_end: usize) -> ConsolidatedSpan {
    let mut primary = group[0];
    for &span in &group[1..] {
        if span.end - span.start > primary.end - primary.start {
            primary = span;
        }
    }

    let mut secondary_ids = Vec::new();
    for span in group {
        let id = &span.highlight.id;
        if *id != primary.highlight.id && !secondary_ids.contains(id) {
            secondary_ids.push(id.clone());
        }
    }

    ConsolidatedSpan {
        start: group[0].start,
        end: max_end,
        primary_id: primary.highlight.id.clone(),
        created_at: primary.highlight.created_at.clone(),
        secondary_ids,
    }
}
