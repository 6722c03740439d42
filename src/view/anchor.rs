//! Re-creates visual highlight wrappers inside a rendered view and exposes
//! navigation between them.
//!
//! Every match position is computed once, against an immutable snapshot of
//! the view's text content taken before any mutation. Wrapping is applied
//! from the document end backwards, so an insertion can never invalidate an
//! offset that is still pending; within a text node, splits retain the
//! original node id for the text before the split point.

use crate::consolidate::consolidate;
use crate::matcher::find_visible_span;
use crate::model::{ConsolidatedSpan, Highlight, Span};
use crate::normalize::{fold_fragment, fold_text};

use super::arena::{NodeId, TextRun, ViewArena};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based index of the focused highlight, 0 when none is focused.
    pub current: usize,
    pub total: usize,
}

pub type ProgressCallback = Box<dyn FnMut(Progress)>;

#[derive(Debug, Clone)]
struct AnchoredMark {
    primary_id: String,
    secondary_ids: Vec<String>,
    start: usize,
    first_node: NodeId,
}

pub struct Anchorer {
    arena: ViewArena,
    marks: Vec<AnchoredMark>,
    current: Option<usize>,
    scroll_target: Option<NodeId>,
    on_progress: Option<ProgressCallback>,
}

impl Anchorer {
    pub fn new(arena: ViewArena) -> Self {
        Anchorer {
            arena,
            marks: Vec::new(),
            current: None,
            scroll_target: None,
            on_progress: None,
        }
    }

    pub fn arena(&self) -> &ViewArena {
        &self.arena
    }

    pub fn set_on_progress(&mut self, callback: ProgressCallback) {
        self.on_progress = Some(callback);
    }

    /// Resolves and wraps the whole highlight list in one pass over a single
    /// text snapshot. Unresolvable highlights are skipped.
    pub fn anchor_all(&mut self, highlights: &[Highlight]) {
        let (raw, runs) = self.arena.text_runs();
        let (folded, fold_map) = fold_text(&raw);

        let mut spans: Vec<Span> = Vec::new();
        for highlight in highlights {
            let target = fold_fragment(&highlight.text);
            let prefix = fold_fragment(&highlight.prefix);
            let suffix = fold_fragment(&highlight.suffix);
            let Some((start, end)) = find_visible_span(&folded, &target, &prefix, &suffix) else {
                continue;
            };
            if end == 0 || end > fold_map.len() {
                continue;
            }
            spans.push(Span {
                start: fold_map[start].start,
                end: fold_map[end - 1].end,
                highlight,
            });
        }

        let consolidated = consolidate(&spans);

        // apply back to front: every pending span lies strictly before the
        // one being wrapped, so its run offsets stay valid
        for span in consolidated.iter().rev() {
            if let Some(first_node) = self.wrap_span(span, &runs) {
                self.marks.push(AnchoredMark {
                    primary_id: span.primary_id.clone(),
                    secondary_ids: span.secondary_ids.clone(),
                    start: span.start,
                    first_node,
                });
            }
        }
        self.marks.sort_by_key(|m| m.start);

        self.notify();
    }

    fn wrap_span(&mut self, span: &ConsolidatedSpan, runs: &[TextRun]) -> Option<NodeId> {
        let mut first_node = None;
        for run in runs.iter().rev() {
            if run.end() <= span.start || run.start >= span.end {
                continue;
            }
            let seg_start = span.start.max(run.start) - run.start;
            let seg_end = span.end.min(run.end()) - run.start;
            if seg_start >= seg_end {
                continue;
            }
            if let Some(mark) =
                self.arena
                    .wrap_text_range(run.node, seg_start, seg_end, &span.primary_id)
            {
                first_node = Some(mark);
            }
        }
        first_node
    }

    pub fn progress(&self) -> Progress {
        Progress {
            current: self.current.map(|i| i + 1).unwrap_or(0),
            total: self.marks.len(),
        }
    }

    /// Node the surrounding chrome should scroll into view, set whenever
    /// focus moves.
    pub fn scroll_target(&self) -> Option<NodeId> {
        self.scroll_target
    }

    /// Moves focus to the next wrapped passage in document order, clamped at
    /// the last one.
    pub fn next_highlight(&mut self) -> Progress {
        if self.marks.is_empty() {
            return self.progress();
        }
        let next = match self.current {
            None => 0,
            Some(i) => (i + 1).min(self.marks.len() - 1),
        };
        self.focus_index(next)
    }

    /// Moves focus to the previous wrapped passage, clamped at the first.
    pub fn previous_highlight(&mut self) -> Progress {
        if self.marks.is_empty() {
            return self.progress();
        }
        let previous = match self.current {
            None => 0,
            Some(i) => i.saturating_sub(1),
        };
        self.focus_index(previous)
    }

    /// Focuses the passage carrying the given highlight id, for deep links
    /// supplied at load time. Secondary ids resolve to their shared wrapper.
    pub fn focus_id(&mut self, id: &str) -> Option<Progress> {
        let index = self
            .marks
            .iter()
            .position(|m| m.primary_id == id || m.secondary_ids.iter().any(|s| s == id))?;
        Some(self.focus_index(index))
    }

    fn focus_index(&mut self, index: usize) -> Progress {
        let changed = self.current != Some(index);
        self.current = Some(index);
        self.scroll_target = Some(self.marks[index].first_node);
        if changed {
            self.notify();
        }
        self.progress()
    }

    fn notify(&mut self) {
        let progress = self.progress();
        if let Some(callback) = self.on_progress.as_mut() {
            callback(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::arena::CHROME_CLASS;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn highlight(id: &str, text: &str, prefix: &str, suffix: &str) -> Highlight {
        Highlight {
            id: id.to_string(),
            text: text.to_string(),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            extra: serde_json::Map::new(),
        }
    }

    fn word_document() -> (ViewArena, Vec<String>) {
        let words: Vec<String> = (0..600).map(|i| format!("word{:03}", i)).collect();
        let mut arena = ViewArena::new();
        let root = arena.root();
        let body = arena.push_element(root, "p", None);
        arena.push_text(body, &words.join(" "));
        (arena, words)
    }

    fn phrase(words: &[String], range: std::ops::Range<usize>) -> String {
        words[range].join(" ")
    }

    fn context_before(full: &str, phrase: &str, chars: usize) -> String {
        let at = full.find(phrase).unwrap();
        full[..at].chars().rev().take(chars).collect::<Vec<_>>().into_iter().rev().collect()
    }

    fn context_after(full: &str, phrase: &str, chars: usize) -> String {
        let at = full.find(phrase).unwrap() + phrase.len();
        full[at..].chars().take(chars).collect()
    }

    fn wrapped_text(anchorer: &Anchorer, id: &str) -> String {
        let arena = anchorer.arena();
        arena
            .marks()
            .iter()
            .filter(|&&m| arena.mark_data_id(m) == Some(id))
            .map(|&m| arena.text_content(m))
            .collect()
    }

    #[test]
    fn test_wrap_order_independence() {
        let (_, words) = word_document();
        let full = words.join(" ");
        let early = phrase(&words, 10..18);
        let late = phrase(&words, 220..230);

        let h_early = highlight(
            "early",
            &early,
            &context_before(&full, &early, 30),
            &context_after(&full, &early, 30),
        );
        let h_late = highlight(
            "late",
            &late,
            &context_before(&full, &late, 30),
            &context_after(&full, &late, 30),
        );

        let mut first = Anchorer::new(word_document().0);
        first.anchor_all(&[h_early.clone(), h_late.clone()]);
        let mut second = Anchorer::new(word_document().0);
        second.anchor_all(&[h_late, h_early]);

        for anchorer in [&first, &second] {
            assert_eq!(wrapped_text(anchorer, "early"), early);
            assert_eq!(wrapped_text(anchorer, "late"), late);
        }
        assert_eq!(first.progress().total, 2);
        assert_eq!(second.progress().total, 2);
    }

    #[test]
    fn test_two_highlights_in_one_text_node_both_resolve() {
        let mut arena = ViewArena::new();
        let root = arena.root();
        arena.push_text(root, "alpha beta gamma delta epsilon");

        let mut anchorer = Anchorer::new(arena);
        anchorer.anchor_all(&[
            highlight("a", "beta", "", ""),
            highlight("b", "delta", "", ""),
        ]);

        assert_eq!(wrapped_text(&anchorer, "a"), "beta");
        assert_eq!(wrapped_text(&anchorer, "b"), "delta");
        assert_eq!(
            anchorer.arena().text_content(anchorer.arena().root()),
            "alpha beta gamma delta epsilon"
        );
    }

    #[test]
    fn test_chrome_text_never_matches() {
        let mut arena = ViewArena::new();
        let root = arena.root();
        arena.push_text(root, "body text");
        let nav = arena.push_element(root, "nav", Some(CHROME_CLASS));
        arena.push_text(nav, "chrome text");

        let mut anchorer = Anchorer::new(arena);
        anchorer.anchor_all(&[highlight("h", "chrome text", "", "")]);
        assert_eq!(anchorer.progress().total, 0);
    }

    #[test]
    fn test_navigation_clamps_and_reports_progress() {
        let mut arena = ViewArena::new();
        let root = arena.root();
        arena.push_text(root, "one stop two stop three");

        let mut anchorer = Anchorer::new(arena);
        anchorer.anchor_all(&[
            highlight("first", "one", "", ""),
            highlight("second", "two", "", ""),
        ]);

        assert_eq!(anchorer.progress(), Progress { current: 0, total: 2 });
        assert_eq!(anchorer.next_highlight(), Progress { current: 1, total: 2 });
        assert_eq!(anchorer.next_highlight(), Progress { current: 2, total: 2 });
        // clamped at the end
        assert_eq!(anchorer.next_highlight(), Progress { current: 2, total: 2 });
        assert_eq!(anchorer.previous_highlight(), Progress { current: 1, total: 2 });
        assert_eq!(anchorer.previous_highlight(), Progress { current: 1, total: 2 });
        assert!(anchorer.scroll_target().is_some());
    }

    #[test]
    fn test_progress_callback_fires_on_changes() {
        let mut arena = ViewArena::new();
        let root = arena.root();
        arena.push_text(root, "navigable content here");

        let seen: Rc<RefCell<Vec<Progress>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let mut anchorer = Anchorer::new(arena);
        anchorer.set_on_progress(Box::new(move |p| sink.borrow_mut().push(p)));
        anchorer.anchor_all(&[highlight("h", "content", "", "")]);
        anchorer.next_highlight();
        anchorer.next_highlight(); // clamped, no change, no event

        let events = seen.borrow();
        assert_eq!(
            *events,
            vec![
                Progress { current: 0, total: 1 },
                Progress { current: 1, total: 1 },
            ]
        );
    }

    #[test]
    fn test_deep_link_focus_by_id() {
        let mut arena = ViewArena::new();
        let root = arena.root();
        arena.push_text(root, "alpha target beta target2 gamma");

        let mut anchorer = Anchorer::new(arena);
        anchorer.anchor_all(&[
            highlight("one", "target ", "alpha", ""),
            highlight("two", "target2", "", "gamma"),
        ]);

        let progress = anchorer.focus_id("two").unwrap();
        assert_eq!(progress, Progress { current: 2, total: 2 });
        assert!(anchorer.focus_id("absent").is_none());
    }

    #[test]
    fn test_overlapping_highlights_share_wrapper() {
        let mut arena = ViewArena::new();
        let root = arena.root();
        arena.push_text(root, "one two three four five");

        let mut anchorer = Anchorer::new(arena);
        anchorer.anchor_all(&[
            highlight("a", "two three", "", ""),
            highlight("b", "three four", "", ""),
        ]);

        assert_eq!(anchorer.progress().total, 1);
        // "three four" is the longest contributor, so the wrapper carries it
        assert_eq!(wrapped_text(&anchorer, "b"), "two three four");
        // the secondary id resolves to the shared wrapper for deep links
        assert_eq!(anchorer.focus_id("a").unwrap(), Progress { current: 1, total: 1 });
    }
}
