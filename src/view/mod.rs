//! View Module
//!
//! The live-view side of highlight anchoring: given an already rendered
//! view and a document's highlight list, wrap each resolved passage in a
//! visual marker and support navigating between the wrapped passages.
//!
//! Resolution runs against one immutable snapshot of the view's text
//! content, taken before any mutation; wrappers are then applied from the
//! document end backwards. Wrapping one highlight therefore never shifts
//! the resolved range of a highlight that has not been wrapped yet, no
//! matter how the two fall across text nodes.
//!
//! # Usage
//!
//! ```rust,ignore
//! use marginalia::view::{Anchorer, ViewArena};
//!
//! let mut anchorer = Anchorer::new(arena);
//! anchorer.set_on_progress(Box::new(|p| update_chrome(p)));
//! anchorer.anchor_all(&document.highlights);
//!
//! // deep link from a URL fragment, before any navigation
//! anchorer.focus_id(&fragment_id);
//!
//! // toolbar navigation
//! let progress = anchorer.next_highlight();
//! scroll_into_view(anchorer.scroll_target());
//! ```

mod anchor;
mod arena;

pub use anchor::{Anchorer, Progress, ProgressCallback};
pub use arena::{CHROME_CLASS, MARK_CLASS, Node, NodeId, NodeKind, TextRun, ViewArena};
