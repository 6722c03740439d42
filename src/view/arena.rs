//! An index-based model of a rendered view: elements and text runs in a
//! flat arena, addressed by id. The anchorer snapshots the arena's text
//! content once and mutates nodes only through splits that keep earlier
//! offsets valid.

pub type NodeId = usize;

/// Class used by surrounding chrome (controls, navigation bars) to flag a
/// subtree as non-content; such subtrees never join the match corpus.
pub const CHROME_CLASS: &str = "mg-chrome";

/// Class carried by the visual wrappers the anchorer inserts.
pub const MARK_CLASS: &str = "mg-highlight";

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element {
        tag: String,
        class: Option<String>,
        data_id: Option<String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
}

/// A text node's slice of the concatenated content snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TextRun {
    pub node: NodeId,
    pub start: usize,
    pub len: usize,
}

impl TextRun {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Debug)]
pub struct ViewArena {
    nodes: Vec<Node>,
    root: NodeId,
}

impl ViewArena {
    pub fn new() -> Self {
        let root = Node {
            kind: NodeKind::Element {
                tag: "div".to_string(),
                class: None,
                data_id: None,
            },
            children: Vec::new(),
        };
        ViewArena {
            nodes: vec![root],
            root: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn push_element(&mut self, parent: NodeId, tag: &str, class: Option<&str>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Element {
                tag: tag.to_string(),
                class: class.map(str::to_string),
                data_id: None,
            },
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn push_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Text(text.to_string()),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn is_content(&self, id: NodeId) -> bool {
        match &self.nodes[id].kind {
            NodeKind::Text(_) => true,
            NodeKind::Element { tag, class, .. } => {
                if tag == "script" || tag == "style" {
                    return false;
                }
                !class.as_deref().is_some_and(|c| c.split_whitespace().any(|c| c == CHROME_CLASS))
            }
        }
    }

    /// Document-order text runs of all content subtrees, with offsets into
    /// the concatenated raw text they form together.
    pub fn text_runs(&self) -> (String, Vec<TextRun>) {
        let mut raw = String::new();
        let mut runs = Vec::new();
        self.collect_runs(self.root, &mut raw, &mut runs);
        (raw, runs)
    }

    fn collect_runs(&self, id: NodeId, raw: &mut String, runs: &mut Vec<TextRun>) {
        if !self.is_content(id) {
            return;
        }
        match &self.nodes[id].kind {
            NodeKind::Text(text) => {
                runs.push(TextRun {
                    node: id,
                    start: raw.len(),
                    len: text.len(),
                });
                raw.push_str(text);
            }
            NodeKind::Element { .. } => {
                for &child in &self.nodes[id].children {
                    self.collect_runs(child, raw, runs);
                }
            }
        }
    }

    /// Concatenated descendant text of a node, chrome included (test and
    /// debugging aid, not the match corpus).
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.append_text(id, &mut out);
        out
    }

    fn append_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for &child in &self.nodes[id].children {
                    self.append_text(child, out);
                }
            }
        }
    }

    pub fn marks(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|&id| {
                matches!(
                    &self.nodes[id].kind,
                    NodeKind::Element { class: Some(c), .. } if c == MARK_CLASS
                )
            })
            .collect()
    }

    pub fn mark_data_id(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { data_id, .. } => data_id.as_deref(),
            NodeKind::Text(_) => None,
        }
    }

    /// Splits `[start, end)` out of a text node and wraps it in a mark
    /// element. The original node keeps its id and retains the text before
    /// `start`, so offsets below `start` stay valid after the mutation.
    /// Returns `None` when the target is not a text node or is detached.
    pub fn wrap_text_range(
        &mut self,
        text_node: NodeId,
        start: usize,
        end: usize,
        data_id: &str,
    ) -> Option<NodeId> {
        let (wrapped, trailing) = match &mut self.nodes[text_node].kind {
            NodeKind::Text(text) => {
                if end > text.len() || start > end {
                    return None;
                }
                let wrapped = text[start..end].to_string();
                let trailing = text[end..].to_string();
                text.truncate(start);
                (wrapped, trailing)
            }
            NodeKind::Element { .. } => return None,
        };

        let parent = self.parent_of(text_node)?;
        let position = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == text_node)?;

        let mark = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Element {
                tag: "mark".to_string(),
                class: Some(MARK_CLASS.to_string()),
                data_id: Some(data_id.to_string()),
            },
            children: Vec::new(),
        });
        let inner = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Text(wrapped),
            children: Vec::new(),
        });
        self.nodes[mark].children.push(inner);
        self.nodes[parent].children.insert(position + 1, mark);

        if !trailing.is_empty() {
            let tail = self.nodes.len();
            self.nodes.push(Node {
                kind: NodeKind::Text(trailing),
                children: Vec::new(),
            });
            self.nodes[parent].children.insert(position + 2, tail);
        }

        Some(mark)
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        (0..self.nodes.len()).find(|&candidate| self.nodes[candidate].children.contains(&id))
    }
}

impl Default for ViewArena {
    fn default() -> Self {
        Self::new()
    }
}
