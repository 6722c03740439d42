use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

pub const DOCUMENT_VERSION: u32 = 1;

/// A user-captured passage plus enough context to relocate it later.
/// Unknown fields supplied by clients ride along in `extra` and survive a
/// save/load cycle untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Highlight {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

/// One record per document. Identity is the normalized library-relative
/// path; the whole highlight list is replaced on every save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightDocument {
    pub version: u32,
    pub path: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
}

impl HighlightDocument {
    pub fn empty(path: &str) -> Self {
        HighlightDocument {
            version: DOCUMENT_VERSION,
            path: path.to_string(),
            url: None,
            title: None,
            updated_at: String::new(),
            highlights: Vec::new(),
        }
    }
}

/// A resolved `[start, end)` range in source-byte coordinates for one
/// highlight. Produced only during matching, never persisted.
#[derive(Debug, Clone)]
pub struct Span<'a> {
    pub start: usize,
    pub end: usize,
    pub highlight: &'a Highlight,
}

/// The unit actually rendered or marked: overlapping spans merged into one
/// disjoint range, with every contributing highlight's identity kept.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedSpan {
    pub start: usize,
    pub end: usize,
    pub primary_id: String,
    pub created_at: String,
    pub secondary_ids: Vec<String>,
}

impl ConsolidatedSpan {
    /// Every id carried by this span, primary first.
    pub fn all_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.primary_id.as_str()];
        ids.extend(self.secondary_ids.iter().map(|s| s.as_str()));
        ids
    }
}

pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn generate_id(text: &str, prefix: &str, suffix: &str, created_at: &str, salt: Option<usize>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b"|");
    hasher.update(prefix.as_bytes());
    hasher.update(b"|");
    hasher.update(suffix.as_bytes());
    hasher.update(b"|");
    hasher.update(created_at.as_bytes());
    if let Some(salt) = salt {
        hasher.update(b"|");
        hasher.update(salt.to_string().as_bytes());
    }
    let digest = hasher.finalize();
    hex::encode(digest)[..12].to_string()
}

/// Fills missing ids and timestamps, trims highlight text, and drops
/// highlights that are empty after trimming. Ids are kept unique within the
/// document by folding the list index into the digest on collision.
pub fn normalize_highlights(highlights: Vec<Highlight>) -> Vec<Highlight> {
    let mut seen: Vec<String> = Vec::new();
    let mut normalized = Vec::with_capacity(highlights.len());

    for (index, mut h) in highlights.into_iter().enumerate() {
        let trimmed = h.text.trim();
        if trimmed.is_empty() {
            continue;
        }
        h.text = trimmed.to_string();

        if h.created_at.is_empty() {
            h.created_at = now_timestamp();
        }

        if h.id.trim().is_empty() {
            let mut id = generate_id(&h.text, &h.prefix, &h.suffix, &h.created_at, None);
            if seen.contains(&id) {
                id = generate_id(&h.text, &h.prefix, &h.suffix, &h.created_at, Some(index));
            }
            h.id = id;
        }

        if !seen.contains(&h.id) {
            seen.push(h.id.clone());
        }
        normalized.push(h);
    }

    normalized
}
