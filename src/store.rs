//! Canonical persistence for highlight documents: one JSON record per
//! library path, content-addressed under a digest of the normalized path and
//! sharded by the digest's first two characters to bound directory fan-out.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::model::{DOCUMENT_VERSION, HighlightDocument, normalize_highlights, now_timestamp};

pub struct HighlightStore {
    root: PathBuf,
}

impl HighlightStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(HighlightStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical form of a library-relative path: percent-decoded, forward
    /// slashes, no leading `./` or `/`, no empty segments.
    pub fn normalize_path(path: &str) -> String {
        let decoded = urlencoding::decode(path)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| path.to_string());
        let slashed = decoded.trim().replace('\\', "/");

        let mut segments: Vec<&str> = Vec::new();
        for segment in slashed.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            }
            segments.push(segment);
        }
        segments.join("/")
    }

    fn shard_dir(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.root.join(&digest[..2])
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.shard_dir(key).join(format!("{}.json", digest))
    }

    /// Loads the highlight document for a path. Never fails: a missing,
    /// unreadable or corrupt record is treated as "no highlights".
    pub fn load(&self, path: &str) -> HighlightDocument {
        let key = Self::normalize_path(path);
        let record = self.record_path(&key);

        let bytes = match fs::read(&record) {
            Ok(bytes) => bytes,
            Err(_) => return HighlightDocument::empty(&key),
        };

        match serde_json::from_slice::<HighlightDocument>(&bytes) {
            Ok(mut doc) => {
                doc.path = key;
                doc
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %key, "corrupt highlight record, treating as empty");
                HighlightDocument::empty(&key)
            }
        }
    }

    /// Replaces the document's highlight list wholesale. The input is
    /// normalized (ids generated, texts trimmed, empties dropped) and the
    /// record is written atomically via temp-file + rename. An empty list
    /// deletes the record and prunes the shard directory if nothing else
    /// remains in it.
    pub fn save(&self, path: &str, mut doc: HighlightDocument) -> Result<HighlightDocument, StoreError> {
        let key = Self::normalize_path(path);
        if key.is_empty() {
            return Err(StoreError::EmptyPath);
        }

        doc.version = DOCUMENT_VERSION;
        doc.path = key.clone();
        doc.updated_at = now_timestamp();
        doc.highlights = normalize_highlights(doc.highlights);

        let record = self.record_path(&key);
        if doc.highlights.is_empty() {
            self.remove_record(&record)?;
            return Ok(doc);
        }

        let shard = self.shard_dir(&key);
        fs::create_dir_all(&shard)?;

        let json = serde_json::to_string_pretty(&doc)?;
        let mut temp = NamedTempFile::new_in(shard)?;
        temp.write_all(json.as_bytes())?;
        temp.flush()?;
        temp.persist(&record)
            .map_err(|e| StoreError::PersistFailed(e.error.to_string()))?;

        Ok(doc)
    }

    /// Whether a highlight record exists for the path. Records only exist
    /// while their highlight list is non-empty, so presence implies content.
    pub fn exists(&self, path: &str) -> bool {
        let key = Self::normalize_path(path);
        self.record_path(&key).is_file()
    }

    fn remove_record(&self, record: &Path) -> Result<(), StoreError> {
        match fs::remove_file(record) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        if let Some(shard) = record.parent() {
            // succeeds only when the shard directory is empty
            let _ = fs::remove_dir(shard);
        }
        Ok(())
    }
}
