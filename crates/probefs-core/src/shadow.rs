//! In-memory shadow store for editor temp files.
//!
//! Shadow entries never touch the backing store and survive release; they
//! die only when the file is unlinked or renamed away.

use crate::buffer::FileBuffer;
use std::collections::HashMap;
use tracing::debug;

#[derive(Default)]
pub struct ShadowStore {
    entries: HashMap<String, FileBuffer>,
}

impl ShadowStore {
    pub fn new() -> Self {
        ShadowStore {
            entries: HashMap::new(),
        }
    }

    /// Track a new, empty shadow file (pre-sized to one growth block).
    pub fn insert_empty(&mut self, path: &str) {
        debug!("shadow entry created: {}", path);
        self.entries.insert(path.to_string(), FileBuffer::new());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&FileBuffer> {
        self.entries.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut FileBuffer> {
        self.entries.get_mut(path)
    }

    /// Remove an entry, handing its buffer to the caller (used by rename,
    /// which moves the bytes into the backing store).
    pub fn remove(&mut self, path: &str) -> Option<FileBuffer> {
        let entry = self.entries.remove(path);
        if entry.is_some() {
            debug!("shadow entry removed: {}", path);
        }
        entry
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}
