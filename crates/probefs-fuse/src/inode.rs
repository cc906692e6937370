//! Inode number bookkeeping.
//!
//! The adapter is path-addressed while the kernel speaks inode numbers, so
//! the binding keeps a bidirectional map. Numbers are handed out on first
//! lookup and stay stable until the path is removed or renamed.

use std::collections::HashMap;

pub type InodeId = u64;
pub const ROOT_INODE: InodeId = 1;

pub struct PathTable {
    by_ino: HashMap<InodeId, String>,
    by_path: HashMap<String, InodeId>,
    next_ino: InodeId,
}

impl PathTable {
    pub fn new() -> Self {
        let mut table = PathTable {
            by_ino: HashMap::new(),
            by_path: HashMap::new(),
            next_ino: 2,
        };
        table.by_ino.insert(ROOT_INODE, String::from("/"));
        table.by_path.insert(String::from("/"), ROOT_INODE);
        table
    }

    pub fn path_of(&self, ino: InodeId) -> Option<&str> {
        self.by_ino.get(&ino).map(|s| s.as_str())
    }

    pub fn ino_of(&self, path: &str) -> Option<InodeId> {
        self.by_path.get(path).copied()
    }

    /// Return the inode number for `path`, allocating one on first sight.
    pub fn assign(&mut self, path: &str) -> InodeId {
        if let Some(ino) = self.by_path.get(path) {
            return *ino;
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.by_ino.insert(ino, path.to_string());
        self.by_path.insert(path.to_string(), ino);
        ino
    }

    /// Re-key an entry after a successful rename. The inode number follows
    /// the file to its new path; an entry already at `new` is evicted.
    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(stale) = self.by_path.remove(new) {
            self.by_ino.remove(&stale);
        }
        if let Some(ino) = self.by_path.remove(old) {
            self.by_ino.insert(ino, new.to_string());
            self.by_path.insert(new.to_string(), ino);
        }
    }

    pub fn remove(&mut self, path: &str) {
        if let Some(ino) = self.by_path.remove(path) {
            self.by_ino.remove(&ino);
        }
    }

    pub fn len(&self) -> usize {
        self.by_ino.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ino.is_empty()
    }
}

impl Default for PathTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Join a parent path and a child name.
pub fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Parent of a path, `/` for top-level entries.
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}
