//! Open file table: buffered or raw per-path state between open and release.

use crate::buffer::FileBuffer;
use std::collections::HashMap;
use tracing::debug;

/// Requested access for an open call, derived from the POSIX flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub access: Access,
    pub append: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl OpenMode {
    pub fn from_flags(flags: i32) -> Self {
        let access = match flags & libc::O_ACCMODE {
            libc::O_WRONLY => Access::WriteOnly,
            libc::O_RDWR => Access::ReadWrite,
            _ => Access::ReadOnly,
        };
        OpenMode {
            access,
            append: flags & libc::O_APPEND != 0,
        }
    }

    /// Short mode string handed to `raw_open`: `r`/`w` per access, plus `a`
    /// when append was requested.
    pub fn as_raw_str(&self) -> String {
        let mut s = String::new();
        match self.access {
            Access::ReadOnly => s.push('r'),
            Access::WriteOnly => s.push('w'),
            Access::ReadWrite => {
                s.push('w');
                s.push('r');
            }
        }
        if self.append {
            s.push('a');
        }
        s
    }
}

/// Per-path open state. Raw entries carry no buffer; every read/write/close
/// forwards straight to the backing store.
#[derive(Debug)]
pub struct OpenEntry {
    pub buffer: Option<FileBuffer>,
    pub append_offset: u64,
    pub modified: bool,
    pub raw: bool,
    pub write_enabled: bool,
}

impl OpenEntry {
    pub fn raw() -> Self {
        OpenEntry {
            buffer: None,
            append_offset: 0,
            modified: false,
            raw: true,
            write_enabled: false,
        }
    }

    pub fn read_only(content: &[u8]) -> Self {
        OpenEntry {
            buffer: Some(FileBuffer::from_contents(content)),
            append_offset: 0,
            modified: false,
            raw: false,
            write_enabled: false,
        }
    }

    pub fn writable(buffer: FileBuffer) -> Self {
        OpenEntry {
            buffer: Some(buffer),
            append_offset: 0,
            modified: false,
            raw: false,
            write_enabled: true,
        }
    }
}

/// All live open handles, keyed by path. One live entry per path: a second
/// open of the same path is rejected upstream with already-open.
#[derive(Default)]
pub struct OpenFileTable {
    entries: HashMap<String, OpenEntry>,
}

impl OpenFileTable {
    pub fn new() -> Self {
        OpenFileTable {
            entries: HashMap::new(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn insert(&mut self, path: &str, entry: OpenEntry) {
        debug!(
            "open entry tracked: {} (raw={}, write={})",
            path, entry.raw, entry.write_enabled
        );
        self.entries.insert(path.to_string(), entry);
    }

    pub fn get(&self, path: &str) -> Option<&OpenEntry> {
        self.entries.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut OpenEntry> {
        self.entries.get_mut(path)
    }

    pub fn remove(&mut self, path: &str) -> Option<OpenEntry> {
        let entry = self.entries.remove(path);
        if entry.is_some() {
            debug!("open entry released: {}", path);
        }
        entry
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}
