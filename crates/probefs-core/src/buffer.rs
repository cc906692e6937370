//! Growable byte buffer backing open-file and shadow-file state.
//!
//! Capacity is always rounded up to multiples of [`GROW_BLOCK`] and always
//! exceeds the logical length by at least one byte, leaving room for a
//! trailing guard byte. Read/write boundary behavior depends on this exact
//! rounding policy, so it is preserved as-is.

use tracing::trace;

/// Unit by which buffer capacity grows.
pub const GROW_BLOCK: usize = 1024;

#[derive(Debug, Clone)]
pub struct FileBuffer {
    data: Vec<u8>,
    len: usize,
}

/// Smallest multiple of [`GROW_BLOCK`] that fits `needed` bytes.
fn round_up(needed: usize) -> usize {
    let mut size = needed + GROW_BLOCK;
    size -= size % GROW_BLOCK;
    size
}

impl FileBuffer {
    /// Empty buffer pre-sized to one growth block.
    pub fn new() -> Self {
        FileBuffer {
            data: vec![0; GROW_BLOCK],
            len: 0,
        }
    }

    /// Buffer seeded from existing content, capacity content length + 1.
    pub fn from_contents(content: &[u8]) -> Self {
        let mut data = Vec::with_capacity(content.len() + 1);
        data.extend_from_slice(content);
        data.push(0);
        FileBuffer {
            data,
            len: content.len(),
        }
    }

    /// Logical size in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated capacity, always greater than `len()`.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// First `len()` bytes.
    pub fn contents(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Copy `data` in at `offset`, growing to a block multiple when
    /// `offset + data.len() + 1` exceeds capacity. Extends the logical size
    /// to cover the written range and rewrites the guard byte. Returns the
    /// byte count written.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> usize {
        let end = offset + data.len();
        if end + 1 > self.data.len() {
            let new_cap = round_up(end + 1);
            trace!(
                "growing buffer: capacity {} -> {} for write at {}+{}",
                self.data.len(),
                new_cap,
                offset,
                data.len()
            );
            self.data.resize(new_cap, 0);
        }
        self.data[offset..end].copy_from_slice(data);
        if end > self.len {
            self.len = end;
        }
        self.data[self.len] = 0;
        data.len()
    }

    /// Read up to `size` bytes at `offset`, clamped to the logical size.
    /// An offset at or past the end reads nothing.
    pub fn read_at(&self, offset: usize, size: usize) -> &[u8] {
        if offset >= self.len {
            return &[];
        }
        let end = self.len.min(offset + size);
        &self.data[offset..end]
    }

    /// Shrink (or extend) the logical size without touching the allocation.
    /// Bytes past the new size stay physically present until overwritten; a
    /// later extending write that skips the gap can expose them. Inherited
    /// behavior, kept deliberately.
    pub fn truncate(&mut self, len: usize) {
        self.len = len.min(self.data.len().saturating_sub(1));
    }
}

impl Default for FileBuffer {
    fn default() -> Self {
        Self::new()
    }
}
