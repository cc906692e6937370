//! The backing store contract.
//!
//! A backing store is the object that supplies real file data and permission
//! decisions. Every operation is optional: the default implementations return
//! the neutral answer ("no", "nothing", "unsupported"), so a store implements
//! only the capabilities it has, and the adapter never needs to distinguish
//! "capability absent" from "capability declined". A returned `Err` is
//! absorbed at the adapter's call boundary into the same neutral answer; it
//! never crashes the mount.

use std::time::SystemTime;
use thiserror::Error;

/// Failure raised by a backing-store capability.
#[derive(Debug, Error)]
#[error("backing store failure: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        StoreError(msg.into())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError(e.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Capability-probed filesystem backing store.
///
/// Paths are normalized absolute strings ("/" for the root). Predicates
/// answer about the path as the store sees it right now; the adapter layers
/// its own in-flight state (open buffers, shadow files, the created-file
/// marker) on top.
pub trait BackingStore {
    /// Is this path a directory?
    fn is_directory(&mut self, _path: &str) -> StoreResult<bool> {
        Ok(false)
    }

    /// Is this path a regular file?
    fn is_file(&mut self, _path: &str) -> StoreResult<bool> {
        Ok(false)
    }

    /// Should the file carry execute bits?
    fn is_executable(&mut self, _path: &str) -> StoreResult<bool> {
        Ok(false)
    }

    /// May the path be written (created or overwritten)?
    fn can_write(&mut self, _path: &str) -> StoreResult<bool> {
        Ok(false)
    }

    /// May the path be deleted?
    fn can_delete(&mut self, _path: &str) -> StoreResult<bool> {
        Ok(false)
    }

    /// May a directory be created at this path?
    fn can_mkdir(&mut self, _path: &str) -> StoreResult<bool> {
        Ok(false)
    }

    /// May the directory at this path be removed?
    fn can_rmdir(&mut self, _path: &str) -> StoreResult<bool> {
        Ok(false)
    }

    /// Directory listing. `None` means the store has no listing to offer,
    /// which the adapter renders as an empty directory, not an error.
    fn contents(&mut self, _path: &str) -> StoreResult<Option<Vec<String>>> {
        Ok(None)
    }

    /// Whole-file read. `None` means the content is unavailable.
    fn read_file(&mut self, _path: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(None)
    }

    /// Whole-file write. The adapter always passes the complete final
    /// content; there are no partial writes at this boundary.
    fn write_to(&mut self, _path: &str, _data: &[u8]) -> StoreResult<()> {
        Ok(())
    }

    fn delete(&mut self, _path: &str) -> StoreResult<()> {
        Ok(())
    }

    fn mkdir(&mut self, _path: &str) -> StoreResult<()> {
        Ok(())
    }

    fn rmdir(&mut self, _path: &str) -> StoreResult<()> {
        Ok(())
    }

    /// Timestamp update; stores may use this as a side-effect hook.
    fn touch(&mut self, _path: &str) -> StoreResult<()> {
        Ok(())
    }

    fn chmod(&mut self, _path: &str, _mode: u32) -> StoreResult<()> {
        Ok(())
    }

    /// File size in bytes, if the store tracks one.
    fn size(&mut self, _path: &str) -> StoreResult<Option<u64>> {
        Ok(None)
    }

    fn mtime(&mut self, _path: &str) -> StoreResult<Option<SystemTime>> {
        Ok(None)
    }

    fn ctime(&mut self, _path: &str) -> StoreResult<Option<SystemTime>> {
        Ok(None)
    }

    fn atime(&mut self, _path: &str) -> StoreResult<Option<SystemTime>> {
        Ok(None)
    }

    /// Opt into raw passthrough for this path. `mode` is a short string
    /// composed of `r`/`w`/`a` per the requested open flags. Returning true
    /// bypasses the adapter's buffering entirely for this handle; the store
    /// then owns all offset bookkeeping.
    fn raw_open(&mut self, _path: &str, _mode: &str) -> StoreResult<bool> {
        Ok(false)
    }

    /// Read `size` bytes at `offset` from a raw-opened path.
    fn raw_read(&mut self, _path: &str, _offset: u64, _size: u64) -> StoreResult<Option<Vec<u8>>> {
        Ok(None)
    }

    /// Write bytes at `offset` to a raw-opened path.
    fn raw_write(&mut self, _path: &str, _offset: u64, _size: u64, _data: &[u8]) -> StoreResult<()> {
        Ok(())
    }

    /// Close a raw-opened path.
    fn raw_close(&mut self, _path: &str) -> StoreResult<()> {
        Ok(())
    }

    /// Native rename. Returning true means the store moved the file itself
    /// and the adapter performs no further read/write/delete; the neutral
    /// false selects the read+write+delete emulation.
    fn raw_rename(&mut self, _path: &str, _dest: &str) -> StoreResult<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyStore;
    impl BackingStore for EmptyStore {}

    #[test]
    fn default_predicates_answer_no() {
        let mut s = EmptyStore;
        assert!(!s.is_directory("/x").unwrap());
        assert!(!s.is_file("/x").unwrap());
        assert!(!s.is_executable("/x").unwrap());
        assert!(!s.can_write("/x").unwrap());
        assert!(!s.can_delete("/x").unwrap());
        assert!(!s.can_mkdir("/x").unwrap());
        assert!(!s.can_rmdir("/x").unwrap());
    }

    #[test]
    fn default_contents_and_read_are_absent() {
        let mut s = EmptyStore;
        assert!(s.contents("/").unwrap().is_none());
        assert!(s.read_file("/x").unwrap().is_none());
        assert!(s.size("/x").unwrap().is_none());
        assert!(s.mtime("/x").unwrap().is_none());
    }

    #[test]
    fn default_raw_open_declines() {
        let mut s = EmptyStore;
        assert!(!s.raw_open("/x", "r").unwrap());
        assert!(!s.raw_rename("/a", "/b").unwrap());
    }

    #[test]
    fn default_mutations_are_no_ops() {
        let mut s = EmptyStore;
        assert!(s.write_to("/x", b"data").is_ok());
        assert!(s.delete("/x").is_ok());
        assert!(s.mkdir("/d").is_ok());
        assert!(s.rmdir("/d").is_ok());
        assert!(s.touch("/x").is_ok());
        assert!(s.chmod("/x", 0o644).is_ok());
    }

    #[test]
    fn store_error_from_io_error() {
        let io = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let err = StoreError::from(io);
        assert!(!err.to_string().is_empty());
    }
}
