//! The virtual filesystem adapter.
//!
//! Bridges strict offset/size, open-handle POSIX I/O onto a backing store
//! that only understands whole-file reads, whole-file writes, directory
//! listings, and yes/no permission queries. Dispatch is single-threaded: the
//! transport delivers one call at a time and the adapter runs it to
//! completion, so the tables need no locking.

use std::time::SystemTime;
use tracing::{debug, warn};

use crate::attr::FileAttr;
use crate::buffer::FileBuffer;
use crate::classifier::{EditorClass, EditorClassifier};
use crate::config::AdapterConfig;
use crate::error::{FsError, Result};
use crate::marker::CreatedMarker;
use crate::shadow::ShadowStore;
use crate::store::{BackingStore, StoreError};
use crate::table::{Access, OpenEntry, OpenFileTable, OpenMode};

/// Absorb a backing-store failure into the neutral answer.
///
/// Every call into the store funnels through here: a misbehaving store
/// degrades to a wrong or missing result for one filesystem call, it never
/// crashes the mount.
fn absorb<T>(op: &str, path: &str, res: std::result::Result<T, StoreError>, default: T) -> T {
    match res {
        Ok(v) => v,
        Err(e) => {
            warn!("store call {}({}) failed, absorbed: {}", op, path, e);
            default
        }
    }
}

pub struct FsAdapter<S: BackingStore> {
    store: S,
    config: AdapterConfig,
    open: OpenFileTable,
    shadow: ShadowStore,
    classifier: EditorClassifier,
    marker: CreatedMarker,
    init_time: SystemTime,
}

impl<S: BackingStore> FsAdapter<S> {
    pub fn new(store: S, config: AdapterConfig) -> Self {
        let classifier = EditorClassifier::new(config.handle_editor);
        FsAdapter {
            store,
            config,
            open: OpenFileTable::new(),
            shadow: ShadowStore::new(),
            classifier,
            marker: CreatedMarker::new(),
            init_time: SystemTime::now(),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn classify(&mut self, path: &str) -> EditorClass {
        let shadow_exists = self.shadow.contains(path);
        self.classifier.classify(path, shadow_exists)
    }

    /// atime/mtime/ctime probes, defaulting to process start time.
    fn probe_times(&mut self, path: &str) -> (SystemTime, SystemTime, SystemTime) {
        let atime =
            absorb("atime", path, self.store.atime(path), None).unwrap_or(self.init_time);
        let mtime =
            absorb("mtime", path, self.store.mtime(path), None).unwrap_or(self.init_time);
        let ctime =
            absorb("ctime", path, self.store.ctime(path), None).unwrap_or(self.init_time);
        (atime, mtime, ctime)
    }

    fn nlink_for(&self, path: &str) -> u32 {
        1 + u32::from(self.open.contains(path))
    }

    /// Resolve a stat record for `path`.
    ///
    /// Checks run cheapest and most certain first, so freshly created or
    /// in-flight files never require a round trip to a backing store that
    /// does not know about them yet.
    pub fn getattr(&mut self, path: &str) -> Result<FileAttr> {
        debug!("getattr {}", path);

        let (uid, gid) = (self.config.uid, self.config.gid);

        if path == "/" {
            let times = self.probe_times(path);
            return Ok(FileAttr::directory(0o555, uid, gid, times));
        }

        if self.marker.matches(path) {
            let t = self.marker.created_at(path).unwrap_or(self.init_time);
            let nlink = self.nlink_for(path);
            return Ok(FileAttr::file(0, 0o666, nlink, uid, gid, (t, t, t)));
        }

        match self.classify(path) {
            EditorClass::Exists => {
                // shadow size intentionally not reported
                let t = self.init_time;
                return Ok(FileAttr::file(0, 0o444, 1, uid, gid, (t, t, t)));
            }
            EditorClass::Pending => return Err(FsError::not_found(path)),
            EditorClass::NotEditor => {}
        }

        if absorb("is_directory", path, self.store.is_directory(path), false) {
            let times = self.probe_times(path);
            return Ok(FileAttr::directory(0o555, uid, gid, times));
        }

        if absorb("is_file", path, self.store.is_file(path), false) {
            let mut perm = 0o444;
            if absorb("can_write", path, self.store.can_write(path), false) {
                perm |= 0o666;
            }
            if absorb("is_executable", path, self.store.is_executable(path), false) {
                perm |= 0o111;
            }
            let size = absorb("size", path, self.store.size(path), None).unwrap_or(0);
            let nlink = self.nlink_for(path);
            let times = self.probe_times(path);
            return Ok(FileAttr::file(size, perm, nlink, uid, gid, times));
        }

        Err(FsError::not_found(path))
    }

    /// List a directory. `.` and `..` are always present; a store with no
    /// listing to offer yields just those, not an error.
    pub fn readdir(&mut self, path: &str) -> Result<Vec<String>> {
        debug!("readdir {}", path);

        if path != "/" && !absorb("is_directory", path, self.store.is_directory(path), false) {
            return Err(FsError::not_found(path));
        }

        let mut names = vec![String::from("."), String::from("..")];
        if let Some(listing) = absorb("contents", path, self.store.contents(path), None) {
            names.extend(listing);
        }
        Ok(names)
    }

    /// Create a file. The actual work happens at open; this registers the
    /// created-file marker (or a shadow entry for editor droppings) so the
    /// stat that immediately follows sees the path.
    pub fn mknod(&mut self, path: &str, regular: bool) -> Result<()> {
        debug!("mknod {} regular={}", path, regular);

        if self.open.contains(path) {
            return Err(FsError::already_open(path));
        }

        if !regular {
            return Err(FsError::NotSupported {
                op: format!("mknod non-regular file at {}", path),
            });
        }

        match self.classify(path) {
            EditorClass::Exists => return Err(FsError::already_exists(path)),
            EditorClass::Pending => {
                self.shadow.insert_empty(path);
                return Ok(());
            }
            EditorClass::NotEditor => {}
        }

        if absorb("is_file", path, self.store.is_file(path), false) {
            return Err(FsError::already_exists(path));
        }

        if !absorb("can_write", path, self.store.can_write(path), false) {
            // vim's numbered backup files arrive unwritable right after a
            // swap file; capture them in the shadow store too
            if !self.shadow.is_empty() && self.classifier.numeric_backup_candidate(path) {
                self.shadow.insert_empty(path);
                return Ok(());
            }
            return Err(FsError::access_denied(path, "create"));
        }

        self.marker.set(path);
        Ok(())
    }

    pub fn open(&mut self, path: &str, mode: OpenMode) -> Result<()> {
        debug!("open {} mode={:?}", path, mode);

        if self.open.contains(path) {
            return Err(FsError::already_open(path));
        }

        match self.classify(path) {
            // reads and writes hit the shadow entry directly; no open state
            EditorClass::Exists => return Ok(()),
            EditorClass::Pending => return Err(FsError::not_found(path)),
            EditorClass::NotEditor => {}
        }

        let raw_mode = mode.as_raw_str();
        if absorb("raw_open", path, self.store.raw_open(path, &raw_mode), false) {
            self.open.insert(path, OpenEntry::raw());
            return Ok(());
        }

        match (mode.access, mode.append) {
            (Access::ReadOnly, _) => {
                if !absorb("is_file", path, self.store.is_file(path), false) {
                    return Err(FsError::not_found(path));
                }
                let body = absorb("read_file", path, self.store.read_file(path), None)
                    .ok_or_else(|| FsError::not_found(path))?;
                self.open.insert(path, OpenEntry::read_only(&body));
                Ok(())
            }
            (Access::ReadWrite, _) | (Access::WriteOnly, true) => {
                let mut entry = if self.marker.matches(path) {
                    OpenEntry::writable(FileBuffer::new())
                } else {
                    if !absorb("can_write", path, self.store.can_write(path), false) {
                        return Err(FsError::access_denied(path, "open for write"));
                    }
                    if absorb("is_file", path, self.store.is_file(path), false) {
                        let body = absorb("read_file", path, self.store.read_file(path), None)
                            .ok_or_else(|| FsError::not_found(path))?;
                        OpenEntry::writable(FileBuffer::from_contents(&body))
                    } else {
                        OpenEntry::writable(FileBuffer::new())
                    }
                };
                if mode.append {
                    entry.append_offset =
                        entry.buffer.as_ref().map(|b| b.len()).unwrap_or(0) as u64;
                }
                self.open.insert(path, entry);
                Ok(())
            }
            (Access::WriteOnly, false) => {
                let created = self.marker.matches(path);
                if !created && !absorb("can_write", path, self.store.can_write(path), false) {
                    return Err(FsError::access_denied(path, "open for write"));
                }
                self.open.insert(path, OpenEntry::writable(FileBuffer::new()));
                self.marker.clear_if(path);
                Ok(())
            }
        }
    }

    /// Write `data` at `offset`. A path with no open or shadow entry is a
    /// zero-byte no-op, never an error.
    ///
    /// The open file table is consulted first and the shadow store second;
    /// shadow entries are created by mknod and never enter the open table,
    /// so this fallback is the only route shadow writes take.
    pub fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> Result<usize> {
        debug!("write {} offset={} len={}", path, offset, data.len());

        let is_raw = matches!(self.open.get(path), Some(e) if e.raw);
        if is_raw {
            let res = self
                .store
                .raw_write(path, offset, data.len() as u64, data);
            absorb("raw_write", path, res, ());
            return Ok(data.len());
        }

        if let Some(entry) = self.open.get_mut(path) {
            if !entry.write_enabled {
                return Ok(0);
            }
            entry.modified = true;
            let effective = (offset + entry.append_offset) as usize;
            if let Some(buf) = entry.buffer.as_mut() {
                return Ok(buf.write_at(effective, data));
            }
            return Ok(0);
        }

        if let Some(buf) = self.shadow.get_mut(path) {
            return Ok(buf.write_at(offset as usize, data));
        }

        Ok(0)
    }

    /// Read up to `size` bytes at `offset` from an open (or shadow) path.
    pub fn read(&mut self, path: &str, offset: u64, size: usize) -> Result<Vec<u8>> {
        debug!("read {} offset={} size={}", path, offset, size);

        let is_raw = matches!(self.open.get(path), Some(e) if e.raw);
        if is_raw {
            let res = self.store.raw_read(path, offset, size as u64);
            let body = absorb("raw_read", path, res, None);
            return Ok(body.unwrap_or_default());
        }

        if let Some(entry) = self.open.get(path) {
            if let Some(buf) = entry.buffer.as_ref() {
                return Ok(buf.read_at(offset as usize, size).to_vec());
            }
            return Ok(Vec::new());
        }

        if let Some(buf) = self.shadow.get(path) {
            return Ok(buf.read_at(offset as usize, size).to_vec());
        }

        Err(FsError::not_found(path))
    }

    /// Close an open handle, flushing buffered writes to the backing store.
    ///
    /// Editor-classified content never reaches the store; a path living only
    /// in the shadow store is found-but-inert (kept, not flushed).
    pub fn release(&mut self, path: &str) -> Result<()> {
        debug!("release {}", path);

        let editor = self.classify(path) != EditorClass::NotEditor;

        let entry = match self.open.remove(path) {
            Some(e) => e,
            None => {
                if self.shadow.contains(path) {
                    return Ok(());
                }
                return Err(FsError::not_found(path));
            }
        };

        if entry.raw {
            absorb("raw_close", path, self.store.raw_close(path), ());
            return Ok(());
        }

        if entry.write_enabled && !editor {
            // unmodified handles flush anyway when editor handling is off,
            // matching stores that expect a write per open-for-write
            if entry.modified || !self.config.handle_editor {
                if let Some(buf) = entry.buffer.as_ref() {
                    let res = self.store.write_to(path, buf.contents());
                    absorb("write_to", path, res, ());
                }
            }
        }

        Ok(())
    }

    /// Truncate to `offset` bytes. Editor files only move their in-memory
    /// logical size; everything else is a whole-file rewrite of the sliced
    /// content. An offset at or past the current size is a no-op.
    pub fn truncate(&mut self, path: &str, offset: u64) -> Result<()> {
        debug!("truncate {} offset={}", path, offset);

        if self.classify(path) != EditorClass::NotEditor {
            if let Some(entry) = self.open.get_mut(path) {
                if let Some(buf) = entry.buffer.as_mut() {
                    buf.truncate(offset as usize);
                }
            } else if let Some(buf) = self.shadow.get_mut(path) {
                buf.truncate(offset as usize);
            }
            return Ok(());
        }

        if !absorb("is_file", path, self.store.is_file(path), false) {
            return Err(FsError::not_found(path));
        }
        if !absorb("can_delete", path, self.store.can_delete(path), false) {
            return Err(FsError::access_denied(path, "truncate"));
        }

        let content =
            absorb("read_file", path, self.store.read_file(path), None).unwrap_or_default();
        if offset as usize >= content.len() {
            return Ok(());
        }
        let res = self.store.write_to(path, &content[..offset as usize]);
        absorb("write_to", path, res, ());
        Ok(())
    }

    /// Rename by emulation: the store has no native move unless it offers
    /// `raw_rename`. The read+write+delete fallback is not transactional; a
    /// store failing midway can leave both paths populated.
    pub fn rename(&mut self, src: &str, dst: &str) -> Result<()> {
        debug!("rename {} -> {}", src, dst);

        let from_shadow = self.classify(src) == EditorClass::Exists;

        if !from_shadow {
            if !absorb("is_file", src, self.store.is_file(src), false) {
                return Err(FsError::not_found(src));
            }
            if !absorb("can_delete", src, self.store.can_delete(src), false) {
                return Err(FsError::access_denied(src, "rename"));
            }
        }

        if !absorb("can_write", dst, self.store.can_write(dst), false) {
            return Err(FsError::access_denied(dst, "rename"));
        }

        if from_shadow {
            // moving an editor file out of the shadow store materializes it
            if let Some(buf) = self.shadow.remove(src) {
                let res = self.store.write_to(dst, buf.contents());
                absorb("write_to", dst, res, ());
            }
            return Ok(());
        }

        if absorb("raw_rename", src, self.store.raw_rename(src, dst), false) {
            return Ok(());
        }

        let body = absorb("read_file", src, self.store.read_file(src), None).unwrap_or_default();
        let res = self.store.write_to(dst, &body);
        absorb("write_to", dst, res, ());
        let res = self.store.delete(src);
        absorb("delete", src, res, ());
        Ok(())
    }

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        debug!("unlink {}", path);

        match self.classify(path) {
            EditorClass::Exists => {
                self.shadow.remove(path);
                return Ok(());
            }
            EditorClass::Pending => return Err(FsError::not_found(path)),
            EditorClass::NotEditor => {}
        }

        if !absorb("is_file", path, self.store.is_file(path), false) {
            return Err(FsError::not_found(path));
        }
        if !absorb("can_delete", path, self.store.can_delete(path), false) {
            return Err(FsError::access_denied(path, "unlink"));
        }
        let res = self.store.delete(path);
        absorb("delete", path, res, ());
        Ok(())
    }

    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        debug!("mkdir {}", path);

        if absorb("is_directory", path, self.store.is_directory(path), false)
            || absorb("is_file", path, self.store.is_file(path), false)
        {
            return Err(FsError::already_exists(path));
        }
        if !absorb("can_mkdir", path, self.store.can_mkdir(path), false) {
            return Err(FsError::access_denied(path, "mkdir"));
        }
        let res = self.store.mkdir(path);
        absorb("mkdir", path, res, ());
        Ok(())
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        debug!("rmdir {}", path);

        if !absorb("is_directory", path, self.store.is_directory(path), false) {
            if absorb("is_file", path, self.store.is_file(path), false) {
                return Err(FsError::NotDirectory {
                    path: path.to_string(),
                });
            }
            return Err(FsError::not_found(path));
        }
        if !absorb("can_rmdir", path, self.store.can_rmdir(path), false) {
            return Err(FsError::access_denied(path, "rmdir"));
        }
        let res = self.store.rmdir(path);
        absorb("rmdir", path, res, ());
        Ok(())
    }

    /// Forward a chmod to the store's hook. Succeeds regardless; there is no
    /// real permission model to update.
    pub fn chmod(&mut self, path: &str, mode: u32) -> Result<()> {
        debug!("chmod {} mode={:o}", path, mode);
        let res = self.store.chmod(path, mode & 0x7FFF);
        absorb("chmod", path, res, ());
        Ok(())
    }

    /// Forward a timestamp update to the store's hook; stores use this as a
    /// side-effect trigger. Always succeeds.
    pub fn touch(&mut self, path: &str) -> Result<()> {
        debug!("touch {}", path);
        let res = self.store.touch(path);
        absorb("touch", path, res, ());
        Ok(())
    }
}
