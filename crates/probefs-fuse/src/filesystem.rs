//! `fuser::Filesystem` glue over the core adapter.
//!
//! Translates inode-numbered kernel requests into the adapter's path-keyed
//! operations. All state lives behind `&mut self`; fuser dispatches one
//! request at a time, which is exactly the serial model the adapter assumes.

use std::ffi::OsStr;
use std::os::raw::c_int;
use std::time::{Duration, SystemTime};

use fuser::{
    FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use tracing::debug;

use probefs_core::attr::{FileAttr as CoreAttr, FileKind};
use probefs_core::table::OpenMode;
use probefs_core::{AdapterConfig, BackingStore, FsAdapter};

use crate::inode::{child_path, parent_path, InodeId, PathTable, ROOT_INODE};

#[derive(Debug, Clone)]
pub struct FuseConfig {
    pub adapter: AdapterConfig,
    pub attr_timeout: Duration,
    pub entry_timeout: Duration,
}

impl Default for FuseConfig {
    fn default() -> Self {
        Self {
            adapter: AdapterConfig::default(),
            attr_timeout: Duration::from_secs(1),
            entry_timeout: Duration::from_secs(1),
        }
    }
}

pub struct ProbeFs<S: BackingStore> {
    config: FuseConfig,
    adapter: FsAdapter<S>,
    paths: PathTable,
}

impl<S: BackingStore> ProbeFs<S> {
    pub fn new(store: S, config: FuseConfig) -> Self {
        let adapter = FsAdapter::new(store, config.adapter.clone());
        Self {
            config,
            adapter,
            paths: PathTable::new(),
        }
    }

    pub fn config(&self) -> &FuseConfig {
        &self.config
    }

    fn path_for(&self, ino: InodeId) -> Option<String> {
        self.paths.path_of(ino).map(|p| p.to_string())
    }

    fn child_of(&self, parent: InodeId, name: &OsStr) -> Option<String> {
        let parent_path = self.paths.path_of(parent)?;
        Some(child_path(parent_path, &name.to_string_lossy()))
    }

    /// Atomic create+open composition.
    ///
    /// The stat record is taken between mknod and open: a write-only open
    /// consumes the created-file marker, so a trailing getattr would no
    /// longer see the freshly created path.
    fn create_entry(
        &mut self,
        path: &str,
        regular: bool,
        flags: i32,
    ) -> Result<CoreAttr, probefs_core::FsError> {
        self.adapter.mknod(path, regular)?;
        let attr = self.adapter.getattr(path)?;
        self.adapter.open(path, OpenMode::from_flags(flags))?;
        Ok(attr)
    }
}

fn attr_to_fuser(ino: InodeId, attr: &CoreAttr) -> fuser::FileAttr {
    let kind = match attr.kind {
        FileKind::Directory => FileType::Directory,
        FileKind::RegularFile => FileType::RegularFile,
    };
    fuser::FileAttr {
        ino,
        size: attr.size,
        blocks: attr.size.div_ceil(512),
        atime: attr.atime,
        mtime: attr.mtime,
        ctime: attr.ctime,
        crtime: SystemTime::UNIX_EPOCH,
        kind,
        perm: attr.perm,
        nlink: attr.nlink,
        uid: attr.uid,
        gid: attr.gid,
        rdev: 0,
        blksize: 4096,
        flags: 0,
    }
}

impl<S: BackingStore> Filesystem for ProbeFs<S> {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        debug!("probefs filesystem init");
        Ok(())
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        debug!("lookup parent={} name={}", parent, name.to_string_lossy());

        let path = match self.child_of(parent, name) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match self.adapter.getattr(&path) {
            Ok(attr) => {
                let ino = self.paths.assign(&path);
                reply.entry(&self.config.entry_timeout, &attr_to_fuser(ino, &attr), 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        debug!("getattr ino={}", ino);

        let path = match self.path_for(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match self.adapter.getattr(&path) {
            Ok(attr) => reply.attr(&self.config.attr_timeout, &attr_to_fuser(ino, &attr)),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        debug!("setattr ino={} size={:?} mode={:?}", ino, size, mode);

        let path = match self.path_for(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        if let Some(new_size) = size {
            if let Err(e) = self.adapter.truncate(&path, new_size) {
                reply.error(e.to_errno());
                return;
            }
        }

        if let Some(new_mode) = mode {
            if let Err(e) = self.adapter.chmod(&path, new_mode) {
                reply.error(e.to_errno());
                return;
            }
        }

        if atime.is_some() || mtime.is_some() {
            if let Err(e) = self.adapter.touch(&path) {
                reply.error(e.to_errno());
                return;
            }
        }

        match self.adapter.getattr(&path) {
            Ok(attr) => reply.attr(&self.config.attr_timeout, &attr_to_fuser(ino, &attr)),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        debug!(
            "mknod parent={} name={} mode={:o}",
            parent,
            name.to_string_lossy(),
            mode
        );

        let path = match self.child_of(parent, name) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let regular = mode & libc::S_IFMT == libc::S_IFREG;
        if let Err(e) = self.adapter.mknod(&path, regular) {
            reply.error(e.to_errno());
            return;
        }

        match self.adapter.getattr(&path) {
            Ok(attr) => {
                let ino = self.paths.assign(&path);
                reply.entry(&self.config.entry_timeout, &attr_to_fuser(ino, &attr), 0);
            }
            Err(_) => reply.error(libc::EIO),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        debug!(
            "mkdir parent={} name={} mode={:o}",
            parent,
            name.to_string_lossy(),
            mode
        );

        let path = match self.child_of(parent, name) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        if let Err(e) = self.adapter.mkdir(&path) {
            reply.error(e.to_errno());
            return;
        }

        match self.adapter.getattr(&path) {
            Ok(attr) => {
                let ino = self.paths.assign(&path);
                reply.entry(&self.config.entry_timeout, &attr_to_fuser(ino, &attr), 0);
            }
            Err(_) => reply.error(libc::EIO),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!("unlink parent={} name={}", parent, name.to_string_lossy());

        let path = match self.child_of(parent, name) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match self.adapter.unlink(&path) {
            Ok(()) => {
                self.paths.remove(&path);
                reply.ok();
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!("rmdir parent={} name={}", parent, name.to_string_lossy());

        let path = match self.child_of(parent, name) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match self.adapter.rmdir(&path) {
            Ok(()) => {
                self.paths.remove(&path);
                reply.ok();
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let src = match self.child_of(parent, name) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };
        let dst = match self.child_of(newparent, newname) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };
        debug!("rename {} -> {}", src, dst);

        match self.adapter.rename(&src, &dst) {
            Ok(()) => {
                self.paths.rename(&src, &dst);
                reply.ok();
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("open ino={} flags={:#o}", ino, flags);

        let path = match self.path_for(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match self.adapter.open(&path, OpenMode::from_flags(flags)) {
            // open state is keyed by path in the adapter, no handle needed
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!("read ino={} offset={} size={}", ino, offset, size);

        let path = match self.path_for(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let offset = offset.max(0) as u64;
        match self.adapter.read(&path, offset, size as usize) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        debug!("write ino={} offset={} size={}", ino, offset, data.len());

        let path = match self.path_for(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let offset = offset.max(0) as u64;
        match self.adapter.write(&path, offset, data) {
            Ok(n) => reply.written(n as u32),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn flush(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        debug!("flush");
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        debug!("release ino={}", ino);

        let path = match self.path_for(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match self.adapter.release(&path) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        debug!("opendir ino={}", ino);

        let path = match self.path_for(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match self.adapter.getattr(&path) {
            Ok(attr) if attr.kind == FileKind::Directory => reply.opened(0, 0),
            Ok(_) => reply.error(libc::ENOTDIR),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("readdir ino={} offset={}", ino, offset);

        let path = match self.path_for(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let names = match self.adapter.readdir(&path) {
            Ok(names) => names,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        let parent_ino = self
            .paths
            .ino_of(parent_path(&path))
            .unwrap_or(ROOT_INODE);

        for (i, name) in names.iter().enumerate().skip(offset.max(0) as usize) {
            let (entry_ino, kind) = match name.as_str() {
                "." => (ino, FileType::Directory),
                ".." => (parent_ino, FileType::Directory),
                _ => {
                    let entry_path = child_path(&path, name);
                    let kind = match self.adapter.getattr(&entry_path) {
                        Ok(attr) if attr.kind == FileKind::Directory => FileType::Directory,
                        _ => FileType::RegularFile,
                    };
                    (self.paths.assign(&entry_path), kind)
                }
            };

            if reply.add(entry_ino, (i + 1) as i64, kind, name) {
                break;
            }
        }

        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        debug!("releasedir");
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        debug!("statfs");
        reply.statfs(
            1024 * 1024,
            1024 * 1024,
            1024 * 1024,
            1_000_000,
            1_000_000,
            4096,
            255,
            4096,
        );
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        debug!(
            "create parent={} name={} mode={:o} flags={:#o}",
            parent,
            name.to_string_lossy(),
            mode,
            flags
        );

        let path = match self.child_of(parent, name) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let regular = mode & libc::S_IFMT == libc::S_IFREG;
        match self.create_entry(&path, regular, flags) {
            Ok(attr) => {
                let ino = self.paths.assign(&path);
                reply.created(
                    &self.config.entry_timeout,
                    &attr_to_fuser(ino, &attr),
                    0,
                    0,
                    flags as u32,
                );
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probefs_core::store::StoreResult;

    use std::collections::HashMap;

    struct EmptyStore;

    impl BackingStore for EmptyStore {
        fn is_file(&mut self, path: &str) -> StoreResult<bool> {
            Ok(path == "/hello.txt")
        }

        fn size(&mut self, path: &str) -> StoreResult<Option<u64>> {
            Ok((path == "/hello.txt").then_some(5))
        }
    }

    /// Writable store for exercising the create+open composition.
    #[derive(Default)]
    struct WritableStore {
        files: HashMap<String, Vec<u8>>,
    }

    impl BackingStore for WritableStore {
        fn is_file(&mut self, path: &str) -> StoreResult<bool> {
            Ok(self.files.contains_key(path))
        }

        fn can_write(&mut self, _path: &str) -> StoreResult<bool> {
            Ok(true)
        }

        fn read_file(&mut self, path: &str) -> StoreResult<Option<Vec<u8>>> {
            Ok(self.files.get(path).cloned())
        }

        fn write_to(&mut self, path: &str, data: &[u8]) -> StoreResult<()> {
            self.files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn size(&mut self, path: &str) -> StoreResult<Option<u64>> {
            Ok(self.files.get(path).map(|v| v.len() as u64))
        }
    }

    fn make_fs() -> ProbeFs<EmptyStore> {
        ProbeFs::new(EmptyStore, FuseConfig::default())
    }

    #[test]
    fn default_config_timeouts() {
        let config = FuseConfig::default();
        assert_eq!(config.attr_timeout, Duration::from_secs(1));
        assert_eq!(config.entry_timeout, Duration::from_secs(1));
    }

    #[test]
    fn attr_to_fuser_maps_directory() {
        let now = SystemTime::now();
        let attr = CoreAttr::directory(0o555, 1000, 1000, (now, now, now));
        let fattr = attr_to_fuser(ROOT_INODE, &attr);
        assert_eq!(fattr.ino, ROOT_INODE);
        assert_eq!(fattr.kind, FileType::Directory);
        assert_eq!(fattr.perm, 0o555);
        assert_eq!(fattr.size, 4096);
    }

    #[test]
    fn attr_to_fuser_maps_file_and_blocks() {
        let now = SystemTime::now();
        let attr = CoreAttr::file(1025, 0o444, 1, 0, 0, (now, now, now));
        let fattr = attr_to_fuser(7, &attr);
        assert_eq!(fattr.kind, FileType::RegularFile);
        assert_eq!(fattr.size, 1025);
        assert_eq!(fattr.blocks, 3);
        assert_eq!(fattr.uid, 0);
    }

    #[test]
    fn child_resolution_through_path_table() {
        let mut fs = make_fs();
        let path = fs
            .child_of(ROOT_INODE, OsStr::new("hello.txt"))
            .expect("root is always mapped");
        assert_eq!(path, "/hello.txt");
        let ino = fs.paths.assign(&path);
        assert_eq!(fs.path_for(ino).as_deref(), Some("/hello.txt"));
    }

    #[test]
    fn unknown_inode_has_no_path() {
        let fs = make_fs();
        assert!(fs.path_for(999).is_none());
    }

    #[test]
    fn create_with_wronly_flags_yields_the_new_file_attr() {
        let mut fs = ProbeFs::new(WritableStore::default(), FuseConfig::default());
        let attr = fs
            .create_entry("/new", true, libc::O_WRONLY | libc::O_CREAT)
            .expect("create+open of a fresh path must succeed");
        assert_eq!(attr.kind, FileKind::RegularFile);
        assert_eq!(attr.size, 0);
        assert_eq!(attr.perm, 0o666);
        // the handle is open for writing
        assert_eq!(fs.adapter.write("/new", 0, b"hi").unwrap(), 2);
    }

    #[test]
    fn create_then_write_then_release_reaches_the_store() {
        let mut fs = ProbeFs::new(WritableStore::default(), FuseConfig::default());
        fs.create_entry("/out.txt", true, libc::O_WRONLY | libc::O_CREAT)
            .unwrap();
        fs.adapter.write("/out.txt", 0, b"payload").unwrap();
        fs.adapter.release("/out.txt").unwrap();
        let attr = fs.adapter.getattr("/out.txt").unwrap();
        assert_eq!(attr.size, 7);
    }

    #[test]
    fn create_non_regular_is_rejected() {
        let mut fs = ProbeFs::new(WritableStore::default(), FuseConfig::default());
        let err = fs.create_entry("/fifo", false, libc::O_WRONLY).unwrap_err();
        assert_eq!(err.to_errno(), libc::ENOSYS);
    }

    #[test]
    fn adapter_reachable_through_binding_state() {
        let mut fs = make_fs();
        let attr = fs.adapter.getattr("/hello.txt").unwrap();
        assert_eq!(attr.size, 5);
        assert_eq!(attr.perm, 0o444);
    }
}
