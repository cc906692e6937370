//! Synthesized stat records.

use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    RegularFile,
    Directory,
}

/// Attributes the adapter reports for a path. Permission bits are emulated
/// fixed policy, not a real ownership model.
#[derive(Debug, Clone)]
pub struct FileAttr {
    pub kind: FileKind,
    pub size: u64,
    pub perm: u16,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl FileAttr {
    pub fn directory(perm: u16, uid: u32, gid: u32, times: (SystemTime, SystemTime, SystemTime)) -> Self {
        FileAttr {
            kind: FileKind::Directory,
            size: 4096,
            perm,
            nlink: 1,
            uid,
            gid,
            atime: times.0,
            mtime: times.1,
            ctime: times.2,
        }
    }

    pub fn file(
        size: u64,
        perm: u16,
        nlink: u32,
        uid: u32,
        gid: u32,
        times: (SystemTime, SystemTime, SystemTime),
    ) -> Self {
        FileAttr {
            kind: FileKind::RegularFile,
            size,
            perm,
            nlink,
            uid,
            gid,
            atime: times.0,
            mtime: times.1,
            ctime: times.2,
        }
    }
}
