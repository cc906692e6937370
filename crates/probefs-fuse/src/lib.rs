//! FUSE transport binding for the probefs adapter.
//!
//! Owns the inode-number bookkeeping, the `fuser::Filesystem` glue, and
//! mount-option handling. The adapter itself lives in `probefs-core` and
//! knows nothing about FUSE.

pub mod filesystem;
pub mod inode;
pub mod mount;

pub use filesystem::{FuseConfig, ProbeFs};
pub use mount::{parse_mount_options, validate_mountpoint, MountError, MountOptions};
