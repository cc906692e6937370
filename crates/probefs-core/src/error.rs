use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("No such path: {path}")]
    NotFound { path: String },

    #[error("Access denied for {path}, operation: {op}")]
    AccessDenied { path: String, op: String },

    #[error("Path already exists: {path}")]
    AlreadyExists { path: String },

    #[error("Path already open: {path}")]
    AlreadyOpen { path: String },

    #[error("Not a directory: {path}")]
    NotDirectory { path: String },

    #[error("Operation not supported: {op}")]
    NotSupported { op: String },
}

pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    pub fn not_found(path: &str) -> Self {
        FsError::NotFound {
            path: path.to_string(),
        }
    }

    pub fn access_denied(path: &str, op: &str) -> Self {
        FsError::AccessDenied {
            path: path.to_string(),
            op: op.to_string(),
        }
    }

    pub fn already_exists(path: &str) -> Self {
        FsError::AlreadyExists {
            path: path.to_string(),
        }
    }

    pub fn already_open(path: &str) -> Self {
        FsError::AlreadyOpen {
            path: path.to_string(),
        }
    }

    pub fn to_errno(&self) -> i32 {
        use libc::*;
        match self {
            FsError::NotFound { .. } => ENOENT,
            FsError::AccessDenied { .. } => EACCES,
            FsError::AlreadyExists { .. } => EEXIST,
            // a second open on the same path maps to EACCES, not EBUSY
            FsError::AlreadyOpen { .. } => EACCES,
            FsError::NotDirectory { .. } => ENOTDIR,
            FsError::NotSupported { .. } => ENOSYS,
        }
    }
}
