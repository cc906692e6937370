//! probefs core: bridges POSIX-style filesystem operations onto a
//! capability-probed backing store that only understands whole-file reads,
//! whole-file writes, directory listings, and yes/no permission queries.

pub mod adapter;
pub mod attr;
pub mod buffer;
pub mod classifier;
pub mod config;
pub mod error;
pub mod marker;
pub mod shadow;
pub mod store;
pub mod table;

pub use adapter::FsAdapter;
pub use config::AdapterConfig;
pub use error::{FsError, Result};
pub use store::{BackingStore, StoreError};
