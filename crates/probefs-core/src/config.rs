use serde::{Deserialize, Serialize};

/// Adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Capture editor swap/backup files in memory instead of passing them to
    /// the backing store. When disabled, release also flushes unmodified
    /// write handles as a compatibility fallback.
    pub handle_editor: bool,
    /// Owner reported in every stat record.
    pub uid: u32,
    /// Group reported in every stat record.
    pub gid: u32,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            handle_editor: true,
            uid: 0,
            gid: 0,
        }
    }
}

impl AdapterConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
