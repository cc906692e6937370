//! Created-file marker.
//!
//! The kernel creates a file with mknod and stats it immediately, before any
//! bytes exist — at which point the backing store has never heard of the
//! path. This single-slot marker bridges that window: set by create, cleared
//! by the next write-only open of the same path or replaced by creating a
//! different path.

use std::time::SystemTime;
use tracing::debug;

#[derive(Debug, Default)]
pub struct CreatedMarker {
    slot: Option<(String, SystemTime)>,
}

impl CreatedMarker {
    pub fn new() -> Self {
        CreatedMarker { slot: None }
    }

    /// Record `path` as just-created, replacing any previous marker.
    pub fn set(&mut self, path: &str) {
        debug!("created-file marker set: {}", path);
        self.slot = Some((path.to_string(), SystemTime::now()));
    }

    pub fn matches(&self, path: &str) -> bool {
        matches!(&self.slot, Some((p, _)) if p == path)
    }

    /// Creation time, when the marker matches `path`.
    pub fn created_at(&self, path: &str) -> Option<SystemTime> {
        match &self.slot {
            Some((p, t)) if p == path => Some(*t),
            _ => None,
        }
    }

    /// Clear the marker if it names `path`.
    pub fn clear_if(&mut self, path: &str) {
        if self.matches(path) {
            debug!("created-file marker cleared: {}", path);
            self.slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_marker_matches_nothing() {
        let marker = CreatedMarker::new();
        assert!(!marker.matches("/f"));
        assert!(marker.created_at("/f").is_none());
    }

    #[test]
    fn set_then_matches() {
        let mut marker = CreatedMarker::new();
        marker.set("/f");
        assert!(marker.matches("/f"));
        assert!(!marker.matches("/g"));
        assert!(marker.created_at("/f").is_some());
    }

    #[test]
    fn setting_a_second_path_supersedes_the_first() {
        let mut marker = CreatedMarker::new();
        marker.set("/f");
        marker.set("/g");
        assert!(!marker.matches("/f"));
        assert!(marker.matches("/g"));
    }

    #[test]
    fn clear_if_only_clears_matching_path() {
        let mut marker = CreatedMarker::new();
        marker.set("/f");
        marker.clear_if("/g");
        assert!(marker.matches("/f"));
        marker.clear_if("/f");
        assert!(!marker.matches("/f"));
    }
}
