//! Editor swap-file detection.
//!
//! Editors drop transient files next to the file being edited (vim swap
//! files, emacs autosave files, numbered backups). The adapter captures
//! those entirely in memory so the backing store never sees them.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    Vim,
    Emacs,
}

/// Classification of a path against the editor-file patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorClass {
    /// Not an editor temp file; handle normally.
    NotEditor,
    /// Matches an editor pattern but no shadow entry exists yet.
    Pending,
    /// Matches an editor pattern and a live shadow entry exists.
    Exists,
}

/// Pattern classifier with the last-detected editor kind as instance state.
///
/// The last kind feeds the numbered-backup heuristic: vim emits plain numeric
/// backup names that are only recognizable as editor droppings because a vim
/// swap file was seen first.
#[derive(Debug)]
pub struct EditorClassifier {
    enabled: bool,
    last_kind: Option<EditorKind>,
}

fn final_component(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next()?;
    if name.is_empty() {
        return None;
    }
    Some(name)
}

fn vim_swap_name(name: &str) -> bool {
    if !name.starts_with('.') {
        return false;
    }
    // dot-suffix of length 4 or 5 matching .sw* (.swp, .swpx, .swo, ...)
    match name.rfind('.') {
        Some(idx) => {
            let suffix = &name[idx..];
            (suffix.len() == 4 || suffix.len() == 5) && suffix.starts_with(".sw")
        }
        None => false,
    }
}

fn emacs_autosave_name(name: &str) -> bool {
    name.len() >= 2 && name.starts_with('#') && name.ends_with('#')
}

impl EditorClassifier {
    pub fn new(enabled: bool) -> Self {
        EditorClassifier {
            enabled,
            last_kind: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn last_kind(&self) -> Option<EditorKind> {
        self.last_kind
    }

    /// Classify `path`. `shadow_exists` says whether a live shadow entry is
    /// already tracked for it. A pattern match records the detected kind.
    pub fn classify(&mut self, path: &str, shadow_exists: bool) -> EditorClass {
        if !self.enabled {
            return EditorClass::NotEditor;
        }

        if shadow_exists {
            return EditorClass::Exists;
        }

        let name = match final_component(path) {
            Some(n) => n,
            None => return EditorClass::NotEditor,
        };

        if vim_swap_name(name) {
            self.last_kind = Some(EditorKind::Vim);
            return EditorClass::Pending;
        }

        if emacs_autosave_name(name) {
            self.last_kind = Some(EditorKind::Emacs);
            return EditorClass::Pending;
        }

        EditorClass::NotEditor
    }

    /// Secondary heuristic for vim's numbered backup files: the last
    /// classified kind was vim and the final component is all ASCII digits
    /// once any non-digit prefix is stripped.
    pub fn numeric_backup_candidate(&self, path: &str) -> bool {
        if !self.enabled || self.last_kind != Some(EditorKind::Vim) {
            return false;
        }
        let name = match final_component(path) {
            Some(n) => n,
            None => return false,
        };
        match name.find(|c: char| c.is_ascii_digit()) {
            Some(idx) => name[idx..].bytes().all(|b| b.is_ascii_digit()),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vim_swap_file_is_pending() {
        let mut c = EditorClassifier::new(true);
        assert_eq!(c.classify("/dir/.file.txt.swp", false), EditorClass::Pending);
        assert_eq!(c.last_kind(), Some(EditorKind::Vim));
    }

    #[test]
    fn vim_swpx_suffix_is_pending() {
        let mut c = EditorClassifier::new(true);
        assert_eq!(c.classify("/.name.swpx", false), EditorClass::Pending);
    }

    #[test]
    fn vim_suffix_too_long_is_not_editor() {
        let mut c = EditorClassifier::new(true);
        assert_eq!(c.classify("/.name.swpxx", false), EditorClass::NotEditor);
    }

    #[test]
    fn vim_pattern_requires_leading_dot() {
        let mut c = EditorClassifier::new(true);
        assert_eq!(c.classify("/file.swp", false), EditorClass::NotEditor);
    }

    #[test]
    fn emacs_autosave_is_pending() {
        let mut c = EditorClassifier::new(true);
        assert_eq!(c.classify("/dir/#file#", false), EditorClass::Pending);
        assert_eq!(c.last_kind(), Some(EditorKind::Emacs));
    }

    #[test]
    fn emacs_pattern_requires_trailing_hash() {
        let mut c = EditorClassifier::new(true);
        assert_eq!(c.classify("/dir/#file", false), EditorClass::NotEditor);
    }

    #[test]
    fn plain_file_is_not_editor() {
        let mut c = EditorClassifier::new(true);
        assert_eq!(c.classify("/dir/file.txt", false), EditorClass::NotEditor);
        assert_eq!(c.last_kind(), None);
    }

    #[test]
    fn shadow_entry_wins_over_pattern() {
        let mut c = EditorClassifier::new(true);
        assert_eq!(c.classify("/.f.swp", true), EditorClass::Exists);
    }

    #[test]
    fn disabled_classifier_sees_nothing() {
        let mut c = EditorClassifier::new(false);
        assert_eq!(c.classify("/.f.swp", false), EditorClass::NotEditor);
        assert_eq!(c.classify("/.f.swp", true), EditorClass::NotEditor);
    }

    #[test]
    fn numeric_backup_requires_prior_vim() {
        let c = EditorClassifier::new(true);
        assert!(!c.numeric_backup_candidate("/dir/4913"));
    }

    #[test]
    fn numeric_backup_after_vim_swap() {
        let mut c = EditorClassifier::new(true);
        c.classify("/dir/.file.swp", false);
        assert!(c.numeric_backup_candidate("/dir/4913"));
        assert!(c.numeric_backup_candidate("/dir/backup~1234"));
    }

    #[test]
    fn numeric_backup_rejects_trailing_non_digits() {
        let mut c = EditorClassifier::new(true);
        c.classify("/dir/.file.swp", false);
        assert!(!c.numeric_backup_candidate("/dir/123x"));
        assert!(!c.numeric_backup_candidate("/dir/notdigits"));
    }

    #[test]
    fn numeric_backup_not_triggered_by_emacs() {
        let mut c = EditorClassifier::new(true);
        c.classify("/dir/#file#", false);
        assert!(!c.numeric_backup_candidate("/dir/4913"));
    }
}
