//! Mount option parsing and mountpoint validation for the probefs daemon.

use std::path::Path;
use thiserror::Error;

/// Options accepted on the daemon's `-o` flag.
///
/// The whitelist covers the kernel-facing knobs that make sense for an
/// emulated filesystem; everything else is rejected rather than silently
/// passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    pub allow_other: bool,
    pub allow_root: bool,
    pub default_permissions: bool,
    pub auto_unmount: bool,
    pub direct_io: bool,
    pub fsname: Option<String>,
}

impl Default for MountOptions {
    fn default() -> Self {
        MountOptions {
            allow_other: false,
            allow_root: false,
            default_permissions: false,
            auto_unmount: true,
            direct_io: false,
            fsname: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum MountError {
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MountError {
    fn from(e: std::io::Error) -> Self {
        MountError::Io(e.to_string())
    }
}

/// Validate a mountpoint path.
pub fn validate_mountpoint(path: &Path) -> Result<(), MountError> {
    if !path.exists() {
        return Err(MountError::PathNotFound(path.display().to_string()));
    }

    if !path.is_dir() {
        return Err(MountError::NotADirectory(path.display().to_string()));
    }

    Ok(())
}

/// Parse mount options from a comma-separated string.
pub fn parse_mount_options(opts_str: &str) -> Result<MountOptions, MountError> {
    let mut options = MountOptions::default();

    for opt in opts_str.split(',') {
        let opt = opt.trim();
        match opt {
            "allow_other" => options.allow_other = true,
            "allow_root" => options.allow_root = true,
            "default_permissions" => options.default_permissions = true,
            "auto_unmount" => options.auto_unmount = true,
            "direct_io" => options.direct_io = true,
            "" => {}
            _ => {
                if let Some(name) = opt.strip_prefix("fsname=") {
                    options.fsname = Some(name.to_string());
                } else {
                    return Err(MountError::InvalidOption(opt.to_string()));
                }
            }
        }
    }

    Ok(options)
}

/// Convert `MountOptions` to the fuser option vec.
pub fn options_to_fuser(opts: &MountOptions) -> Vec<fuser::MountOption> {
    let mut fuser_opts = Vec::new();

    if opts.allow_other {
        fuser_opts.push(fuser::MountOption::AllowOther);
    }

    if opts.allow_root {
        fuser_opts.push(fuser::MountOption::AllowRoot);
    }

    if opts.default_permissions {
        fuser_opts.push(fuser::MountOption::DefaultPermissions);
    }

    if opts.auto_unmount {
        fuser_opts.push(fuser::MountOption::AutoUnmount);
    }

    if opts.direct_io {
        fuser_opts.push(fuser::MountOption::CUSTOM("direct_io".into()));
    }

    let fsname = opts.fsname.as_deref().unwrap_or("probefs");
    fuser_opts.push(fuser::MountOption::FSName(fsname.to_string()));

    fuser_opts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn default_options_have_expected_values() {
        let opts = MountOptions::default();
        assert!(!opts.allow_other);
        assert!(!opts.allow_root);
        assert!(!opts.default_permissions);
        assert!(opts.auto_unmount);
        assert!(!opts.direct_io);
        assert!(opts.fsname.is_none());
    }

    #[test]
    fn parse_empty_string_is_default() {
        let opts = parse_mount_options("").unwrap();
        assert_eq!(opts, MountOptions::default());
    }

    #[test]
    fn parse_multiple_options_with_spaces() {
        let opts = parse_mount_options("allow_other, direct_io ,default_permissions").unwrap();
        assert!(opts.allow_other);
        assert!(opts.direct_io);
        assert!(opts.default_permissions);
    }

    #[test]
    fn parse_fsname_option() {
        let opts = parse_mount_options("fsname=mystore").unwrap();
        assert_eq!(opts.fsname.as_deref(), Some("mystore"));
    }

    #[test]
    fn parse_unknown_option_is_rejected() {
        let result = parse_mount_options("nosuchopt");
        assert!(matches!(result, Err(MountError::InvalidOption(_))));
    }

    #[test]
    fn options_to_fuser_includes_fsname_default() {
        let fuser_opts = options_to_fuser(&MountOptions::default());
        assert!(fuser_opts
            .iter()
            .any(|o| matches!(o, fuser::MountOption::FSName(s) if s == "probefs")));
    }

    #[test]
    fn options_to_fuser_maps_flags() {
        let opts = MountOptions {
            allow_other: true,
            allow_root: true,
            default_permissions: true,
            auto_unmount: true,
            direct_io: true,
            fsname: Some("custom".to_string()),
        };
        let fuser_opts = options_to_fuser(&opts);
        assert!(fuser_opts
            .iter()
            .any(|o| matches!(o, fuser::MountOption::AllowOther)));
        assert!(fuser_opts
            .iter()
            .any(|o| matches!(o, fuser::MountOption::AllowRoot)));
        assert!(fuser_opts
            .iter()
            .any(|o| matches!(o, fuser::MountOption::DefaultPermissions)));
        assert!(fuser_opts
            .iter()
            .any(|o| matches!(o, fuser::MountOption::AutoUnmount)));
        assert!(fuser_opts
            .iter()
            .any(|o| matches!(o, fuser::MountOption::CUSTOM(s) if s == "direct_io")));
        assert!(fuser_opts
            .iter()
            .any(|o| matches!(o, fuser::MountOption::FSName(s) if s == "custom")));
    }

    #[test]
    fn validate_mountpoint_missing_path() {
        let result = validate_mountpoint(Path::new("/no_such_path_ycl3"));
        assert!(matches!(result, Err(MountError::PathNotFound(_))));
    }

    #[test]
    fn validate_mountpoint_file_is_not_a_directory() {
        let temp_file = PathBuf::from(std::env::temp_dir()).join("probefs_mount_test.txt");
        fs::write(&temp_file, "x").ok();

        let result = validate_mountpoint(&temp_file);

        fs::remove_file(&temp_file).ok();
        assert!(matches!(result, Err(MountError::NotADirectory(_))));
    }
}
