//! probefs mount daemon.
//!
//! Mounts the adapter over a small in-memory demo store. Useful for kicking
//! the tires of the editor handling and capability probing from a shell:
//!
//! ```text
//! probefs /mnt/probe -o allow_other,fsname=demo
//! ```

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use probefs_core::store::StoreResult;
use probefs_core::{AdapterConfig, BackingStore};
use probefs_fuse::filesystem::{FuseConfig, ProbeFs};
use probefs_fuse::mount::{options_to_fuser, parse_mount_options, validate_mountpoint};

/// In-memory store where everything is writable. Directory listings are
/// derived from the stored paths.
#[derive(Default)]
struct DemoStore {
    files: HashMap<String, Vec<u8>>,
    dirs: HashSet<String>,
}

impl DemoStore {
    fn seeded() -> Self {
        let mut store = DemoStore::default();
        store.dirs.insert("/docs".to_string());
        store
            .files
            .insert("/hello.txt".to_string(), b"hello from probefs\n".to_vec());
        store.files.insert(
            "/docs/readme.txt".to_string(),
            b"edit me with vim or emacs\n".to_vec(),
        );
        store
    }

    fn children_of(&self, dir: &str) -> Vec<String> {
        let prefix = if dir == "/" {
            String::from("/")
        } else {
            format!("{}/", dir)
        };
        let mut names: Vec<String> = self
            .files
            .keys()
            .chain(self.dirs.iter())
            .filter_map(|p| {
                let rest = p.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect();
        names.sort();
        names
    }
}

impl BackingStore for DemoStore {
    fn is_directory(&mut self, path: &str) -> StoreResult<bool> {
        Ok(path == "/" || self.dirs.contains(path))
    }

    fn is_file(&mut self, path: &str) -> StoreResult<bool> {
        Ok(self.files.contains_key(path))
    }

    fn can_write(&mut self, _path: &str) -> StoreResult<bool> {
        Ok(true)
    }

    fn can_delete(&mut self, path: &str) -> StoreResult<bool> {
        Ok(self.files.contains_key(path))
    }

    fn can_mkdir(&mut self, _path: &str) -> StoreResult<bool> {
        Ok(true)
    }

    fn can_rmdir(&mut self, path: &str) -> StoreResult<bool> {
        Ok(self.dirs.contains(path) && self.children_of(path).is_empty())
    }

    fn contents(&mut self, path: &str) -> StoreResult<Option<Vec<String>>> {
        Ok(Some(self.children_of(path)))
    }

    fn read_file(&mut self, path: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }

    fn write_to(&mut self, path: &str, data: &[u8]) -> StoreResult<()> {
        self.files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, path: &str) -> StoreResult<()> {
        self.files.remove(path);
        Ok(())
    }

    fn size(&mut self, path: &str) -> StoreResult<Option<u64>> {
        Ok(self.files.get(path).map(|v| v.len() as u64))
    }

    fn mkdir(&mut self, path: &str) -> StoreResult<()> {
        self.dirs.insert(path.to_string());
        Ok(())
    }

    fn rmdir(&mut self, path: &str) -> StoreResult<()> {
        self.dirs.remove(path);
        Ok(())
    }
}

fn usage() -> ! {
    eprintln!("Usage: probefs <mountpoint> [-o options] [--config file.json]");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut mountpoint: Option<PathBuf> = None;
    let mut opts_str = String::new();
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" => {
                i += 1;
                opts_str = args.get(i).cloned().unwrap_or_else(|| usage());
            }
            "--config" => {
                i += 1;
                config_path = Some(PathBuf::from(args.get(i).cloned().unwrap_or_else(|| usage())));
            }
            arg if !arg.starts_with('-') && mountpoint.is_none() => {
                mountpoint = Some(PathBuf::from(arg))
            }
            _ => usage(),
        }
        i += 1;
    }

    let mountpoint = mountpoint.unwrap_or_else(|| usage());

    let adapter_config = match config_path {
        Some(p) => {
            let raw = std::fs::read_to_string(&p)?;
            AdapterConfig::from_json_str(&raw)?
        }
        None => AdapterConfig::default(),
    };

    validate_mountpoint(&mountpoint)?;
    let options = parse_mount_options(&opts_str)?;
    let fuser_opts = options_to_fuser(&options);

    let config = FuseConfig {
        adapter: adapter_config,
        ..FuseConfig::default()
    };
    let fs = ProbeFs::new(DemoStore::seeded(), config);

    tracing::info!("mounting probefs at {}", mountpoint.display());
    let session = fuser::spawn_mount2(fs, &mountpoint, &fuser_opts)?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("unmounting {}", mountpoint.display());
    session.join();

    Ok(())
}
