use anyhow::{bail, Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Advisory lock file guarding against two pipeline runs at once.
///
/// Removed when dropped. A stale file left by a killed process must be
/// deleted by hand.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                bail!(
                    "Another run holds the lock at {} (delete it if no run is active)",
                    path.display()
                );
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create lock {}", path.display()))
            }
        };

        writeln!(file, "{}", std::process::id())
            .with_context(|| format!("Failed to write lock {}", path.display()))?;
        debug!("Acquired run lock {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release run lock {}: {}", self.path.display(), e);
        }
    }
}
