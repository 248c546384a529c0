//! Directory replacement for full builds
//!
//! A build writes into `<dir>.temp`. Swapping moves the live directory to
//! `<dir>.old`, moves the new one into place and opens it. If opening fails
//! the previous directory is put back. Each step is a single rename, so a
//! crash leaves at worst a `.old` directory which [`recover_orphan`] puts
//! back on the next start.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::Result;

pub const TEMP_SUFFIX: &str = ".temp";
pub const OLD_SUFFIX: &str = ".old";
pub const ADJACENCY_SUFFIX: &str = ".adjacency";

/// `dir` with `suffix` appended to its last component.
pub fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    dir.with_file_name(name)
}

pub fn remove_dir_if_exists(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Replace `live` with `temp` and open the result with `open`.
///
/// On failure `live` holds whatever it held before and `temp` is gone.
pub fn swap_in<T>(live: &Path, temp: &Path, open: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
    let old = sibling(live, OLD_SUFFIX);
    remove_dir_if_exists(&old)?;

    let had_live = live.exists();
    if had_live {
        fs::rename(live, &old)?;
    }

    if let Err(e) = fs::rename(temp, live) {
        if had_live {
            restore(&old, live);
        }
        if let Err(rm) = remove_dir_if_exists(temp) {
            warn!(dir = %temp.display(), error = %rm, "Failed to remove unswapped build");
        }
        return Err(e.into());
    }

    match open(live) {
        Ok(opened) => {
            if had_live {
                if let Err(e) = fs::remove_dir_all(&old) {
                    warn!(dir = %old.display(), error = %e, "Failed to remove replaced index");
                }
            }
            debug!(dir = %live.display(), "Swapped in new index");
            Ok(opened)
        }
        Err(e) => {
            warn!(dir = %live.display(), error = %e, "New index failed to open, restoring previous");
            if let Err(rm) = remove_dir_if_exists(live) {
                warn!(dir = %live.display(), error = %rm, "Failed to remove unusable index");
            }
            if had_live {
                restore(&old, live);
            }
            Err(e)
        }
    }
}

fn restore(old: &Path, live: &Path) {
    if let Err(e) = fs::rename(old, live) {
        warn!(from = %old.display(), to = %live.display(), error = %e, "Failed to restore previous index");
    }
}

/// Put `<live>.old` back when a swap was interrupted before `live` existed.
/// Returns true if something was restored.
pub fn recover_orphan(live: &Path) -> bool {
    let old = sibling(live, OLD_SUFFIX);
    if live.exists() || !old.is_dir() {
        return false;
    }
    match fs::rename(&old, live) {
        Ok(()) => {
            warn!(dir = %live.display(), "Recovered index left behind by an interrupted swap");
            true
        }
        Err(e) => {
            warn!(dir = %old.display(), error = %e, "Failed to recover interrupted swap");
            false
        }
    }
}
