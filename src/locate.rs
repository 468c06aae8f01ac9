//! Game installation probing
//!
//! Resolves a user-selected installation directory (or the game executable's
//! path) to the per-account userdata root the scanner walks. Only known
//! client layouts are probed; OS shortcut (.lnk) resolution is the caller's
//! concern.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Userdata locations relative to the installation root, most common first
const USERDATA_CANDIDATES: &[&str] = &[
    "Game/JX3/bin/zhcn_hd/userdata",
    "Game/JX3/bin/zhcn/userdata",
];

/// Resolve an installation root or game executable path to the userdata root
///
/// Returns `None` when no known layout matches.
pub fn resolve_userdata_root(base: &Path) -> Option<PathBuf> {
    // Accept the launcher executable itself and step up to its directory.
    let base = if base.is_file() {
        base.parent()?
    } else {
        base
    };

    for candidate in USERDATA_CANDIDATES {
        let path = base.join(candidate);
        if path.is_dir() {
            debug!("resolved userdata root: {:?}", path);
            return Some(path);
        }
    }
    None
}

/// Whether `path` looks like a usable userdata root
///
/// It must exist, be a directory, and contain at least one account folder.
pub fn validate_userdata_root(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    std::fs::read_dir(path)
        .map(|mut entries| {
            entries.any(|e| {
                e.ok()
                    .and_then(|e| e.file_type().ok())
                    .map(|ft| ft.is_dir())
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}
