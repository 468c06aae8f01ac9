//! Filesystem primitives shared by the backup store and copy engine
//!
//! The central piece is [`replace_tree`], the atomic tree-replace used for
//! every destructive directory overwrite in the crate: the new content is
//! staged into a temporary sibling of the target and swapped into place, so
//! an observer only ever sees the fully-old or fully-new tree.

use crate::error::{Result, RoleSyncError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{trace, warn};
use walkdir::WalkDir;

/// Recursively copy a directory tree from `src` to `dst`
///
/// `dst` must not exist; it is created as the copy root. Symlinks are
/// recreated as links rather than followed, matching what the game client
/// itself would see in the config directory.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        return Err(RoleSyncError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("source directory does not exist: {}", src.display()),
        )));
    }
    fs::create_dir_all(dst)?;

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| {
            RoleSyncError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::other("directory walk failed")
            }))
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| RoleSyncError::copy(format!(
                "walked path {:?} escaped source root {:?}",
                entry.path(),
                src
            )))?;
        let dest_path = dst.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if file_type.is_symlink() {
            let link_target = fs::read_link(entry.path())?;
            create_symlink(&link_target, &dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest_path)?;
        }
    }

    trace!("copied tree {:?} -> {:?}", src, dst);
    Ok(())
}

/// Atomically replace `target`'s directory tree with a copy of `src`
///
/// Stage-then-swap: the copy of `src` is first staged into a temp directory
/// beside `target` (same filesystem, so renames are atomic), then the old
/// tree is moved aside, the staged tree renamed into place, and the old tree
/// removed. A failure during staging leaves `target` untouched; a failure
/// after the swap can only lose the already-replaced old tree, never produce
/// a mixed one.
///
/// A hard process crash in the instant between the two renames leaves no
/// tree at `target`; both the old tree and the fully staged new one survive
/// inside the `.rolesync-stage-*` directory beside it and can be recovered
/// by hand.
pub fn replace_tree(src: &Path, target: &Path) -> Result<()> {
    let parent = target.parent().ok_or_else(|| {
        RoleSyncError::copy(format!("target {:?} has no parent directory", target))
    })?;
    fs::create_dir_all(parent)?;

    // Stage inside a TempDir so a staging failure cleans itself up on drop.
    let stage_root = TempDir::with_prefix_in(".rolesync-stage-", parent)?;
    let staged = stage_root.path().join("tree");
    copy_tree(src, &staged)?;

    if target.exists() {
        let retired = stage_root.path().join("old");
        fs::rename(target, &retired)?;
        if let Err(err) = fs::rename(&staged, target) {
            // Swap back so the target is the fully-old tree again.
            if let Err(undo) = fs::rename(&retired, target) {
                warn!("failed to roll back tree swap for {:?}: {}", target, undo);
            }
            return Err(err.into());
        }
    } else {
        fs::rename(&staged, target)?;
    }

    // Old tree (if any) is dropped together with the staging dir.
    Ok(())
}

/// Total size in bytes of all regular files under `path`
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// Byte-for-byte comparison of two directory trees
///
/// Compares the set of relative paths and the content of every regular file.
/// Useful for verifying a restore or copy against its source.
pub fn trees_equal(a: &Path, b: &Path) -> Result<bool> {
    let inventory = |root: &Path| -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                RoleSyncError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("directory walk failed")
                }))
            })?;
            if let Ok(relative) = entry.path().strip_prefix(root) {
                paths.push(relative.to_path_buf());
            }
        }
        Ok(paths)
    };

    let paths_a = inventory(a)?;
    let paths_b = inventory(b)?;
    if paths_a != paths_b {
        return Ok(false);
    }

    for relative in &paths_a {
        let left = a.join(relative);
        let right = b.join(relative);
        if left.is_file() != right.is_file() {
            return Ok(false);
        }
        if left.is_file() && fs::read(&left)? != fs::read(&right)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Atomic file write (write to temp file then rename)
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Format bytes in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Create a symlink (cross-platform)
#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::unix::fs::symlink;
    symlink(target, link)?;
    Ok(())
}

/// Create a symlink (Windows)
#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    if target.is_dir() {
        symlink_dir(target, link)?;
    } else {
        symlink_file(target, link)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_sample_tree(root: &Path) {
        fs::create_dir_all(root.join("ui")).unwrap();
        fs::write(root.join("keybinds.ini"), b"F1=attack").unwrap();
        fs::write(root.join("ui/layout.dat"), b"grid=3x3").unwrap();
    }

    #[test]
    fn test_copy_tree_copies_nested_files() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_sample_tree(&src);

        copy_tree(&src, &dst).unwrap();
        assert!(trees_equal(&src, &dst).unwrap());
    }

    #[test]
    fn test_copy_tree_missing_source_fails() {
        let tmp = TempDir::new().unwrap();
        let err = copy_tree(&tmp.path().join("absent"), &tmp.path().join("dst"));
        assert!(err.is_err());
    }

    #[test]
    fn test_replace_tree_overwrites_existing_target() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let target = tmp.path().join("target");
        write_sample_tree(&src);
        fs::create_dir_all(target.join("stale")).unwrap();
        fs::write(target.join("stale/old.txt"), b"gone").unwrap();

        replace_tree(&src, &target).unwrap();
        assert!(trees_equal(&src, &target).unwrap());
        assert!(!target.join("stale").exists());
    }

    #[test]
    fn test_replace_tree_creates_missing_target() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let target = tmp.path().join("fresh");
        write_sample_tree(&src);

        replace_tree(&src, &target).unwrap();
        assert!(trees_equal(&src, &target).unwrap());
    }

    #[test]
    fn test_replace_tree_failure_leaves_target_intact() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("target");
        write_sample_tree(&target);

        let before = fs::read(target.join("keybinds.ini")).unwrap();
        let err = replace_tree(&tmp.path().join("missing-src"), &target);
        assert!(err.is_err());
        assert_eq!(fs::read(target.join("keybinds.ini")).unwrap(), before);
    }

    #[test]
    fn test_replace_tree_leaves_no_staging_residue() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let target = tmp.path().join("target");
        write_sample_tree(&src);
        write_sample_tree(&target);

        replace_tree(&src, &target).unwrap();
        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".rolesync-stage-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_dir_size() {
        let tmp = TempDir::new().unwrap();
        write_sample_tree(tmp.path());
        assert_eq!(dir_size(tmp.path()), 9 + 8);
    }

    #[test]
    fn test_trees_equal_detects_content_difference() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        write_sample_tree(&a);
        write_sample_tree(&b);
        assert!(trees_equal(&a, &b).unwrap());

        fs::write(b.join("keybinds.ini"), b"F1=defend").unwrap();
        assert!(!trees_equal(&a, &b).unwrap());
    }

    #[test]
    fn test_atomic_write() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("config.json");
        atomic_write(&file_path, b"{}").unwrap();
        assert_eq!(fs::read(&file_path).unwrap(), b"{}");
        assert!(!file_path.with_extension("tmp").exists());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1_048_576), "1.00 MB");
    }
}
