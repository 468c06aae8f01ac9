//! Role discovery
//!
//! Walks the game's per-account userdata root and turns the on-disk
//! `account/region/server/character` nesting into a [`RoleCatalog`].
//!
//! The walk is tolerant by construction: every directory level is parsed
//! into either a usable segment or an explicit skip, so malformed or
//! unrelated entries (stray files, non-UTF-8 names, server-side-only account
//! folders) never abort discovery. Entries are visited in sorted name order
//! at every level, which makes repeated scans of an unchanged tree yield
//! identical catalogs.

use crate::error::{Result, RoleSyncError};
use crate::types::{Role, RoleCatalog};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Outcome of parsing one directory entry during the walk
#[derive(Debug)]
enum Segment {
    /// A directory with a usable UTF-8 name
    Parsed { name: String, path: PathBuf },
    /// Anything else: files, unreadable entries, non-UTF-8 names
    Skip,
}

/// Scans a userdata root for roles
#[derive(Debug, Clone)]
pub struct RoleScanner {
    root: PathBuf,
}

impl RoleScanner {
    /// Create a scanner for the given userdata root
    ///
    /// The root is assumed to already be validated (see [`crate::locate`]);
    /// existence is checked on each [`scan`](Self::scan) call instead of here
    /// so a scanner can outlive a temporarily unmounted game drive.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The userdata root this scanner walks
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the root and produce the role catalog
    ///
    /// Fails only if the root itself is missing or unreadable; a root with
    /// zero valid roles yields an empty catalog.
    pub fn scan(&self) -> Result<RoleCatalog> {
        if !self.root.is_dir() {
            return Err(RoleSyncError::RootNotFound(self.root.clone()));
        }

        let mut roles = Vec::new();
        for account in sorted_segments(&self.root)? {
            let Segment::Parsed { name: account_name, path: account_path } = account else {
                continue;
            };

            // Accounts whose data lives server-side have no local subtree.
            let region_segments = segments_or_skip(&account_path);
            if !region_segments
                .iter()
                .any(|s| matches!(s, Segment::Parsed { .. }))
            {
                trace!("skipping account without local data: {}", account_name);
                continue;
            }

            for region in region_segments {
                let Segment::Parsed { name: region_name, path: region_path } = region else {
                    continue;
                };
                for server in segments_or_skip(&region_path) {
                    let Segment::Parsed { name: server_name, path: server_path } = server else {
                        continue;
                    };
                    for character in segments_or_skip(&server_path) {
                        let Segment::Parsed { name: character_name, path: character_path } =
                            character
                        else {
                            continue;
                        };
                        roles.push(Role {
                            account: account_name.clone(),
                            region: region_name.clone(),
                            server: server_name.clone(),
                            character: character_name,
                            path: character_path,
                        });
                    }
                }
            }
        }

        debug!("scanned {} roles under {:?}", roles.len(), self.root);
        Ok(RoleCatalog::new(roles))
    }
}

/// Read the immediate children of `dir`, sorted by file name, each parsed
/// into a [`Segment`]
///
/// Fails only when `dir` itself cannot be read; individual entries that fail
/// to stat are skipped.
fn sorted_segments(dir: &Path) -> Result<Vec<Segment>> {
    let mut entries: Vec<fs::DirEntry> = fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    Ok(entries.into_iter().map(|entry| parse_segment(&entry)).collect())
}

/// Like [`sorted_segments`], but an unreadable directory is skipped instead
/// of aborting discovery; only the scan root itself may fail a scan
fn segments_or_skip(dir: &Path) -> Vec<Segment> {
    sorted_segments(dir).unwrap_or_else(|err| {
        trace!("skipping unreadable directory {:?}: {}", dir, err);
        Vec::new()
    })
}

fn parse_segment(entry: &fs::DirEntry) -> Segment {
    let is_dir = entry
        .file_type()
        .map(|ft| ft.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Segment::Skip;
    }
    match entry.file_name().into_string() {
        Ok(name) => Segment::Parsed {
            name,
            path: entry.path(),
        },
        Err(_) => Segment::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_role_dir(root: &Path, account: &str, region: &str, server: &str, character: &str) {
        let dir = root.join(account).join(region).join(server).join(character);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("keybinds.ini"), b"F1=attack").unwrap();
    }

    #[test]
    fn test_scan_finds_nested_roles() {
        let tmp = TempDir::new().unwrap();
        make_role_dir(tmp.path(), "acc1", "electric", "sword-lake", "hero");
        make_role_dir(tmp.path(), "acc1", "electric", "sword-lake", "alt");
        make_role_dir(tmp.path(), "acc2", "telecom", "cloud-peak", "main");

        let catalog = RoleScanner::new(tmp.path()).scan().unwrap();
        assert_eq!(catalog.len(), 3);

        let labels: Vec<String> = catalog.iter().map(|r| r.label()).collect();
        assert_eq!(
            labels,
            vec![
                "acc1-electric-sword-lake-alt",
                "acc1-electric-sword-lake-hero",
                "acc2-telecom-cloud-peak-main",
            ]
        );
    }

    #[test]
    fn test_scan_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        make_role_dir(tmp.path(), "acc1", "r1", "s1", "c1");
        make_role_dir(tmp.path(), "acc1", "r2", "s9", "c2");

        let scanner = RoleScanner::new(tmp.path());
        let first = scanner.scan().unwrap();
        let second = scanner.scan().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_scan_skips_files_and_shallow_dirs() {
        let tmp = TempDir::new().unwrap();
        make_role_dir(tmp.path(), "acc1", "r1", "s1", "c1");
        // Stray files at every level.
        fs::write(tmp.path().join("readme.txt"), b"x").unwrap();
        fs::write(tmp.path().join("acc1/notes.txt"), b"x").unwrap();
        fs::write(tmp.path().join("acc1/r1/cache.bin"), b"x").unwrap();
        // Account folder with no subdirectories (server-side data only).
        fs::create_dir_all(tmp.path().join("acc-remote")).unwrap();
        fs::write(tmp.path().join("acc-remote/token"), b"x").unwrap();

        let catalog = RoleScanner::new(tmp.path()).scan().unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.roles()[0].label(), "acc1-r1-s1-c1");
    }

    #[test]
    fn test_scan_missing_root_errors() {
        let tmp = TempDir::new().unwrap();
        let result = RoleScanner::new(tmp.path().join("nope")).scan();
        assert!(matches!(result, Err(RoleSyncError::RootNotFound(_))));
    }

    #[test]
    fn test_scan_empty_root_yields_empty_catalog() {
        let tmp = TempDir::new().unwrap();
        let catalog = RoleScanner::new(tmp.path()).scan().unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_scanned_paths_are_absolute_role_dirs() {
        let tmp = TempDir::new().unwrap();
        make_role_dir(tmp.path(), "acc1", "r1", "s1", "c1");

        let catalog = RoleScanner::new(tmp.path()).scan().unwrap();
        let role = &catalog.roles()[0];
        assert_eq!(role.path, tmp.path().join("acc1/r1/s1/c1"));
        assert!(role.path.join("keybinds.ini").is_file());
    }
}
