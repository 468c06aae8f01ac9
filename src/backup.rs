//! Snapshot store with per-role retention
//!
//! Backups live under a single backup root, one plain directory tree per
//! snapshot. The directory name encodes the source role identity and the
//! creation time (`account_region_server_character_YYYYMMDD_HHMMSS`), so
//! lexicographic order within one role matches chronological order and the
//! name stays human-traceable. A JSON sidecar (`<name>.meta.json`) carries
//! the same metadata so it survives manual renames; the name encoding is the
//! fallback when the sidecar is missing.
//!
//! Creation is staged: the tree copy lands in a dot-prefixed temp directory
//! beside the final location and is renamed into place only once complete.
//! `list` never observes a half-written snapshot.

use crate::error::{Result, RoleSyncError};
use crate::fsutil;
use crate::types::{Backup, Role};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Default cap on retained backups per distinct source role
pub const DEFAULT_MAX_BACKUPS_PER_ROLE: usize = 5;

const META_SUFFIX: &str = ".meta.json";
const NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Sidecar record persisted next to each snapshot directory
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BackupSidecar {
    role_label: String,
    source_role_path: PathBuf,
    created_at: DateTime<Utc>,
}

/// Snapshot store rooted at a single backup directory
#[derive(Debug, Clone)]
pub struct BackupStore {
    backup_root: PathBuf,
    max_per_role: usize,
}

impl BackupStore {
    /// Open (creating if needed) a store at `backup_root` with the default
    /// per-role retention cap
    pub fn open(backup_root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_retention(backup_root, DEFAULT_MAX_BACKUPS_PER_ROLE)
    }

    /// Open a store with an explicit per-role retention cap
    ///
    /// A cap of zero disables automatic eviction.
    pub fn with_retention(backup_root: impl Into<PathBuf>, max_per_role: usize) -> Result<Self> {
        let backup_root = backup_root.into();
        fs::create_dir_all(&backup_root)?;
        Ok(Self {
            backup_root,
            max_per_role,
        })
    }

    /// Directory all snapshots are stored under
    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Snapshot `role`'s entire config tree into a freshly named backup
    ///
    /// The copy is staged and renamed into place, so an interrupted copy is
    /// discarded rather than left as a corrupt visible entry. On success the
    /// per-role retention cap is enforced; evictions are logged, never
    /// surfaced as failures.
    pub fn create(&self, role: &Role) -> Result<Backup> {
        if !role.path.is_dir() {
            return Err(RoleSyncError::backup(format!(
                "role path does not exist: {}",
                role.path.display()
            )));
        }

        let created_at = Utc::now();
        let name = self.unique_name(role, created_at);
        let final_path = self.backup_root.join(&name);

        // Stage inside the backup root so the final rename stays on one
        // filesystem. TempDir cleans up after any copy failure.
        let stage = TempDir::with_prefix_in(".staging-", &self.backup_root)?;
        let staged_tree = stage.path().join("tree");
        fsutil::copy_tree(&role.path, &staged_tree)
            .map_err(|e| RoleSyncError::backup(format!("snapshot copy failed: {e}")))?;
        fs::rename(&staged_tree, &final_path)?;

        let sidecar = BackupSidecar {
            role_label: role.label(),
            source_role_path: role.path.clone(),
            created_at,
        };
        if let Err(err) = self.write_sidecar(&name, &sidecar) {
            // The name encoding still identifies the backup.
            warn!("failed to write sidecar for backup {}: {}", name, err);
        }

        let backup = Backup {
            name: name.clone(),
            role_label: sidecar.role_label,
            source_role_path: sidecar.source_role_path,
            created_at,
            size_bytes: fsutil::dir_size(&final_path),
        };
        info!(
            "created backup {} ({})",
            name,
            fsutil::format_bytes(backup.size_bytes)
        );

        self.enforce_retention(role);
        Ok(backup)
    }

    /// List backups, newest first
    ///
    /// `limit` caps the result length; `None` returns all. Staging residue
    /// (dot-prefixed entries) and unrelated files are skipped.
    pub fn list(&self, limit: Option<usize>) -> Result<Vec<Backup>> {
        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.backup_root)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable backup entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if name.starts_with('.') {
                continue;
            }
            backups.push(self.read_backup(&name, &entry.path()));
        }

        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        if let Some(limit) = limit {
            backups.truncate(limit);
        }
        Ok(backups)
    }

    /// Delete one backup by name
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.resolve_name(name)?;
        if !path.is_dir() {
            return Err(RoleSyncError::BackupNotFound(name.to_string()));
        }
        fs::remove_dir_all(&path)?;
        let sidecar_path = self.sidecar_path(name);
        if sidecar_path.is_file() {
            if let Err(err) = fs::remove_file(&sidecar_path) {
                warn!("failed to remove sidecar for {}: {}", name, err);
            }
        }
        debug!("deleted backup {}", name);
        Ok(())
    }

    /// Delete every backup, returning how many were removed
    ///
    /// An empty store clears to zero without error.
    pub fn clear_all(&self) -> Result<usize> {
        let backups = self.list(None)?;
        let mut removed = 0;
        for backup in &backups {
            self.delete(&backup.name)?;
            removed += 1;
        }
        info!("cleared {} backups from {:?}", removed, self.backup_root);
        Ok(removed)
    }

    /// Overwrite `target`'s config tree with the named snapshot's content
    ///
    /// Uses the same atomic tree-replace primitive as the copy engine, so the
    /// target is only ever observed fully-old or fully-restored.
    pub fn restore(&self, name: &str, target: &Role) -> Result<()> {
        let backup_path = self.resolve_name(name)?;
        if !backup_path.is_dir() {
            return Err(RoleSyncError::BackupNotFound(name.to_string()));
        }
        fsutil::replace_tree(&backup_path, &target.path).map_err(|e| match e {
            // Locked or unwritable targets surface as plain I/O errors.
            RoleSyncError::Io(io) => RoleSyncError::Io(io),
            other => RoleSyncError::restore(other.to_string()),
        })?;
        info!("restored backup {} onto {}", name, target.label());
        Ok(())
    }

    /// Drop the oldest backups of `role` beyond the retention cap
    fn enforce_retention(&self, role: &Role) {
        if self.max_per_role == 0 {
            return;
        }
        let mut owned: Vec<Backup> = match self.list(None) {
            Ok(backups) => backups
                .into_iter()
                .filter(|b| b.source_role_path == role.path || b.role_label == role.label())
                .collect(),
            Err(err) => {
                warn!("retention scan failed: {}", err);
                return;
            }
        };
        // list() is newest-first; everything past the cap is evicted.
        for stale in owned.split_off(self.max_per_role.min(owned.len())) {
            match self.delete(&stale.name) {
                Ok(()) => debug!("retention evicted backup {}", stale.name),
                Err(err) => warn!("retention failed to evict {}: {}", stale.name, err),
            }
        }
    }

    /// Build the backup metadata for one directory entry
    ///
    /// Prefers the sidecar record; falls back to the name encoding, then to
    /// the directory mtime for hand-renamed entries.
    fn read_backup(&self, name: &str, path: &Path) -> Backup {
        let sidecar = self.read_sidecar(name);
        let (role_label, source_role_path, created_at) = match sidecar {
            Some(s) => (s.role_label, s.source_role_path, s.created_at),
            None => {
                let (label, parsed_at) = parse_name(name);
                let created_at = parsed_at.unwrap_or_else(|| dir_mtime(path));
                (label, PathBuf::new(), created_at)
            }
        };
        Backup {
            name: name.to_string(),
            role_label,
            source_role_path,
            created_at,
            size_bytes: fsutil::dir_size(path),
        }
    }

    /// Pick a name that is unique within the store
    ///
    /// Two snapshots of the same role within one second get a `-N` suffix.
    fn unique_name(&self, role: &Role, created_at: DateTime<Utc>) -> String {
        let base = format!(
            "{}_{}_{}_{}_{}",
            role.account,
            role.region,
            role.server,
            role.character,
            created_at.format(NAME_TIME_FORMAT),
        );
        if !self.backup_root.join(&base).exists() {
            return base;
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{base}-{counter}");
            if !self.backup_root.join(&candidate).exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Validate a caller-supplied backup name and resolve it under the root
    ///
    /// Names are single path components; anything that could escape the
    /// backup root is rejected.
    fn resolve_name(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name.starts_with('.')
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(RoleSyncError::validation(format!(
                "invalid backup name: {name:?}"
            )));
        }
        Ok(self.backup_root.join(name))
    }

    fn sidecar_path(&self, name: &str) -> PathBuf {
        self.backup_root.join(format!("{name}{META_SUFFIX}"))
    }

    fn write_sidecar(&self, name: &str, sidecar: &BackupSidecar) -> Result<()> {
        let content = serde_json::to_vec_pretty(sidecar)?;
        fsutil::atomic_write(&self.sidecar_path(name), &content)
    }

    fn read_sidecar(&self, name: &str) -> Option<BackupSidecar> {
        let content = fs::read(self.sidecar_path(name)).ok()?;
        serde_json::from_slice(&content).ok()
    }
}

/// Recover `(role_label, created_at)` from a backup name
///
/// The last two `_`-separated segments are date and time; everything before
/// them is the role identity. A `-N` collision suffix on the time segment is
/// ignored for parsing.
fn parse_name(name: &str) -> (String, Option<DateTime<Utc>>) {
    let mut pieces = name.rsplitn(3, '_');
    let time = pieces.next().unwrap_or_default();
    let date = pieces.next().unwrap_or_default();
    let label_part = match pieces.next() {
        Some(label) if !label.is_empty() => label,
        _ => return (name.to_string(), None),
    };

    let time = time.split('-').next().unwrap_or(time);
    let created_at = NaiveDateTime::parse_from_str(
        &format!("{date}_{time}"),
        NAME_TIME_FORMAT,
    )
    .ok()
    .map(|naive| naive.and_utc());

    (label_part.replace('_', "-"), created_at)
}

fn dir_mtime(path: &Path) -> DateTime<Utc> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}
