//! One-to-many configuration copy with partial-failure semantics
//!
//! The engine processes every target of a [`CopyRequest`] independently and
//! in input order; a failure on one target never prevents attempts on the
//! others. When `auto_backup` is set, the target is snapshotted through the
//! [`BackupStore`] before it is touched, and a backup failure skips the
//! overwrite for that target rather than mutating it without a safety net.

use crate::backup::BackupStore;
use crate::error::{Result, RoleSyncError};
use crate::fsutil;
use crate::types::{CopyFailure, CopyRequest, CopyResult, ProgressCallback, ProgressInfo, Role};
use tracing::{debug, info, warn};

/// Orchestrates source-to-targets config tree overwrites
pub struct CopyEngine {
    backup_store: BackupStore,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for CopyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyEngine")
            .field("backup_store", &self.backup_store)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl CopyEngine {
    /// Create an engine that snapshots through `backup_store`
    pub fn new(backup_store: BackupStore) -> Self {
        Self {
            backup_store,
            progress_callback: None,
        }
    }

    /// Register a callback invoked once per target as the batch progresses
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Run a copy batch
    ///
    /// Returns `Err` only when the source itself is unusable (its config
    /// directory is missing), in which case nothing was mutated. All
    /// per-target problems are recorded in the returned [`CopyResult`].
    pub fn copy(&self, request: &CopyRequest) -> Result<CopyResult> {
        if !request.source.path.is_dir() {
            return Err(RoleSyncError::copy(format!(
                "source path does not exist: {}",
                request.source.path.display()
            )));
        }

        let total = request.targets.len();
        info!(
            "copying {} to {} targets (auto_backup: {})",
            request.source.label(),
            total,
            request.auto_backup
        );

        let mut result = CopyResult::default();
        for (index, target) in request.targets.iter().enumerate() {
            self.report_progress(index, total, target);

            match self.copy_one(request, target) {
                Ok(()) => {
                    debug!("copied onto {}", target.label());
                    result.success_count += 1;
                }
                Err(err) => {
                    warn!("copy onto {} failed: {}", target.label(), err);
                    result.failed.push(CopyFailure {
                        role_label: target.label(),
                        error: err.user_message(),
                    });
                }
            }
        }

        self.report_done(total);
        Ok(result)
    }

    /// Attempt one target: validate, optionally back up, then overwrite
    fn copy_one(&self, request: &CopyRequest, target: &Role) -> Result<()> {
        if target.same_path(&request.source) {
            return Err(RoleSyncError::validation(
                "source and target are the same role",
            ));
        }

        if request.auto_backup {
            // A target whose directory has vanished fails the snapshot here
            // rather than being recreated without one.
            self.backup_store.create(target)?;
        }

        fsutil::replace_tree(&request.source.path, &target.path)
    }

    fn report_progress(&self, index: usize, total: usize, target: &Role) {
        if let Some(callback) = &self.progress_callback {
            callback(ProgressInfo {
                operation: "copy".to_string(),
                current_item: Some(target.label()),
                processed: index,
                total,
            });
        }
    }

    fn report_done(&self, total: usize) {
        if let Some(callback) = &self.progress_callback {
            callback(ProgressInfo {
                operation: "copy".to_string(),
                current_item: None,
                processed: total,
                total,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn role_on_server(root: &Path, server: &str, character: &str, content: &[u8]) -> Role {
        let path = root.join("acc/r1").join(server).join(character);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("keybinds.ini"), content).unwrap();
        Role {
            account: "acc".to_string(),
            region: "r1".to_string(),
            server: server.to_string(),
            character: character.to_string(),
            path,
        }
    }

    fn role_with_tree(root: &Path, character: &str, content: &[u8]) -> Role {
        role_on_server(root, "s1", character, content)
    }

    fn engine(root: &Path) -> CopyEngine {
        CopyEngine::new(BackupStore::open(root.join("backups")).unwrap())
    }

    #[test]
    fn test_copy_to_multiple_targets() {
        let tmp = TempDir::new().unwrap();
        let source = role_with_tree(tmp.path(), "main", b"F1=attack");
        let t1 = role_with_tree(tmp.path(), "alt1", b"old1");
        let t2 = role_with_tree(tmp.path(), "alt2", b"old2");

        let result = engine(tmp.path())
            .copy(&CopyRequest {
                source: source.clone(),
                targets: vec![t1.clone(), t2.clone()],
                auto_backup: false,
            })
            .unwrap();

        assert_eq!(result.success_count, 2);
        assert!(result.is_complete_success());
        assert_eq!(fs::read(t1.path.join("keybinds.ini")).unwrap(), b"F1=attack");
        assert_eq!(fs::read(t2.path.join("keybinds.ini")).unwrap(), b"F1=attack");
    }

    #[test]
    fn test_self_copy_is_rejected_without_mutation() {
        let tmp = TempDir::new().unwrap();
        let source = role_with_tree(tmp.path(), "main", b"F1=attack");

        let result = engine(tmp.path())
            .copy(&CopyRequest {
                source: source.clone(),
                targets: vec![source.clone()],
                auto_backup: false,
            })
            .unwrap();

        assert_eq!(result.success_count, 0);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].role_label, source.label());
        assert_eq!(fs::read(source.path.join("keybinds.ini")).unwrap(), b"F1=attack");
    }

    #[test]
    fn test_missing_source_aborts_batch() {
        let tmp = TempDir::new().unwrap();
        let target = role_with_tree(tmp.path(), "alt", b"old");
        let source = Role {
            account: "acc".into(),
            region: "r1".into(),
            server: "s1".into(),
            character: "ghost".into(),
            path: tmp.path().join("acc/r1/s1/ghost"),
        };

        let err = engine(tmp.path()).copy(&CopyRequest {
            source,
            targets: vec![target.clone()],
            auto_backup: false,
        });
        assert!(matches!(err, Err(RoleSyncError::Copy(_))));
        assert_eq!(fs::read(target.path.join("keybinds.ini")).unwrap(), b"old");
    }

    #[test]
    fn test_auto_backup_snapshots_target_first() {
        let tmp = TempDir::new().unwrap();
        let store = BackupStore::open(tmp.path().join("backups")).unwrap();
        let engine = CopyEngine::new(store.clone());
        let source = role_with_tree(tmp.path(), "main", b"new");
        let target = role_with_tree(tmp.path(), "alt", b"precious");

        engine
            .copy(&CopyRequest {
                source,
                targets: vec![target.clone()],
                auto_backup: true,
            })
            .unwrap();

        let backups = store.list(None).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].source_role_path, target.path);

        // The snapshot preserves the pre-copy content.
        store.restore(&backups[0].name, &target).unwrap();
        assert_eq!(fs::read(target.path.join("keybinds.ini")).unwrap(), b"precious");
    }

    #[test]
    fn test_partial_failure_isolation() {
        let tmp = TempDir::new().unwrap();
        let source = role_on_server(tmp.path(), "s1", "main", b"new");
        let a = role_on_server(tmp.path(), "s2", "alt-a", b"old-a");
        let c = role_on_server(tmp.path(), "s4", "alt-c", b"old-c");

        // B's server "directory" is a regular file, so the stage-and-swap
        // cannot create anything under it.
        fs::write(tmp.path().join("acc/r1/s3"), b"not a dir").unwrap();
        let b = Role {
            account: "acc".to_string(),
            region: "r1".to_string(),
            server: "s3".to_string(),
            character: "alt-b".to_string(),
            path: tmp.path().join("acc/r1/s3/alt-b"),
        };

        let result = engine(tmp.path())
            .copy(&CopyRequest {
                source: source.clone(),
                targets: vec![a.clone(), b.clone(), c.clone()],
                auto_backup: false,
            })
            .unwrap();

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].role_label, b.label());
        assert_eq!(fs::read(a.path.join("keybinds.ini")).unwrap(), b"new");
        assert_eq!(fs::read(c.path.join("keybinds.ini")).unwrap(), b"new");
    }

    #[test]
    fn test_backup_failure_skips_overwrite() {
        let tmp = TempDir::new().unwrap();
        // Point the store at a path that is a file, so create() always fails.
        let bogus_root = tmp.path().join("backups");
        let store = BackupStore::open(&bogus_root).unwrap();
        fs::remove_dir_all(&bogus_root).unwrap();
        fs::write(&bogus_root, b"not a dir").unwrap();

        let engine = CopyEngine::new(store);
        let source = role_with_tree(tmp.path(), "main", b"new");
        let target = role_with_tree(tmp.path(), "alt", b"precious");

        let result = engine
            .copy(&CopyRequest {
                source,
                targets: vec![target.clone()],
                auto_backup: true,
            })
            .unwrap();

        assert_eq!(result.success_count, 0);
        assert_eq!(result.failed.len(), 1);
        // Never overwrite without the requested safety net.
        assert_eq!(fs::read(target.path.join("keybinds.ini")).unwrap(), b"precious");
    }

    #[test]
    fn test_auto_backup_required_even_for_missing_target() {
        let tmp = TempDir::new().unwrap();
        let store = BackupStore::open(tmp.path().join("backups")).unwrap();
        let engine = CopyEngine::new(store.clone());
        let source = role_with_tree(tmp.path(), "main", b"new");
        let ghost = Role {
            account: "acc".to_string(),
            region: "r1".to_string(),
            server: "s1".to_string(),
            character: "ghost".to_string(),
            path: tmp.path().join("acc/r1/s1/ghost"),
        };

        let result = engine
            .copy(&CopyRequest {
                source,
                targets: vec![ghost.clone()],
                auto_backup: true,
            })
            .unwrap();

        assert_eq!(result.success_count, 0);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].role_label, ghost.label());
        // The target was not created without its snapshot.
        assert!(!ghost.path.exists());
        assert!(store.list(None).unwrap().is_empty());
    }

    #[test]
    fn test_progress_callback_fires_per_target() {
        let tmp = TempDir::new().unwrap();
        let source = role_with_tree(tmp.path(), "main", b"new");
        let t1 = role_with_tree(tmp.path(), "alt1", b"old");
        let t2 = role_with_tree(tmp.path(), "alt2", b"old");

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let engine = engine(tmp.path()).with_progress(Arc::new(move |info: ProgressInfo| {
            seen.fetch_add(1, Ordering::SeqCst);
            assert_eq!(info.total, 2);
        }));

        engine
            .copy(&CopyRequest {
                source,
                targets: vec![t1, t2],
                auto_backup: false,
            })
            .unwrap();

        // One call per target plus the completion call.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
