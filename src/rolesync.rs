//! Main RoleSync implementation
//!
//! [`RoleSync`] is the entry point tying the subsystems together: the
//! scanner produces the role catalog, the copy engine performs one-to-many
//! overwrites (delegating pre-copy snapshots to the backup store), and the
//! restore path validates names and roles before applying a snapshot through
//! the same atomic tree-replace primitive.
//!
//! All operations are synchronous and run to completion before the next one
//! is accepted; mutating operations additionally serialize through an
//! internal write guard so overlapping callers cannot interleave writes to
//! the same role path.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use rolesync::RoleSync;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sync = RoleSync::open(PathBuf::from("/games/jx3/userdata"))?;
//!
//! let catalog = sync.scan_roles()?;
//! let source = &catalog.roles()[0];
//! let targets: Vec<_> = catalog
//!     .targets_for(source)
//!     .iter()
//!     .map(|r| r.path.clone())
//!     .collect();
//!
//! let result = sync.copy_config(&source.path, &targets, true)?;
//! println!("copied to {} targets", result.success_count);
//! # Ok(())
//! # }
//! ```

use crate::backup::{BackupStore, DEFAULT_MAX_BACKUPS_PER_ROLE};
use crate::copier::CopyEngine;
use crate::error::{Result, RoleSyncError};
use crate::scanner::RoleScanner;
use crate::types::{
    Backup, CopyRequest, CopyResult, FilterOptions, ProgressCallback, Role, RoleCatalog,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Facade over role discovery, copying, and backup management
pub struct RoleSync {
    scanner: RoleScanner,
    backup_store: BackupStore,
    copy_engine: CopyEngine,
    /// Serializes mutating operations (copy, restore)
    write_guard: Mutex<()>,
}

impl std::fmt::Debug for RoleSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleSync")
            .field("userdata_root", &self.scanner.root())
            .field("backup_root", &self.backup_store.backup_root())
            .finish()
    }
}

impl RoleSync {
    /// Open with defaults: backups beside the userdata root, retention of
    /// five per role
    pub fn open(userdata_root: impl Into<PathBuf>) -> Result<Self> {
        RoleSyncBuilder::new().build(userdata_root)
    }

    /// The userdata root being managed
    pub fn userdata_root(&self) -> &Path {
        self.scanner.root()
    }

    /// The underlying backup store
    pub fn backup_store(&self) -> &BackupStore {
        &self.backup_store
    }

    /// Scan the userdata root and produce the current role catalog
    #[instrument(skip(self))]
    pub fn scan_roles(&self) -> Result<RoleCatalog> {
        self.scanner.scan()
    }

    /// Derived filter options (distinct accounts, regions, servers)
    pub fn filters(&self, catalog: &RoleCatalog) -> FilterOptions {
        catalog.filter_options()
    }

    /// Copy one role's config tree onto each of the given target paths
    ///
    /// Source and targets are resolved against a fresh scan; an unknown
    /// source or target path fails the whole request with
    /// [`RoleSyncError::RoleNotFound`] before anything is mutated. Per-target
    /// copy problems never abort the batch and are itemized in the result.
    #[instrument(skip(self, target_paths))]
    pub fn copy_config(
        &self,
        source_path: &Path,
        target_paths: &[PathBuf],
        auto_backup: bool,
    ) -> Result<CopyResult> {
        let _guard = self.write_guard.lock();

        let catalog = self.scan_roles()?;
        let source = self.resolve_role(&catalog, source_path)?.clone();
        let targets = target_paths
            .iter()
            .map(|path| self.resolve_role(&catalog, path).cloned())
            .collect::<Result<Vec<Role>>>()?;

        self.copy_engine.copy(&CopyRequest {
            source,
            targets,
            auto_backup,
        })
    }

    /// List stored backups, newest first
    pub fn list_backups(&self, limit: Option<usize>) -> Result<Vec<Backup>> {
        self.backup_store.list(limit)
    }

    /// Apply a stored snapshot back onto the role at `target_path`
    ///
    /// Validates that the backup exists and the target resolves to a
    /// currently-known role, then delegates to the store. No automatic
    /// backup of the target is taken first.
    #[instrument(skip(self))]
    pub fn restore_backup(&self, backup_name: &str, target_path: &Path) -> Result<()> {
        let _guard = self.write_guard.lock();

        let catalog = self.scan_roles()?;
        let target = self.resolve_role(&catalog, target_path)?.clone();
        self.backup_store.restore(backup_name, &target)
    }

    /// Delete one backup by name
    pub fn delete_backup(&self, backup_name: &str) -> Result<()> {
        self.backup_store.delete(backup_name)
    }

    /// Delete every backup, returning how many were removed
    pub fn clear_all_backups(&self) -> Result<usize> {
        self.backup_store.clear_all()
    }

    fn resolve_role<'a>(&self, catalog: &'a RoleCatalog, path: &Path) -> Result<&'a Role> {
        catalog
            .find_by_path(path)
            .ok_or_else(|| RoleSyncError::RoleNotFound(path.to_path_buf()))
    }
}

/// Builder for [`RoleSync`] with custom configuration
///
/// ```rust,no_run
/// use rolesync::RoleSyncBuilder;
/// use std::path::PathBuf;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sync = RoleSyncBuilder::new()
///     .backup_dir(PathBuf::from("/backups/jx3"))
///     .max_backups_per_role(10)
///     .build(PathBuf::from("/games/jx3/userdata"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct RoleSyncBuilder {
    backup_dir: Option<PathBuf>,
    max_backups_per_role: Option<usize>,
    progress_callback: Option<ProgressCallback>,
}

impl RoleSyncBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backups under an explicit directory instead of the default
    /// `userdata_backup` sibling of the userdata root
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    /// Retention cap per distinct source role (zero disables eviction)
    pub fn max_backups_per_role(mut self, max: usize) -> Self {
        self.max_backups_per_role = Some(max);
        self
    }

    /// Progress callback invoked per target during copy batches
    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Build the facade for the given userdata root
    pub fn build(self, userdata_root: impl Into<PathBuf>) -> Result<RoleSync> {
        let userdata_root = userdata_root.into();
        let backup_dir = self.backup_dir.unwrap_or_else(|| {
            userdata_root
                .parent()
                .unwrap_or(&userdata_root)
                .join("userdata_backup")
        });
        let max = self
            .max_backups_per_role
            .unwrap_or(DEFAULT_MAX_BACKUPS_PER_ROLE);

        let backup_store = BackupStore::with_retention(&backup_dir, max)?;
        let mut copy_engine = CopyEngine::new(backup_store.clone());
        if let Some(callback) = self.progress_callback {
            copy_engine = copy_engine.with_progress(callback);
        }

        info!(
            "rolesync ready: userdata {:?}, backups {:?} (cap {} per role)",
            userdata_root, backup_dir, max
        );
        Ok(RoleSync {
            scanner: RoleScanner::new(userdata_root),
            backup_store,
            copy_engine,
            write_guard: Mutex::new(()),
        })
    }
}
