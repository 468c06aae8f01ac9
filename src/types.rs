//! Core data types used throughout the rolesync library
//!
//! The types in this module represent:
//! - Identity: [`Role`] and [`RoleCatalog`], characters discovered on disk
//! - Snapshots: [`Backup`], the metadata of a stored configuration snapshot
//! - Operations: [`CopyRequest`], [`CopyResult`], [`CopyFailure`]
//! - Derived views: [`FilterOptions`]
//! - Progress: [`ProgressInfo`], [`ProgressCallback`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One game character's identity plus its configuration directory
///
/// Roles are immutable value objects produced by the scanner. Two roles are
/// considered the same iff their `path` is equal; the textual identity
/// fields exist for display and filtering only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    /// Account folder name
    pub account: String,
    /// Region (grouping) folder name
    pub region: String,
    /// Server folder name
    pub server: String,
    /// Character folder name
    pub character: String,
    /// Absolute directory holding this character's config files
    pub path: PathBuf,
}

impl Role {
    /// Canonical display key: `account-region-server-character`
    pub fn label(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.account, self.region, self.server, self.character
        )
    }

    /// Whether this role occupies the same config directory as `other`
    pub fn same_path(&self, other: &Role) -> bool {
        self.path == other.path
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Ordered collection of roles produced by one scan
///
/// Rebuilt on every scan request; iteration order is the scanner's stable
/// traversal order, so two scans of an unchanged tree compare equal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleCatalog {
    roles: Vec<Role>,
}

impl RoleCatalog {
    /// Build a catalog from scanner output
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }

    /// All roles, in scan order
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Number of roles in the catalog
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Iterate over roles in scan order
    pub fn iter(&self) -> std::slice::Iter<'_, Role> {
        self.roles.iter()
    }

    /// Look up a role by its config directory path
    pub fn find_by_path(&self, path: &Path) -> Option<&Role> {
        self.roles.iter().find(|r| r.path == path)
    }

    /// Distinct account names, sorted ascending
    pub fn accounts(&self) -> Vec<String> {
        Self::distinct(self.roles.iter().map(|r| r.account.as_str()))
    }

    /// Distinct region names, sorted ascending
    pub fn regions(&self) -> Vec<String> {
        Self::distinct(self.roles.iter().map(|r| r.region.as_str()))
    }

    /// Distinct server names, sorted ascending
    pub fn servers(&self) -> Vec<String> {
        Self::distinct(self.roles.iter().map(|r| r.server.as_str()))
    }

    /// Derived filter options for UI dropdowns
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            accounts: self.accounts(),
            regions: self.regions(),
            servers: self.servers(),
        }
    }

    /// Roles matching the given (optional) account/region/server filters
    pub fn filter(
        &self,
        account: Option<&str>,
        region: Option<&str>,
        server: Option<&str>,
    ) -> Vec<&Role> {
        self.roles
            .iter()
            .filter(|r| account.map_or(true, |a| r.account == a))
            .filter(|r| region.map_or(true, |g| r.region == g))
            .filter(|r| server.map_or(true, |s| r.server == s))
            .collect()
    }

    /// Target candidates for a copy from `source`: every role except those
    /// sharing the source's path
    pub fn targets_for(&self, source: &Role) -> Vec<&Role> {
        self.roles
            .iter()
            .filter(|r| !r.same_path(source))
            .collect()
    }

    fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
        let mut out: Vec<String> = values.map(str::to_string).collect();
        out.sort();
        out.dedup();
        out
    }
}

impl<'a> IntoIterator for &'a RoleCatalog {
    type Item = &'a Role;
    type IntoIter = std::slice::Iter<'a, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.roles.iter()
    }
}

/// Distinct account/region/server values derived from a catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterOptions {
    /// Distinct account names, sorted
    pub accounts: Vec<String>,
    /// Distinct region names, sorted
    pub regions: Vec<String>,
    /// Distinct server names, sorted
    pub servers: Vec<String>,
}

/// Metadata of one stored configuration snapshot
///
/// The physical snapshot is a plain directory tree under the backup root,
/// named so that lexicographic order within one role matches creation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backup {
    /// Unique, sortable name encoding role identity and creation time
    pub name: String,
    /// Human-readable origin label (`account-region-server-character`)
    pub role_label: String,
    /// Config directory the snapshot was taken from
    pub source_role_path: PathBuf,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Total size of the snapshot tree in bytes
    pub size_bytes: u64,
}

/// A one-to-many copy request
#[derive(Debug, Clone)]
pub struct CopyRequest {
    /// Role whose config tree is copied
    pub source: Role,
    /// Roles whose config trees are overwritten, in attempt order
    pub targets: Vec<Role>,
    /// Take a backup of each target before overwriting it
    pub auto_backup: bool,
}

/// One failed target in a copy batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CopyFailure {
    /// Display label of the target that failed
    pub role_label: String,
    /// Failure description
    pub error: String,
}

/// Itemized outcome of a copy batch
///
/// Every target is attempted exactly once; `success_count + failed.len()`
/// always equals the number of requested targets, so callers can reconstruct
/// which targets need retrying.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CopyResult {
    /// Number of targets copied successfully
    pub success_count: usize,
    /// Targets that failed, in attempt order
    pub failed: Vec<CopyFailure>,
}

impl CopyResult {
    /// Whether every target succeeded
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of targets attempted
    pub fn attempted(&self) -> usize {
        self.success_count + self.failed.len()
    }
}

/// Progress callback for long-running operations
pub type ProgressCallback = Arc<dyn Fn(ProgressInfo) + Send + Sync>;

/// Information passed to progress callbacks
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Operation being performed
    pub operation: String,
    /// Current item being processed
    pub current_item: Option<String>,
    /// Items processed so far
    pub processed: usize,
    /// Total items to process
    pub total: usize,
}

impl ProgressInfo {
    /// Get progress as a percentage (0-100)
    pub fn percentage(&self) -> Option<f32> {
        if self.total > 0 {
            Some((self.processed as f32 / self.total as f32) * 100.0)
        } else {
            None
        }
    }
}
