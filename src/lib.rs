//! # rolesync - Game character configuration copier
//!
//! A backend engine for copying one game character's local configuration
//! tree (keybinds, UI layout, macros) onto one or more other characters
//! stored under a shared game installation, with safety nets: pre-copy
//! backups, restore, and per-role retention.
//!
//! ## Overview
//!
//! rolesync works on the game's per-account `userdata` directory, whose
//! `account/region/server/character` nesting it turns into addressable
//! "roles":
//!
//! - **Scanning**: walk the userdata root and produce a deterministic
//!   [`RoleCatalog`] of every character found, with derived account / region
//!   / server filters
//! - **Copying**: overwrite one or many targets with a source role's full
//!   config tree, each target attempted independently (partial-failure
//!   semantics)
//! - **Backups**: snapshot a role's tree before it is overwritten, list and
//!   delete snapshots, and keep at most five per role automatically
//! - **Restoring**: apply a stored snapshot back onto a known role
//!
//! Config trees are opaque, game-owned content: they are copied whole, never
//! interpreted, diffed, or merged.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rolesync::RoleSync;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sync = RoleSync::open(PathBuf::from("/games/jx3/userdata"))?;
//!
//! // Discover characters
//! let catalog = sync.scan_roles()?;
//! for role in &catalog {
//!     println!("{} -> {:?}", role, role.path);
//! }
//!
//! // Copy the first role's config onto every other role, with backups
//! let source = &catalog.roles()[0];
//! let targets: Vec<_> = catalog
//!     .targets_for(source)
//!     .iter()
//!     .map(|r| r.path.clone())
//!     .collect();
//! let result = sync.copy_config(&source.path, &targets, true)?;
//! println!("{} ok, {} failed", result.success_count, result.failed.len());
//!
//! // Roll a target back from its newest snapshot
//! if let Some(backup) = sync.list_backups(Some(1))?.first() {
//!     sync.restore_backup(&backup.name, &targets[0])?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Atomicity
//!
//! Every destructive directory overwrite (copy and restore alike) goes
//! through a single stage-then-swap primitive: the new tree is staged next
//! to the target and renamed into place, so an interrupted operation leaves
//! the target either fully old or fully new, never mixed. Backup creation is
//! staged the same way, so a half-written snapshot is never visible.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, RoleSyncError>`. Scan errors abort the
//! whole scan; per-target copy errors are itemized in [`CopyResult`] and
//! never abort the batch; backup and restore errors are explicit failures.
//! I/O errors caused by a running game holding file locks report as
//! recoverable (see [`RoleSyncError::is_recoverable`]).
//!
//! ## Module Organization
//!
//! - [`rolesync`]: the [`RoleSync`] facade and builder
//! - [`scanner`]: role discovery
//! - [`copier`]: one-to-many copy engine
//! - [`backup`]: snapshot store with retention
//! - [`config`]: persisted application settings
//! - [`locate`]: game installation probing
//! - [`types`]: common types and data structures
//! - [`error`]: error types and handling

// Public API modules
pub mod backup;
pub mod config;
pub mod copier;
pub mod error;
pub mod locate;
pub mod rolesync;
pub mod scanner;
pub mod types;

// Internal modules (not part of public API)
mod fsutil;

// Re-export main types for convenience
pub use backup::{BackupStore, DEFAULT_MAX_BACKUPS_PER_ROLE};
pub use config::SyncConfig;
pub use copier::CopyEngine;
pub use error::{Result, RoleSyncError};
pub use fsutil::{format_bytes, trees_equal};
pub use rolesync::{RoleSync, RoleSyncBuilder};
pub use scanner::RoleScanner;
pub use types::*;
