//! Error types for the rolesync library
//!
//! All fallible operations return [`Result<T>`]. The error taxonomy follows
//! the operation boundaries: scan-level errors abort a whole scan, per-target
//! copy errors are captured in [`crate::types::CopyResult`] and never abort
//! the batch, and backup/restore errors are returned as explicit failures.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the rolesync library
pub type Result<T> = std::result::Result<T, RoleSyncError>;

/// Main error type for all rolesync operations
#[derive(Debug, Error)]
pub enum RoleSyncError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The userdata root to scan does not exist or is not a directory
    #[error("Scan root not found or not a directory: {0:?}")]
    RootNotFound(PathBuf),

    /// A referenced role path is not part of the current catalog
    #[error("Role not found at path: {0:?}")]
    RoleNotFound(PathBuf),

    /// A referenced backup name does not exist in the store
    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    /// Request validation failed (e.g. source used as its own target)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Snapshot creation failed
    #[error("Backup failed: {0}")]
    Backup(String),

    /// Snapshot application failed
    #[error("Restore failed: {0}")]
    Restore(String),

    /// Copy operation failed at a level that prevents any target attempt
    #[error("Copy failed: {0}")]
    Copy(String),
}

impl RoleSyncError {
    /// Create a validation error with a custom message
    pub fn validation(msg: impl Into<String>) -> Self {
        RoleSyncError::Validation(msg.into())
    }

    /// Create a backup error with a custom message
    pub fn backup(msg: impl Into<String>) -> Self {
        RoleSyncError::Backup(msg.into())
    }

    /// Create a restore error with a custom message
    pub fn restore(msg: impl Into<String>) -> Self {
        RoleSyncError::Restore(msg.into())
    }

    /// Create a copy error with a custom message
    pub fn copy(msg: impl Into<String>) -> Self {
        RoleSyncError::Copy(msg.into())
    }

    /// Check if this error is likely transient and worth retrying
    ///
    /// A running game process commonly holds locks on config files; those
    /// surface as permission or sharing-violation I/O errors and clear once
    /// the process exits.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RoleSyncError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            RoleSyncError::BackupNotFound(name) => {
                format!("Backup '{}' not found. Use 'list_backups()' to see available backups.", name)
            }
            RoleSyncError::RoleNotFound(path) => {
                format!("No role exists at {:?}. Re-scan the userdata root; the character may have been removed.", path)
            }
            RoleSyncError::RootNotFound(path) => {
                format!("Userdata root {:?} does not exist. Check the configured game path.", path)
            }
            RoleSyncError::Io(err) if self.is_recoverable() => {
                format!("IO error: {}. The game may be running and holding file locks; close it and retry.", err)
            }
            _ => self.to_string(),
        }
    }
}
