//! Persisted application settings
//!
//! A small JSON settings file remembers the resolved game paths and user
//! preferences between runs. Missing files fall back to defaults and unknown
//! keys are ignored, so the format can grow without breaking older files.

use crate::backup::DEFAULT_MAX_BACKUPS_PER_ROLE;
use crate::error::Result;
use crate::fsutil;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application settings persisted as JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Game installation root (as the user selected it)
    pub game_path: Option<PathBuf>,
    /// Resolved per-account userdata root
    pub userdata_path: Option<PathBuf>,
    /// Backup root override; defaults beside the userdata root when unset
    pub backup_dir: Option<PathBuf>,
    /// Snapshot each target before overwriting it
    pub auto_backup: bool,
    /// Ask for confirmation before a copy batch
    pub confirm_before_copy: bool,
    /// Retained backups per distinct source role
    pub max_backups: usize,
    /// Config format version
    pub version: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            game_path: None,
            userdata_path: None,
            backup_dir: None,
            auto_backup: true,
            confirm_before_copy: true,
            max_backups: DEFAULT_MAX_BACKUPS_PER_ROLE,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl SyncConfig {
    /// Load settings from `path`, falling back to defaults when the file is
    /// missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            debug!("no config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read(path)?;
        let config = serde_json::from_slice(&content)?;
        Ok(config)
    }

    /// Persist settings to `path` atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec_pretty(self)?;
        fsutil::atomic_write(path, &content)
    }

    /// Effective backup root for a given userdata root
    ///
    /// The explicit override wins; otherwise backups live in a sibling of
    /// the userdata directory so they survive game reinstalls that wipe it.
    pub fn backup_root_for(&self, userdata_root: &Path) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => dir.clone(),
            None => userdata_root
                .parent()
                .unwrap_or(userdata_root)
                .join("userdata_backup"),
        }
    }
}
