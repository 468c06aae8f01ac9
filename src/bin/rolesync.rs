//! # rolesync CLI
//!
//! Command-line interface for the rolesync library.
//!
//! ## Usage
//! ```bash
//! # Remember where the game lives (resolves the userdata root)
//! rolesync setup /path/to/game
//!
//! # List discovered characters
//! rolesync scan
//!
//! # Copy one character's config onto others (backups taken first)
//! rolesync copy --source <ROLE_PATH> --target <ROLE_PATH> --target <ROLE_PATH>
//!
//! # Manage backups
//! rolesync backups
//! rolesync restore <BACKUP_NAME> --target <ROLE_PATH>
//! rolesync delete <BACKUP_NAME>
//! rolesync clear --yes
//! ```

use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rolesync::{
    format_bytes, locate, ProgressInfo, Result, RoleSyncBuilder, RoleSyncError, SyncConfig,
};
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_CONFIG_FILE: &str = "rolesync_config.json";

/// rolesync - copy a game character's config onto others, safely
#[derive(Parser)]
#[command(name = "rolesync")]
#[command(version)]
#[command(about = "Copy one character's configuration tree onto others, with backups and restore")]
struct Cli {
    /// Userdata root (overrides the configured one)
    #[arg(short, long, global = true)]
    userdata: Option<PathBuf>,

    /// Backup directory (defaults beside the userdata root)
    #[arg(short, long, global = true)]
    backup_dir: Option<PathBuf>,

    /// Settings file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a game installation and remember its userdata root
    Setup {
        /// Game installation directory (or the game executable)
        path: PathBuf,
    },

    /// Scan the userdata root and list discovered roles
    #[command(alias = "ls")]
    Scan {
        /// Filter by account
        #[arg(long)]
        account: Option<String>,

        /// Filter by region
        #[arg(long)]
        region: Option<String>,

        /// Filter by server
        #[arg(long)]
        server: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show distinct accounts, regions and servers
    Filters,

    /// Copy a source role's config onto one or more targets
    Copy {
        /// Source role path
        #[arg(short, long)]
        source: PathBuf,

        /// Target role path (repeatable)
        #[arg(short, long, required = true)]
        target: Vec<PathBuf>,

        /// Skip the pre-copy backup of each target
        #[arg(long)]
        no_backup: bool,
    },

    /// List backups, newest first
    Backups {
        /// Limit results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore a backup onto a role
    Restore {
        /// Backup name
        name: String,

        /// Target role path
        #[arg(short, long)]
        target: PathBuf,
    },

    /// Delete one backup
    Delete {
        /// Backup name
        name: String,
    },

    /// Delete all backups
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }

    if let Err(err) = run(cli) {
        eprintln!("{} {}", "error:".red().bold(), err.user_message());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = SyncConfig::load(&cli.config)?;

    if let Commands::Setup { path } = &cli.command {
        return setup(path, &mut config, &cli.config);
    }

    let userdata = cli
        .userdata
        .clone()
        .or_else(|| config.userdata_path.clone())
        .ok_or_else(|| {
            RoleSyncError::validation(
                "no userdata root configured; run 'rolesync setup <game path>' or pass --userdata",
            )
        })?;

    let mut builder = RoleSyncBuilder::new().max_backups_per_role(config.max_backups);
    if let Some(dir) = cli.backup_dir.clone().or_else(|| config.backup_dir.clone()) {
        builder = builder.backup_dir(dir);
    }

    match cli.command {
        Commands::Setup { .. } => unreachable!("handled above"),

        Commands::Scan {
            account,
            region,
            server,
            json,
        } => {
            let sync = builder.build(&userdata)?;
            let catalog = sync.scan_roles()?;
            let roles = catalog.filter(account.as_deref(), region.as_deref(), server.as_deref());

            if json {
                println!("{}", serde_json::to_string_pretty(&roles)?);
                return Ok(());
            }
            if roles.is_empty() {
                println!("{}", "no roles found".yellow());
                return Ok(());
            }
            println!("{}", format!("{} role(s):", roles.len()).bold());
            for role in roles {
                println!("  {}  {}", role.label().cyan(), role.path.display());
            }
        }

        Commands::Filters => {
            let sync = builder.build(&userdata)?;
            let catalog = sync.scan_roles()?;
            let filters = sync.filters(&catalog);
            println!("{} {}", "accounts:".bold(), filters.accounts.join(", "));
            println!("{} {}", "regions: ".bold(), filters.regions.join(", "));
            println!("{} {}", "servers: ".bold(), filters.servers.join(", "));
        }

        Commands::Copy {
            source,
            target,
            no_backup,
        } => {
            let bar = ProgressBar::new(target.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                    .expect("static template is valid")
                    .progress_chars("=>-"),
            );
            let progress = bar.clone();
            let sync = builder
                .progress_callback(Arc::new(move |info: ProgressInfo| {
                    progress.set_position(info.processed as u64);
                    if let Some(item) = info.current_item {
                        progress.set_message(item);
                    }
                }))
                .build(&userdata)?;

            let auto_backup = !no_backup && config.auto_backup;
            let result = sync.copy_config(&source, &target, auto_backup)?;
            bar.finish_and_clear();

            println!(
                "{} {} succeeded, {} failed",
                "copy complete:".bold(),
                result.success_count.to_string().green(),
                result.failed.len().to_string().red()
            );
            for failure in &result.failed {
                println!("  {} {} - {}", "failed:".red(), failure.role_label, failure.error);
            }
            if !result.failed.is_empty() {
                std::process::exit(2);
            }
        }

        Commands::Backups { limit, json } => {
            let sync = builder.build(&userdata)?;
            let backups = sync.list_backups(limit)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&backups)?);
                return Ok(());
            }
            if backups.is_empty() {
                println!("{}", "no backups".yellow());
                return Ok(());
            }
            for backup in backups {
                println!(
                    "{}  {}  {}  {}",
                    backup.name.cyan(),
                    backup.role_label,
                    backup.created_at.format("%Y-%m-%d %H:%M:%S"),
                    format_bytes(backup.size_bytes).dimmed()
                );
            }
        }

        Commands::Restore { name, target } => {
            let sync = builder.build(&userdata)?;
            sync.restore_backup(&name, &target)?;
            println!("{} restored {} onto {}", "ok:".green().bold(), name, target.display());
        }

        Commands::Delete { name } => {
            let sync = builder.build(&userdata)?;
            sync.delete_backup(&name)?;
            println!("{} deleted {}", "ok:".green().bold(), name);
        }

        Commands::Clear { yes } => {
            let sync = builder.build(&userdata)?;
            let count = sync.list_backups(None)?.len();
            if count == 0 {
                println!("{}", "no backups to clear".yellow());
                return Ok(());
            }
            if !yes && !confirm(&format!("delete all {count} backups?")) {
                println!("aborted");
                return Ok(());
            }
            let removed = sync.clear_all_backups()?;
            println!("{} removed {} backup(s)", "ok:".green().bold(), removed);
        }
    }

    Ok(())
}

/// Resolve the game path and persist the settings file
fn setup(path: &PathBuf, config: &mut SyncConfig, config_path: &PathBuf) -> Result<()> {
    let userdata = locate::resolve_userdata_root(path).ok_or_else(|| {
        RoleSyncError::validation(format!(
            "no userdata directory found under {:?}; is this the game installation?",
            path
        ))
    })?;
    if !locate::validate_userdata_root(&userdata) {
        return Err(RoleSyncError::validation(format!(
            "{:?} exists but contains no account folders",
            userdata
        )));
    }

    config.game_path = Some(path.clone());
    config.userdata_path = Some(userdata.clone());
    config.save(config_path)?;

    println!(
        "{} userdata root {} saved to {}",
        "ok:".green().bold(),
        userdata.display(),
        config_path.display()
    );
    Ok(())
}

fn confirm(prompt: &str) -> bool {
    use std::io::Write;
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush().ok();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
