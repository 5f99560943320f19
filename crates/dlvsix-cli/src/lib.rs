//! dlvsix - offline editor extensions
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Mirrors the extensions installed in a local VS Code-compatible editor,
//! plus the matching client/server builds, into a work directory that can be
//! carried to a machine without network access and installed there.
//!
//! # Directory Layout
//!
//! ```text
//! vscode-extensions/          # DLVSIX_HOME
//! ├── extensions/<id>/<ver>/  # <id>-<ver>[@<platform>].vsix
//! └── dist/<commit>/          # installers, server builds, CLI
//! ```

pub mod ops;
pub mod ui;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use dlvsix_schema::{PlatformId, TargetSelection};

#[derive(Debug, Parser)]
#[command(name = "dlvsix")]
#[command(author, version, about = "Download editor extensions and installation files")]
pub struct Cli {
    /// Set the log level (overridden by RUST_LOG)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// More output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Cli {
    /// Effective log level from the flags. Defaults to `info`.
    pub fn log_level(&self) -> LogLevel {
        if let Some(level) = self.log_level {
            return level;
        }
        match (self.quiet, self.verbose) {
            (true, _) => LogLevel::Error,
            (false, 0 | 1) => LogLevel::Info,
            (false, _) => LogLevel::Debug,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download the local editor's extensions and installers
    Download(DownloadArgs),
    /// Install downloaded extensions into an editor's extensions directory
    Install(InstallArgs),
}

#[derive(Debug, clap::Args)]
pub struct DownloadArgs {
    /// Path to the editor installation (contains resources/app/product.json)
    #[arg(long)]
    pub code_home: PathBuf,

    /// Extensions directory to mirror (default: ~/<dataFolderName>/extensions)
    #[arg(long)]
    pub extensions_dir: Option<PathBuf>,

    /// Marketplace service URL (default: from product.json)
    #[arg(short, long, env = "DLVSIX_MARKETPLACE_URL")]
    pub marketplace_url: Option<String>,

    /// Update API URL (default: from product.json)
    #[arg(long, env = "DLVSIX_UPDATE_URL")]
    pub update_url: Option<String>,

    /// Work directory for downloads
    #[arg(long, env = "DLVSIX_HOME")]
    pub work_dir: Option<PathBuf>,

    /// Client platform, or ALL
    #[arg(short, long, default_value = "win32-x64")]
    pub platform: TargetSelection,

    /// Server platform, or ALL
    #[arg(short, long, default_value = "linux-x64")]
    pub server_platform: TargetSelection,

    /// Always download the server build
    #[arg(long, conflicts_with = "no_download_server")]
    pub download_server: bool,

    /// Never download the server build, even with remoting extensions installed
    #[arg(long)]
    pub no_download_server: bool,

    /// Do not download the client installer
    #[arg(long)]
    pub no_download_client: bool,

    /// Do not download any editor distributions
    #[arg(short = 'x', long, visible_alias = "no-download-dists")]
    pub extensions_only: bool,

    /// Ignore an extension by id (repeatable, case-insensitive; also read from .vsixignore)
    #[arg(short, long = "ignore-extension", value_name = "EXTENSION_ID")]
    pub ignored: Vec<String>,

    /// Only print what would be downloaded
    #[arg(long)]
    pub dry_run: bool,
}

impl DownloadArgs {
    /// Whether to fetch server builds, given what the inventory suggests.
    pub fn wants_server(&self, has_remoting_extension: bool) -> bool {
        if self.download_server {
            true
        } else if self.no_download_server {
            false
        } else {
            has_remoting_extension
        }
    }

    /// Platforms to fetch extension packages for.
    pub fn extension_platforms(&self) -> std::collections::BTreeSet<PlatformId> {
        let mut platforms = self.platform.platforms();
        platforms.extend(self.server_platform.platforms());
        platforms
    }
}

#[derive(Debug, clap::Args)]
pub struct InstallArgs {
    /// Editor data directory to install into (default: ~/.vscode, or ~/.vscode-server over SSH/WSL)
    #[arg(long, conflicts_with_all = ["server", "client"])]
    pub code_home: Option<PathBuf>,

    /// Install into ~/.vscode-server
    #[arg(short, long, conflicts_with = "client")]
    pub server: bool,

    /// Install into ~/.vscode
    #[arg(short, long)]
    pub client: bool,

    /// Directory holding downloaded packages (default: <work dir>/extensions)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Platform to install for (default: this machine)
    #[arg(long)]
    pub platform: Option<PlatformId>,
}
