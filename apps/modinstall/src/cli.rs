//! Command line interface definition

use clap::{Parser, Subcommand};
use modinstall_types::ColorChoice;
use std::path::PathBuf;

/// modinstall - Install web application modules from source archives
#[derive(Parser)]
#[command(name = "modinstall")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Install web application modules from source archives")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the log directory (`paths.log_dir`)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding installed modules
    #[arg(long, global = true, value_name = "DIR")]
    pub target_root: Option<PathBuf>,

    /// Parent directory for per-run staging directories
    #[arg(long, global = true, value_name = "DIR")]
    pub staging_root: Option<PathBuf>,

    /// SQLite database migrations are applied to
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Skip TLS certificate verification when downloading
    #[arg(long, global = true)]
    pub insecure: bool,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Download a module archive and install it into the target root
    #[command(alias = "i")]
    Install {
        /// Repository URL, e.g. https://github.com/acme/widgets
        url: String,

        /// Branch to install (defaults to source.default_ref)
        #[arg(long = "ref", value_name = "REF")]
        reference: Option<String>,
    },

    /// Show the id and namespace derived from an extracted package directory
    Identify {
        /// Package root directory
        dir: PathBuf,
    },

    /// List pending migrations for a namespace or directory
    Migrations {
        /// Namespace (backslash separated) or directory path
        target: String,

        /// Apply the pending migrations
        #[arg(long)]
        apply: bool,
    },
}

impl Commands {
    /// Operation name used in events and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Install { .. } => "install",
            Self::Identify { .. } => "identify",
            Self::Migrations { apply: true, .. } => "migrations apply",
            Self::Migrations { .. } => "migrations",
        }
    }
}
