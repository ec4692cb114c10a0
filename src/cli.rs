//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kiln content build pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: kiln.toml)
    #[arg(short = 'C', long, default_value = "kiln.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared build arguments for Build and Watch commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Clean output directory completely before building
    #[arg(long)]
    pub clean: bool,

    /// Include draft content in the build
    #[arg(short, long)]
    pub drafts: bool,

    /// Override base URL for the site.
    ///
    /// Useful for CI/CD deployments where the production URL differs from
    /// local development, without touching kiln.toml.
    #[arg(long = "base-url")]
    pub base_url: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one build pass and exit
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Build, then watch for changes and rebuild automatically
    Watch {
        #[command(flatten)]
        build_args: BuildArgs,
    },
}

impl Cli {
    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch { .. })
    }

    pub const fn build_args(&self) -> &BuildArgs {
        match &self.command {
            Commands::Build { build_args } | Commands::Watch { build_args } => build_args,
        }
    }
}
