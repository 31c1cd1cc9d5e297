// src/cli.rs

//! `backstage` command line.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::types::ItemKind;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "backstage",
    version,
    about = "Import screenplays and run item analysis through the screen tools backend."
)]
pub struct CliArgs {
    /// TOML config; built-in defaults apply when it does not exist.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: String,

    /// Overrides `BACKSTAGE_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Import a screenplay file into a new project.
    Import {
        /// Screenplay file to import.
        file: PathBuf,

        /// Project title.
        #[arg(long)]
        title: String,

        /// Explicit output path (used to resolve a collision).
        #[arg(long, value_name = "PATH")]
        output: Option<String>,

        /// Replace an existing project at the resolved path.
        #[arg(long)]
        overwrite: bool,
    },

    /// Analyze one item, or every item of a kind.
    Analyze {
        /// Project directory.
        project: PathBuf,

        /// Item kind (scenes, characters, locations).
        #[arg(long, value_parser = parse_kind, default_value = "scenes")]
        kind: ItemKind,

        /// Analyze only this item id; omit to analyze the whole kind.
        #[arg(long, value_name = "ID")]
        item: Option<String>,
    },

    /// Print per-kind analysis progress for a project.
    Status {
        /// Project directory.
        project: PathBuf,
    },

    /// Load + validate the config and print the effective values.
    CheckConfig,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_kind(s: &str) -> Result<ItemKind, String> {
    s.parse()
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
