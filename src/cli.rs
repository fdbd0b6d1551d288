//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::resolver::ResolveOptions;

/// Top-level CLI entry point for the provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "provision",
    about = "Declarative, dependency-resolved machine provisioning",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the configured tasks and run them
    Run(RunOpts),
    /// Resolve the configured tasks and print the plan without running it
    Plan(PlanOpts),
    /// Check scripts for blocks that break task extraction
    Check(CheckOpts),
    /// Print version information
    Version,
}

/// Task selection shared by `run` and `plan`.
#[derive(Args, Debug, Clone)]
pub struct SelectOpts {
    /// Tasks to enable, as `name` or `name:arg1:arg2`
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Custom configuration file layered over the default one
    #[arg(short = 'f', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Directory holding the default config and per-task config files
    #[arg(short = 'd', long = "config-dir", value_name = "DIR", default_value = ".")]
    pub config_directory: PathBuf,

    /// Default configuration file [default: <config-dir>/default.yaml]
    #[arg(long, value_name = "FILE")]
    pub default_config: Option<PathBuf>,

    /// Enable every task not explicitly disabled
    #[arg(long)]
    pub enable_all: bool,

    /// Enable the dependencies of enabled tasks
    #[arg(long)]
    pub enable_dependencies: bool,
}

impl SelectOpts {
    /// Resolver options for this selection.
    ///
    /// Switches that were not given leave the decision to the custom
    /// configuration.
    #[must_use]
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            default_config: self
                .default_config
                .clone()
                .unwrap_or_else(|| self.config_directory.join("default.yaml")),
            config_file: self.config_file.clone(),
            config_directory: self.config_directory.clone(),
            tasks: self.tasks.clone(),
            enable_all: self.enable_all.then_some(true),
            enable_dependencies: self.enable_dependencies.then_some(true),
        }
    }
}

/// Options for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunOpts {
    /// Task selection.
    #[command(flatten)]
    pub select: SelectOpts,
}

/// Options for the `plan` subcommand.
#[derive(Args, Debug, Clone)]
pub struct PlanOpts {
    /// Task selection.
    #[command(flatten)]
    pub select: SelectOpts,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Options for the `check` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckOpts {
    /// Scripts or directories to check
    #[arg(value_name = "PATH", default_value = ".")]
    pub paths: Vec<PathBuf>,
}
