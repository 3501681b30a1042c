pub mod app;
pub mod commands;

pub use app::{App, Backends};

use crate::infra::docker_adapter::DEFAULT_ENGINE;
use crate::infra::ecr_registry::DEFAULT_REGION;
use crate::infra::kitchen_cli::DEFAULT_KITCHEN;
use crate::infra::settings::{IMAGE_PREFIX_ENV, REGISTRY_ENV};
use crate::services::DEFAULT_SUITE;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kim", version, about = "Kitchen Image Manager")]
pub struct Cli {
    /// Registry the scoped images live in
    #[arg(long, env = REGISTRY_ENV, global = true)]
    pub registry: Option<String>,

    /// Prefix of every scoped repository (default: ci/cookbooks)
    #[arg(long, env = IMAGE_PREFIX_ENV, global = true)]
    pub image_prefix: Option<String>,

    /// AWS region of the registry
    #[arg(long, env = "KIM_AWS_REGION", default_value = DEFAULT_REGION, global = true)]
    pub region: String,

    /// Container engine binary
    #[arg(long, env = "KIM_CONTAINER_ENGINE", default_value = DEFAULT_ENGINE, global = true)]
    pub engine: String,

    /// test-kitchen binary
    #[arg(long, env = "KIM_KITCHEN_BIN", default_value = DEFAULT_KITCHEN, global = true)]
    pub kitchen: String,

    /// Cookbook directory (default: current directory)
    #[arg(long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

// Help text for each verb comes from `commands::COMMANDS`
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    Commit,
    Converge,
    Create,
    Destroy {
        instance: Option<String>,
    },
    Exec {
        #[arg(allow_hyphen_values = true)]
        command: String,
    },
    #[command(name = "generate_metadata_file")]
    GenerateMetadataFile {
        #[arg(default_value = "patch")]
        kind: String,
    },
    Login {
        instance: String,
    },
    Shutdown,
    Start,
    Test {
        #[arg(long, default_value = DEFAULT_SUITE)]
        suite: String,
        #[arg(long)]
        from_scratch: bool,
    },
    Verify,
}

/// The clap command with descriptions and the usage listing attached
pub fn command() -> clap::Command {
    let mut cmd = Cli::command().after_help(commands::usage("kim"));
    for spec in commands::COMMANDS {
        cmd = cmd.mut_subcommand(spec.name, |sub| sub.about(spec.description));
    }
    cmd
}

pub fn parse() -> Cli {
    let matches = command().get_matches();
    Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

pub fn try_parse_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    Cli::from_arg_matches(&matches)
}
