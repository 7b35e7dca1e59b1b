use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::DEFAULT_PROFILE;

#[derive(Parser, Debug)]
#[command(name = "rigup")]
#[command(version)]
#[command(about = "Bring a workstation to the state described by a profile", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile the host with the profile
    Install(InstallArgs),

    /// Show what install would change, without changing anything
    Diff(DiffArgs),

    /// Show the detected platform
    Platform,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Which profile to use and which part of it
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Profile name, resolved to <config dir>/<name>.toml
    #[arg(short, long, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Profile file path (overrides --profile)
    #[arg(short, long, env = "RIGUP_PROFILE")]
    pub config: Option<PathBuf>,

    /// Only resources matching a kind or kind.key (e.g. "package", "symlink.zshrc")
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Preview changes only (same as `rigup diff`)
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not update the profile checkout before running
    #[arg(long)]
    pub no_self_update: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_install_flags() {
        let cli = Cli::try_parse_from([
            "rigup",
            "-vv",
            "install",
            "--profile",
            "laptop",
            "--target",
            "package",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Install(args) => {
                assert_eq!(args.profile.profile, "laptop");
                assert_eq!(args.profile.target.as_deref(), Some("package"));
                assert!(args.json);
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_default_profile() {
        let cli = Cli::try_parse_from(["rigup", "diff"]).unwrap();
        match cli.command {
            Command::Diff(args) => assert_eq!(args.profile.profile, DEFAULT_PROFILE),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_no_arguments_is_an_error() {
        assert!(Cli::try_parse_from(["rigup"]).is_err());
        assert!(Cli::try_parse_from(["rigup", "frobnicate"]).is_err());
    }
}
