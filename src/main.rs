#[cfg(not(unix))]
compile_error!("rigup supports Linux and macOS only");

mod checks;
mod cli;
mod commands;
mod config;
mod engine;
mod fetch;
mod paths;
mod privilege;
mod progress;
mod resource;
mod runner;
mod schema;
mod selfupdate;
mod sudo;
mod ui;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = match parse_cli(std::env::args_os()) {
        Ok(cli) => cli,
        Err(code) => return ExitCode::from(code),
    };

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    ExitCode::from(run(cli, privilege::effective_uid()))
}

/// Parse arguments; help and version exit 0, anything else unusable exits 1
fn parse_cli<I, T>(args: I) -> Result<Cli, u8>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| {
        let _ = e.print();
        match e.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
            _ => 1,
        }
    })
}

/// Run a parsed command and return the process exit code
fn run(cli: Cli, euid: u32) -> u8 {
    if let Err(e) = privilege::ensure_not_root(euid) {
        ui::error(&format!("{e:#}"));
        return 1;
    }

    let ctx = Context { quiet: cli.quiet };

    let result = match cli.command {
        Command::Install(args) => commands::install::run(&ctx, args),
        Command::Diff(args) => commands::diff::run(&ctx, &args.profile).map(|()| true),
        Command::Platform => commands::platform::run().map(|()| true),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "rigup", &mut io::stdout());
            Ok(true)
        }
    };

    match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_no_arguments_exit_1() {
        assert_eq!(parse_cli(["rigup"]).err(), Some(1));
        assert_eq!(parse_cli(["rigup", "bogus"]).err(), Some(1));
    }

    #[test]
    fn test_help_and_version_exit_0() {
        assert_eq!(parse_cli(["rigup", "--help"]).err(), Some(0));
        assert_eq!(parse_cli(["rigup", "--version"]).err(), Some(0));
    }

    #[test]
    fn test_root_guard_evaluates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let profile = dir.path().join("p.toml");
        fs::write(
            &profile,
            format!(
                "[[resource]]\nkind = \"line-in-file\"\npath = \"{}\"\nline = \"x\"\n",
                marker.display()
            ),
        )
        .unwrap();
        let cli = parse_cli([
            "rigup",
            "install",
            "--no-self-update",
            "--config",
            profile.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(run(cli, 0), 1);
        assert!(!marker.exists());
    }
}
