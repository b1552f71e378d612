//! Command-line flags.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    PrintConfig,
    /// Open the window. `shell` overrides the configured shell.
    Run { shell: Option<String> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("`-e` needs a command")]
    MissingCommand,
    #[error("unknown option `{0}`")]
    UnknownOption(String),
}

pub const USAGE: &str = "\
USAGE:
    tessera [OPTIONS]

OPTIONS:
    -e <command>...   Run <command> instead of the configured shell
    --print-config    Print the effective configuration as TOML
    --version, -V     Print version information
    --help, -h        Print this help message";

/// Parse arguments, excluding the program name. Everything after `-e` is
/// the command line.
pub fn parse(args: &[String]) -> Result<Command, CliError> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(Command::Run { shell: None });
    };
    match first.as_str() {
        "--help" | "-h" => Ok(Command::Help),
        "--version" | "-V" => Ok(Command::Version),
        "--print-config" => Ok(Command::PrintConfig),
        "-e" if rest.is_empty() => Err(CliError::MissingCommand),
        "-e" => Ok(Command::Run {
            shell: Some(rest.join(" ")),
        }),
        other => Err(CliError::UnknownOption(other.to_owned())),
    }
}

#[cfg(test)]
mod tests;
