mod app;
mod cli;
mod config;
mod font;
mod gpu;
mod logging;
mod plugins;
mod widgets;

use std::process::ExitCode;

use cli::Command;
use config::{Config, ConfigError, error_chain};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match cli::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("tessera: {e}\n\n{}", cli::USAGE);
            return ExitCode::from(2);
        }
    };

    match command {
        Command::Help => {
            println!("tessera {}", env!("CARGO_PKG_VERSION"));
            println!("A GPU terminal host with widget plugins\n");
            println!("{}", cli::USAGE);
            ExitCode::SUCCESS
        }
        Command::Version => {
            println!("tessera {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Command::PrintConfig => print_config(),
        Command::Run { shell } => {
            let config = Config::load();
            logging::init(&config.log.level);
            log::info!("tessera {} starting", env!("CARGO_PKG_VERSION"));
            match app::App::run(config, shell) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    log::error!("{e}: {}", error_chain(&e));
                    eprintln!("tessera: {e}");
                    let chain = error_chain(&e);
                    if !chain.is_empty() {
                        eprintln!("  caused by: {chain}");
                    }
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Dump the effective configuration. Unlike startup, a broken config file
/// is reported instead of silently replaced by defaults.
fn print_config() -> ExitCode {
    let config = match Config::try_load() {
        Ok(config) => config,
        Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Config::default()
        }
        Err(e) => {
            eprintln!("tessera: {e}");
            let chain = error_chain(&e);
            if !chain.is_empty() {
                eprintln!("  caused by: {chain}");
            }
            return ExitCode::FAILURE;
        }
    };
    match config.to_toml() {
        Ok(s) => {
            print!("{s}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("tessera: {e}");
            ExitCode::FAILURE
        }
    }
}
