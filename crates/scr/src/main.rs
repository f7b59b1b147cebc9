//! Service Component Runtime - Entry Point
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scr validate <FILES>` | Parse descriptor files and report problems |
//! | `scr run <FILES>` | Boot a runtime, load the descriptors, print the component table |

use clap::Parser;
use scr::cli::{Cli, execute};
use scr_infrastructure::config::ConfigLoader;
use scr_infrastructure::logging::init_logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    let config = match loader.load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("scr: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(&config.logging) {
        eprintln!("scr: {err}");
    }

    let mut stdout = std::io::stdout().lock();
    match execute(&cli.command, config, &mut stdout) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("scr: {err}");
            ExitCode::FAILURE
        }
    }
}
