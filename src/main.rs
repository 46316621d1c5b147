use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use ecourts::{
    cli::{self, Cli},
    info_time, logging,
};

#[tokio::main]
async fn main() -> ExitCode {
    let start_time = Local::now();
    let args = Cli::parse();

    let config = match args.app_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match logging::init(config.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = cli::run(args, config).await;
    info_time!(start_time, "Full program time");

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
