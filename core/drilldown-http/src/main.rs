//! FILENAME: core/drilldown-http/src/main.rs

use std::process::ExitCode;

use clap::Parser;
use drilldown_http::{run, Args};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.server_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("drilldown-server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("drilldown-server: {}", e);
            ExitCode::FAILURE
        }
    }
}
