//! # dkt — docket CLI
//!
//! Runs compose commands against the environment docket would build for a
//! mode, with the same files and source mounts.

mod cli;
mod passthrough;

use clap::Parser;
use docket_common::constants::INTERNAL_ERROR_EXIT_CODE;
use docket_common::error::DocketError;

use crate::cli::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match passthrough::execute(cli) {
        Ok(code) => code,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("ERROR: {e:#}");
            }
            e.downcast_ref::<DocketError>()
                .map_or(INTERNAL_ERROR_EXIT_CODE, DocketError::exit_code)
        }
    };
    std::process::exit(code);
}
