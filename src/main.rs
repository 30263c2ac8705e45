#![forbid(unsafe_code)]

//! sgq: Sensor Gateway Query CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("sgq: {e}");
        std::process::exit(e.exit_code());
    }
}
