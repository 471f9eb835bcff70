#![forbid(unsafe_code)]

//! sav: Signal Analyzer Viz CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("sav: {e}");
        std::process::exit(e.exit_code());
    }
}
