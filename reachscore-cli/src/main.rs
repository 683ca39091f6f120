//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use std::error::Error;

fn main() {
    env_logger::init();
    if let Err(err) = reachscore_cli::run() {
        eprintln!("reachscore: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}
