//!
//! # GDSII Read, Write & Flatten CLI
//!
//! Reads a GDSII library, writes it back out,
//! and optionally writes the flattened hierarchy beneath a root cell.
//!

use std::{process, str::FromStr};

use clap::Parser;
use log::{error, LevelFilter};

use gdsdbtools::{run, ProgramOptions};

fn main() {
    let options = ProgramOptions::parse();

    // Initialize the logger with the specified log level
    let log_level = LevelFilter::from_str(&options.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            options.log_level
        );
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    if let Err(err) = run(&options) {
        error!("{}", err);
        eprintln!("gdsrw: {}", err);
        process::exit(1);
    }
}
