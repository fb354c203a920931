//! plugin-index - plugin catalog builder
//!
//! Walks a registry directory of pointer files, fetches each plugin's source
//! from wherever the pointer says it lives (git, HTTP archive, local path),
//! validates the `plugin.yaml` manifest found there, and writes the combined
//! catalog consumed by the documentation site.

use std::error::Error;

use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

mod cancel;
mod catalog;
mod cli;
mod commands;
mod error;
mod fetcher;
mod fs;
mod git;
mod manifest;
mod progress;
mod registry;
mod workspace;

use cli::Cli;
use error::IndexError;

/// Initialize logging. `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("plugin_index={level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the error followed by each underlying cause
fn report(err: &IndexError) {
    eprintln!("{} {err}", style("Error:").red().bold());
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  {} {cause}", style("caused by:").dim());
        source = cause.source();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = commands::build::run(&cli) {
        report(&e);
        std::process::exit(1);
    }
}
