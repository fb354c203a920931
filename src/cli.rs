//! CLI definitions using clap derive API

use clap::Parser;
use clap::builder::{Styles, styling::AnsiColor};
use std::path::PathBuf;

use crate::catalog::DEFAULT_CATALOG_PATH;

/// plugin-index - build the plugin catalog
///
/// Reads every pointer file in the registry directory, fetches each plugin's
/// manifest from its source, validates it and writes the combined catalog.
#[derive(Parser, Debug)]
#[command(
    name = "plugin-index",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Build the plugin catalog from the plugin registry",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  plugin-index                              \x1b[90m# Write site/data/index.yaml\x1b[0m\n   \
                  plugin-index /tmp/index.yaml              \x1b[90m# Write to a custom path\x1b[0m\n   \
                  plugin-index --registry ./plugins -v      \x1b[90m# Custom registry, debug logs\x1b[0m\n   \
                  plugin-index --timeout 600                \x1b[90m# Abort fetches after 10 minutes\x1b[0m\n\n\
                  \x1b[1m\x1b[32mSupported repository locators:\x1b[0m\n   \
                  https://github.com/owner/repo.git, git@github.com:owner/repo.git,\n   \
                  github.com/owner/repo, https://host/plugin.tar.gz, ./local/path,\n   \
                  optionally with //subdir and ?ref=<tag> suffixes"
)]
pub struct Cli {
    /// Catalog file to write
    #[arg(value_name = "OUTPUT", default_value = DEFAULT_CATALOG_PATH)]
    pub output: PathBuf,

    /// Registry directory containing plugin pointer files
    #[arg(long, short = 'r', env = "PLUGIN_INDEX_REGISTRY", default_value = "plugins")]
    pub registry: PathBuf,

    /// Directory relative local repository paths are resolved against
    /// (defaults to current directory)
    #[arg(long, env = "PLUGIN_INDEX_WORKING_DIR")]
    pub working_dir: Option<PathBuf>,

    /// Abort the run after this many seconds
    #[arg(long, env = "PLUGIN_INDEX_TIMEOUT", value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Enable verbose output
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
