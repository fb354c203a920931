//! Build command: walk the registry and write the catalog

use std::path::{Path, PathBuf};
use std::time::Duration;

use console::style;

use crate::cancel::{Cancellation, install_signal_handler};
use crate::catalog::write_catalog;
use crate::cli::Cli;
use crate::error::{IndexError, Result};
use crate::fetcher::Fetcher;
use crate::manifest::ManifestValidator;
use crate::registry::Walker;

fn absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Run the build command
pub fn run(cli: &Cli) -> Result<()> {
    let current_dir = std::env::current_dir().map_err(|e| IndexError::IoError {
        message: format!("Failed to get current directory: {e}"),
    })?;

    let registry = absolute(&cli.registry, &current_dir);
    let output = absolute(&cli.output, &current_dir);
    let working_dir = cli
        .working_dir
        .as_deref()
        .map_or_else(|| current_dir.clone(), |dir| absolute(dir, &current_dir));
    let cancel = cli
        .timeout
        .map_or_else(Cancellation::new, |secs| {
            Cancellation::with_timeout(Duration::from_secs(secs))
        });
    install_signal_handler(&cancel);

    tracing::debug!(
        registry = %registry.display(),
        output = %output.display(),
        working_dir = %working_dir.display(),
        "starting build"
    );

    let fetcher = Fetcher::with_default_protocols();
    let validator = ManifestValidator::new();
    let catalog = Walker::new(&fetcher, &validator, working_dir)
        .with_cancellation(cancel)
        .build_catalog(&registry)?;

    write_catalog(&catalog, &output)?;

    eprintln!(
        "{} {} plugin(s) to {}",
        style("Wrote").green().bold(),
        catalog.len(),
        output.display()
    );
    Ok(())
}
