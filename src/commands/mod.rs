//! CLI command implementations.
//!
//! - **fix**: rewrite insecure random calls under the given paths
//! - **rules**: list the loaded rule table
//! - **init**: write a default `.cwefix.toml`

pub mod fix;
pub mod init;
pub mod rules;

pub use fix::{handle_fix, FixConfig};
pub use init::init_config;
pub use rules::list_rules;

use crate::config::{load_config, load_config_from, CwefixConfig};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// The explicit config file, or the nearest `.cwefix.toml`.
fn resolve_config(explicit: Option<&Path>) -> Result<CwefixConfig> {
    match explicit {
        Some(path) => load_config_from(path)
            .with_context(|| format!("Loading configuration from {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Reading current directory")?;
            Ok(load_config(&cwd))
        }
    }
}

/// Report destination: the `--output` file or stdout.
fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) => {
            // No escape codes in files.
            colored::control::set_override(false);
            let file = std::fs::File::create(path)
                .with_context(|| format!("Creating output file {}", path.display()))?;
            Ok(Box::new(std::io::BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}
