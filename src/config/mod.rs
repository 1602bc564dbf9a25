//! `.cwefix.toml` configuration.
//!
//! Every section is optional; missing keys fall back to their defaults so a
//! partial file is always valid.

mod loader;

pub use loader::{
    directory_ancestors, load_config, load_config_from, parse_config, CONFIG_FILE_NAME,
};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CwefixConfig {
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub parallel: ParallelConfig,
}

/// Which rules are active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rule ids to switch off.
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Extra rule files; a rule with a built-in id replaces the built-in one.
    #[serde(default)]
    pub rule_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Glob patterns for paths to leave alone.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Glob patterns over host type names. Empty means every type.
    #[serde(default)]
    pub applicable_types: Vec<String>,
    /// Source roots whose top-level types count as known.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
}

impl ScanConfig {
    pub fn type_filter(&self) -> crate::errors::Result<Vec<glob::Pattern>> {
        self.applicable_types
            .iter()
            .map(|p| glob::Pattern::new(p).map_err(crate::errors::Error::from))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Worker threads; 0 uses every core.
    #[serde(default)]
    pub jobs: usize,
}

/// Contents written by `cwefix init`.
pub const DEFAULT_CONFIG: &str = r#"# cwefix configuration

[rules]
# Rule ids to switch off, see `cwefix rules`.
disabled = []
# Extra rule tables in the built-in format.
rule_files = []

[scan]
ignore = [
    "target/**",
    "build/**",
    "**/generated/**",
]
# Only rewrite types whose simple name matches one of these globs.
applicable_types = []
# Source roots used to resolve types that are not imported explicitly.
classpath = []

[output]
format = "terminal"

[parallel]
jobs = 0
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse_config(indoc! {r#"
            [rules]
            disabled = ["commons-lang-random-utils"]
        "#})
        .unwrap();
        assert_eq!(config.rules.disabled, vec!["commons-lang-random-utils"]);
        assert!(config.scan.ignore.is_empty());
        assert_eq!(config.output.format, OutputFormat::Terminal);
        assert_eq!(config.parallel.jobs, 0);
    }

    #[test]
    fn test_default_config_parses() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.scan.ignore.len(), 3);
        assert!(config.rules.rule_files.is_empty());
    }

    #[test]
    fn test_type_filter_rejects_bad_glob() {
        let scan = ScanConfig {
            applicable_types: vec!["Random[".into()],
            ..Default::default()
        };
        assert!(scan.type_filter().is_err());

        let scan = ScanConfig {
            applicable_types: vec!["Random*".into()],
            ..Default::default()
        };
        let filter = scan.type_filter().unwrap();
        assert!(filter[0].matches("RandomUtil"));
    }
}
