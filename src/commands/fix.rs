use super::{open_output, resolve_config};
use crate::cli::configure_thread_pool;
use crate::config::OutputFormat;
use crate::io::{create_writer, find_java_files};
use crate::observability::{set_phase_persistent, FixPhase};
use crate::orchestrator::Transformer;
use crate::progress::{ProgressConfig, ProgressManager};
use crate::resolve::TypeIndex;
use crate::rules::load_rule_table;
use crate::runner::{RunReport, Runner};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Resolved `cwefix fix` arguments.
#[derive(Debug, Clone, Default)]
pub struct FixConfig {
    pub paths: Vec<PathBuf>,
    pub classpath: Vec<PathBuf>,
    pub check: bool,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub rules: Option<Vec<String>>,
    pub quiet: bool,
}

pub fn handle_fix(config: FixConfig) -> Result<RunReport> {
    let file_config = resolve_config(config.config.as_deref())?;
    configure_thread_pool(config.jobs.unwrap_or(file_config.parallel.jobs));

    let mut table = load_rule_table(&file_config.rules).context("Loading rules")?;
    if let Some(ids) = &config.rules {
        table = table.select(ids)?;
    }
    let type_filter = file_config
        .scan
        .type_filter()
        .context("Invalid applicable_types pattern")?;
    let progress = ProgressManager::new(ProgressConfig::from_env(config.quiet));

    set_phase_persistent(FixPhase::Discovery);
    let files = find_java_files(&config.paths, &file_config.scan.ignore)?;
    info!(files = files.len(), "Discovered Java sources");

    let classpath: Vec<PathBuf> = config
        .classpath
        .iter()
        .chain(file_config.scan.classpath.iter())
        .cloned()
        .collect();
    let index = if classpath.is_empty() {
        None
    } else {
        set_phase_persistent(FixPhase::Indexing);
        let spinner = progress.create_spinner("Indexing classpath");
        let index = TypeIndex::from_classpath(&classpath)?;
        spinner.finish_and_clear();
        Some(Arc::new(index))
    };

    let transformer = Transformer::new(Arc::new(table))
        .with_type_filter(type_filter)
        .with_type_index(index);
    let report = Runner::new(transformer)
        .check_only(config.check)
        .with_progress(progress.clone())
        .run(&files);
    progress.clear().ok();

    set_phase_persistent(FixPhase::Reporting);
    let format = config.format.unwrap_or(file_config.output.format);
    let mut writer = create_writer(format, open_output(config.output.as_deref())?);
    writer.write_report(&report)?;

    Ok(report)
}
