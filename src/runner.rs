//! Runs the transformer over many files in parallel.
//!
//! Each file is read, transformed and written back on its own rayon task.
//! A file is written only once its transformation is complete, through a
//! staged rename, so no half-rewritten source is ever on disk.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::errors::Error;
use crate::io;
use crate::observability::{
    increment_processed, set_current_file, set_phase, set_progress, FixPhase,
};
use crate::orchestrator::{TransformState, Transformer, TypeRewrites};
use crate::progress::{ProgressManager, TEMPLATE_FILES};
use crate::syntax::parse;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, debug_span, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub state: TransformState,
    /// The transformation changed the source.
    pub changed: bool,
    /// The new source was written to disk.
    pub written: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rewrites: Vec<TypeRewrites>,
    pub members_added: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports_added: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl FileReport {
    /// A file that could not be transformed at all.
    fn failed(path: &Path, diagnostic: Diagnostic) -> Self {
        Self {
            path: path.to_path_buf(),
            state: TransformState::Skipped,
            changed: false,
            written: false,
            rewrites: Vec::new(),
            members_added: 0,
            imports_added: Vec::new(),
            diagnostics: vec![diagnostic.at_path(Some(path))],
        }
    }

    pub fn calls_rewritten(&self) -> usize {
        self.rewrites.iter().map(|r| r.calls).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub calls_rewritten: usize,
    pub members_added: usize,
    pub diagnostics: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Files were left untouched on disk.
    pub check: bool,
    pub summary: RunSummary,
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn new(check: bool, files: Vec<FileReport>) -> Self {
        let summary = RunSummary {
            files_scanned: files.len(),
            files_changed: files.iter().filter(|f| f.changed).count(),
            calls_rewritten: files.iter().map(FileReport::calls_rewritten).sum(),
            members_added: files.iter().map(|f| f.members_added).sum(),
            diagnostics: files.iter().map(|f| f.diagnostics.len()).sum(),
        };
        Self {
            check,
            summary,
            files,
        }
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| f.diagnostics.iter())
    }

    /// Any diagnostic that calls for manual follow-up.
    pub fn needs_attention(&self) -> bool {
        self.diagnostics().any(|d| d.kind.needs_attention())
    }

    pub fn changed_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.changed)
    }
}

pub struct Runner {
    transformer: Transformer,
    check: bool,
    progress: Option<ProgressManager>,
}

impl Runner {
    pub fn new(transformer: Transformer) -> Self {
        Self {
            transformer,
            check: false,
            progress: None,
        }
    }

    /// Report what would change without writing anything.
    pub fn check_only(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Fix every file. Failures are reported per file and never stop the
    /// run; files that transformed cleanly are still written.
    pub fn run(&self, files: &[PathBuf]) -> RunReport {
        set_progress(0, files.len());
        let bar = match &self.progress {
            Some(progress) => progress.create_bar(files.len() as u64, TEMPLATE_FILES),
            None => indicatif::ProgressBar::hidden(),
        };
        bar.set_message(if self.check { "Checking" } else { "Fixing" });

        let reports: Vec<FileReport> = files
            .par_iter()
            .progress_with(bar.clone())
            .map(|path| {
                let report = self.fix_file(path);
                increment_processed();
                report
            })
            .collect();
        bar.finish_and_clear();

        let report = RunReport::new(self.check, reports);
        info!(
            files = report.summary.files_scanned,
            changed = report.summary.files_changed,
            calls = report.summary.calls_rewritten,
            diagnostics = report.summary.diagnostics,
            "Run complete"
        );
        report
    }

    /// Transform one file and, unless checking, write it back if it changed.
    pub fn fix_file(&self, path: &Path) -> FileReport {
        let span = debug_span!("fix_file", path = %path.display());
        let _enter = span.enter();
        let _file = set_current_file(path);

        let source = match io::read_file(path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Skipping unreadable file: {}", error_chain(&e));
                return FileReport::failed(
                    path,
                    Diagnostic::new(DiagnosticKind::Unreadable, error_chain(&e)),
                );
            }
        };

        let unit = {
            let _phase = set_phase(FixPhase::Parsing);
            match parse(&source) {
                Ok(unit) => unit,
                Err(Error::Syntax {
                    line,
                    column,
                    message,
                }) => {
                    warn!(line, column, "Skipping unparsable file: {}", message);
                    let diagnostic = Diagnostic::new(
                        DiagnosticKind::SyntaxError,
                        format!("{}:{}: {}", line, column, message),
                    )
                    .at_line(line);
                    return FileReport::failed(path, diagnostic);
                }
                Err(e) => {
                    warn!("Skipping file the parser rejected: {}", e);
                    return FileReport::failed(
                        path,
                        Diagnostic::new(DiagnosticKind::SyntaxError, e.to_string()),
                    );
                }
            }
        };

        let outcome = match self.transformer.transform(&unit) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Transformation failed, file left alone: {}", e);
                return FileReport::failed(
                    path,
                    Diagnostic::new(DiagnosticKind::TemplateError, e.to_string()),
                );
            }
        };

        let mut diagnostics = outcome.diagnostics;
        let mut written = false;
        if outcome.changed && !self.check {
            let _phase = set_phase(FixPhase::Writing);
            match io::write_file_atomic(path, &outcome.unit.print()) {
                Ok(()) => {
                    written = true;
                    debug!("Wrote rewritten unit");
                }
                Err(e) => {
                    warn!("Could not write rewritten unit: {}", error_chain(&e));
                    diagnostics.push(Diagnostic::new(DiagnosticKind::WriteFailed, error_chain(&e)));
                }
            }
        }

        FileReport {
            path: path.to_path_buf(),
            state: outcome.state,
            changed: outcome.changed,
            written,
            rewrites: outcome.rewrites,
            members_added: outcome.members_added,
            imports_added: outcome.imports_added,
            diagnostics: diagnostics
                .into_iter()
                .map(|d| d.at_path(Some(path)))
                .collect(),
        }
    }
}

/// An error and its sources on one line.
fn error_chain(error: &Error) -> String {
    let mut text = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
