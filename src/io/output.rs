use crate::config::OutputFormat;
use crate::diagnostics::Diagnostic;
use crate::errors::Result;
use crate::rules::RuleTable;
use crate::runner::RunReport;
use colored::*;
use std::io::Write;

pub trait OutputWriter {
    fn write_report(&mut self, report: &RunReport) -> Result<()>;
    fn write_rules(&mut self, rules: &RuleTable) -> Result<()>;
}

pub fn create_writer<'w>(format: OutputFormat, writer: Box<dyn Write + 'w>) -> Box<dyn OutputWriter + 'w> {
    match format {
        OutputFormat::Terminal => Box::new(TerminalWriter::new(writer)),
        OutputFormat::Json => Box::new(JsonWriter::new(writer)),
    }
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_report(&mut self, report: &RunReport) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, report)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_rules(&mut self, rules: &RuleTable) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, rules)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

pub struct TerminalWriter<W: Write> {
    writer: W,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_header(&mut self, title: &str) -> Result<()> {
        writeln!(self.writer, "{}", title.bold().blue())?;
        writeln!(self.writer, "{}", "=".repeat(title.len()).blue())?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_diagnostic(&mut self, diagnostic: &Diagnostic) -> Result<()> {
        let text = diagnostic.to_string();
        let styled = if diagnostic.kind.needs_attention() {
            text.red()
        } else {
            text.yellow()
        };
        writeln!(self.writer, "    {}", styled)?;
        Ok(())
    }
}

impl<W: Write> OutputWriter for TerminalWriter<W> {
    fn write_report(&mut self, report: &RunReport) -> Result<()> {
        self.write_header("CWE-338 Remediation Report")?;

        let verb = if report.check { "Would change" } else { "Changed" };
        for file in &report.files {
            if !file.changed && file.diagnostics.is_empty() {
                continue;
            }
            let marker = if file.changed { "~".green() } else { "!".red() };
            writeln!(self.writer, "{} {}", marker, file.path.display())?;
            for rewrite in &file.rewrites {
                writeln!(
                    self.writer,
                    "    {}: {} call(s) rewritten",
                    rewrite.type_name.bold(),
                    rewrite.calls
                )?;
            }
            if !file.imports_added.is_empty() {
                writeln!(
                    self.writer,
                    "    imports added: {}",
                    file.imports_added.join(", ").dimmed()
                )?;
            }
            for diagnostic in &file.diagnostics {
                self.write_diagnostic(diagnostic)?;
            }
        }

        let summary = &report.summary;
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", "Summary:".bold())?;
        writeln!(self.writer, "  Files scanned: {}", summary.files_scanned)?;
        writeln!(self.writer, "  {}: {} file(s)", verb, summary.files_changed)?;
        writeln!(self.writer, "  Calls rewritten: {}", summary.calls_rewritten)?;
        writeln!(self.writer, "  Members added: {}", summary.members_added)?;
        writeln!(self.writer, "  Diagnostics: {}", summary.diagnostics)?;
        writeln!(self.writer)?;

        if report.needs_attention() {
            writeln!(
                self.writer,
                "{}",
                "✗ Some call sites need manual attention".red().bold()
            )?;
        } else if summary.files_changed == 0 {
            writeln!(self.writer, "{}", "✓ No insecure random usage found".green())?;
        } else {
            writeln!(self.writer, "{}", "✓ All matched call sites remediated".green())?;
        }
        Ok(())
    }

    fn write_rules(&mut self, rules: &RuleTable) -> Result<()> {
        self.write_header("Rules")?;
        for rule in rules.rules() {
            writeln!(self.writer, "{} [{}]", rule.id.bold(), rule.cwe.yellow())?;
            writeln!(self.writer, "  {}", rule.description)?;
            writeln!(self.writer, "  owners:")?;
            for owner in &rule.owners {
                writeln!(self.writer, "    {}", owner)?;
            }
            writeln!(self.writer, "  signatures:")?;
            for signature in &rule.signatures {
                writeln!(
                    self.writer,
                    "    {} -> {}()",
                    signature.describe(),
                    signature.helper.green()
                )?;
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }
}
