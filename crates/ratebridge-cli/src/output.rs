//! Output formatting and writing utilities
//!
//! Results are written as JSON, YAML or a human-readable report. Values that
//! look like credentials are masked unless `--show-secrets` is given.

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::logging::redaction;
use colored::Colorize;
use ratebridge_core::{ExecutionResult, FieldStatus, MappingResult, StepStatus};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use tracing::trace;

/// Formatting for the result types the CLI prints
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format a pipeline run
    fn format_execution_result(&self, result: &ExecutionResult, show_steps: bool) -> Result<String>;

    /// Format a single mapping run
    fn format_mapping_result(&self, result: &MappingResult, show_fields: bool) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty | OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }

    fn format_execution_result(&self, result: &ExecutionResult, show_steps: bool) -> Result<String> {
        match self {
            OutputFormat::Human => format_execution_result_human(result, show_steps),
            _ => self.format(result),
        }
    }

    fn format_mapping_result(&self, result: &MappingResult, show_fields: bool) -> Result<String> {
        match self {
            OutputFormat::Human => format_mapping_result_human(result, show_fields),
            _ => self.format(result),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
    verbose: u8,
    redact: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer on stdout
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, verbose: u8, redact: bool) -> Self {
        Self::with_writer(format, use_color, quiet, verbose, redact, Box::new(io::stdout()))
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(
        format: OutputFormat,
        use_color: bool,
        quiet: bool,
        verbose: u8,
        redact: bool,
        writer: Box<dyn Write>,
    ) -> Self {
        Self {
            format,
            use_color,
            quiet,
            verbose,
            redact,
            writer,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }
        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write debug information if verbose mode is enabled
    pub fn debug(&mut self, message: &str) -> Result<()> {
        if self.verbose == 0 || !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&format!("{} {}", "DEBUG:".dimmed(), message.dimmed()))
        } else {
            self.writeln(&format!("DEBUG: {}", message))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let mut value = serde_json::to_value(value)?;
        if self.redact {
            redaction::redact_json_value(&mut value);
        }
        trace!("Outputting data: {}", value);

        let formatted = self.format.format(&value)?;
        self.emit(&formatted)
    }

    /// Write a pipeline run
    pub fn execution_result(&mut self, result: &ExecutionResult, show_steps: bool) -> Result<()> {
        let formatted = if self.redact {
            self.format.format_execution_result(&redact_execution(result), show_steps)?
        } else {
            self.format.format_execution_result(result, show_steps)?
        };
        self.emit(&formatted)
    }

    /// Write a single mapping run
    pub fn mapping_result(&mut self, result: &MappingResult, show_fields: bool) -> Result<()> {
        let formatted = if self.redact {
            self.format.format_mapping_result(&redact_mapping(result), show_fields)?
        } else {
            self.format.format_mapping_result(result, show_fields)?
        };
        self.emit(&formatted)
    }

    /// Write a table (human format only)
    pub fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }
        let rendered = render_table(headers, &rows);
        let mut lines = rendered.lines();
        if let Some(header) = lines.next() {
            if self.use_color {
                self.writeln(&header.bold().to_string())?;
            } else {
                self.writeln(header)?;
            }
        }
        for line in lines {
            self.writeln(line)?;
        }
        Ok(())
    }

    fn emit(&mut self, formatted: &str) -> Result<()> {
        if formatted.ends_with('\n') {
            self.write(formatted)
        } else {
            self.writeln(formatted)
        }
    }
}

fn redact_execution(result: &ExecutionResult) -> ExecutionResult {
    let mut redacted = result.clone();
    redaction::redact_json_value(&mut redacted.input);
    redaction::redact_json_value(&mut redacted.output);
    for step in &mut redacted.steps {
        redaction::redact_json_value(&mut step.details);
    }
    redacted
}

fn redact_mapping(result: &MappingResult) -> MappingResult {
    let mut redacted = result.clone();
    redaction::redact_json_value(&mut redacted.output);
    for field in &mut redacted.fields {
        let leaf = field.target_path.rsplit('.').next().unwrap_or(&field.target_path);
        if redaction::is_sensitive_key(leaf) {
            let mask = |v: &mut Option<Value>| {
                if v.is_some() {
                    *v = Some(Value::String("***".to_string()));
                }
            };
            mask(&mut field.source_value);
            mask(&mut field.output_value);
        }
    }
    redacted
}

/// Render rows as aligned columns with a header separator
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let render_row = |cells: Vec<String>| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match widths.get(i) {
                Some(width) => format!("{:width$}", cell, width = *width),
                None => cell.clone(),
            })
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&render_row(headers.iter().map(|h| h.to_string()).collect()));
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("─┼─"));
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row.clone()));
        out.push('\n');
    }
    out
}

fn status_mark(success: bool) -> String {
    if success {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

/// Human-readable report of a pipeline run
pub fn format_execution_result_human(result: &ExecutionResult, show_steps: bool) -> Result<String> {
    let mut out = String::new();

    out.push_str(&format!("{}\n", "═══ Pipeline Result ═══".bright_blue()));
    out.push_str(&format!("Pipeline: {}\n", result.pipeline_id));
    out.push_str(&format!(
        "Status: {} {}\n",
        status_mark(result.success),
        if result.success { "success" } else { "failed" }
    ));
    out.push_str(&format!("Duration: {}ms\n", result.duration_ms));
    out.push_str(&format!("Steps run: {}\n", result.steps.len()));

    if show_steps || !result.success {
        out.push_str("\nSteps:\n");
        for step in &result.steps {
            let ok = step.status == StepStatus::Success;
            let mut line = format!(
                "  {} [{}] {} ({}) {}ms",
                status_mark(ok),
                step.step_order,
                step.name,
                step.step_type,
                step.duration_ms
            );
            if let Some(error) = &step.error {
                line.push_str(&format!(": {}", error));
            }
            out.push_str(&line);
            out.push('\n');
        }
    }

    if let Some(error) = &result.error {
        let category = result
            .error_category
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default();
        out.push_str(&format!("\n{}{} {}\n", "Error".red().bold(), category, error));
    }

    out.push_str(&format!("\n{}\n", "Output:".bold()));
    out.push_str(&serde_json::to_string_pretty(&result.output)?);
    out.push('\n');
    Ok(out)
}

fn field_status_label(status: FieldStatus) -> &'static str {
    match status {
        FieldStatus::Success => "success",
        FieldStatus::Default => "default",
        FieldStatus::Skipped => "skipped",
        FieldStatus::Error => "error",
    }
}

/// Human-readable report of a single mapping run
pub fn format_mapping_result_human(result: &MappingResult, show_fields: bool) -> Result<String> {
    let mut out = String::new();

    out.push_str(&format!("{}\n", "═══ Mapping Result ═══".bright_blue()));
    out.push_str(&format!("Mapping: {}\n", result.mapping_id));
    out.push_str(&format!(
        "Fields: {} success, {} default, {} skipped, {} error\n",
        result.success_count, result.default_count, result.skipped_count, result.error_count
    ));
    out.push_str(&format!("Duration: {}ms\n", result.duration_ms));

    let failed: Vec<_> = result
        .fields
        .iter()
        .filter(|f| f.status == FieldStatus::Error)
        .collect();
    if show_fields {
        let rows = result
            .fields
            .iter()
            .map(|f| {
                vec![
                    f.source_path.clone(),
                    f.target_path.clone(),
                    f.transformation.clone(),
                    field_status_label(f.status).to_string(),
                    f.error.clone().unwrap_or_default(),
                ]
            })
            .collect::<Vec<_>>();
        out.push('\n');
        out.push_str(&render_table(&["Source", "Target", "Transformation", "Status", "Error"], &rows));
    } else if !failed.is_empty() {
        out.push_str("\nErrors:\n");
        for field in failed {
            out.push_str(&format!(
                "  {} {} → {}: {}\n",
                status_mark(false),
                field.source_path,
                field.target_path,
                field.error.as_deref().unwrap_or("failed")
            ));
        }
    }

    out.push_str(&format!("\n{}\n", "Output:".bold()));
    out.push_str(&serde_json::to_string_pretty(&result.output)?);
    out.push('\n');
    Ok(out)
}
