/// Output formatting: JSON, table, id modes. TTY detection.
use std::io::{self, IsTerminal, Write};

use colored::Colorize;
use comfy_table::{Cell, Color, ColumnConstraint, Table, Width, presets::NOTHING};
use serde::Serialize;
use tracing::debug;

use super::args::OutputFormat;
use crate::audit::LookupFailure;
use crate::audit::correlate::or_sentinel;
use crate::aws::CloudError;
use crate::types::{CleanupOutput, ErrorOutput, ReportOutput, RowOutput};

const ERASE_LINE: &str = "\x1b[2K";

/// Report columns and their minimum widths.
const COLUMNS: [(&str, u16); 6] = [
    ("Account Number", 15),
    ("SC Product Name", 52),
    ("CFN Stack Name", 35),
    ("SC Status", 10),
    ("CFN Stack Status", 18),
    ("AccountEmail", 20),
];

/// Resolve the effective output format, handling `--json` flag and TTY auto-detection.
#[must_use]
pub fn resolve_format(fmt: OutputFormat, json_flag: bool) -> OutputFormat {
    if json_flag {
        return OutputFormat::Json;
    }
    if fmt == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        fmt
    }
}

/// Output context passed to all formatters.
pub struct OutputCtx {
    pub format: OutputFormat,
    pub no_header: bool,
    /// Colorize highlighted rows.
    pub styled: bool,
    /// Redraw the progress line on stderr.
    pub progress: bool,
}

impl OutputCtx {
    /// Construct from CLI args.
    #[must_use]
    pub fn new(fmt: OutputFormat, json_flag: bool, no_header: bool) -> Self {
        let format = resolve_format(fmt, json_flag);
        let no_color = std::env::var_os("NO_COLOR").is_some();
        Self {
            format,
            no_header,
            styled: std::io::stdout().is_terminal() && !no_color,
            progress: std::io::stderr().is_terminal(),
        }
    }

    /// Start a named timer. Logs the elapsed time at debug level on drop.
    #[must_use]
    pub fn timer(&self, label: &'static str) -> DebugTimer {
        DebugTimer::new(label)
    }

    /// Redraw the "Checking i of n" line on stderr.
    pub fn show_progress(&self, index: usize, total: usize) {
        if !self.progress {
            return;
        }
        let line = format!("Checking {index} of {total} products").red();
        eprint!("{ERASE_LINE} {line}\r");
        let _ = std::io::stderr().flush();
    }

    /// Erase the progress line once the loop is done.
    pub fn clear_progress(&self) {
        if self.progress {
            eprint!("{ERASE_LINE}\r");
        }
    }
}

// --- Report ---

/// Write the full report (rows, then cleanup) to stdout.
pub fn write_report(report: &ReportOutput, ctx: &OutputCtx) {
    match ctx.format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Compact => print_compact_json(report),
        OutputFormat::Ndjson => print_ndjson(&report.products),
        OutputFormat::Id => {
            for row in &report.products {
                println!("{}", row.product_id);
            }
        }
        OutputFormat::Table | OutputFormat::Auto => {
            println!();
            println!("{}", report_table(&report.products, ctx.no_header, ctx.styled));
            let _ = write_cleanup(&mut io::stdout().lock(), &report.cleanup, &report.profile);
        }
    }
}

/// Build the product table. Highlighted rows are drawn in red when `styled`.
#[must_use]
pub fn report_table(rows: &[RowOutput], no_header: bool, styled: bool) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    if styled {
        table.enforce_styling();
    } else {
        table.force_no_tty();
    }

    if !no_header {
        table.set_header(COLUMNS.map(|(name, _)| name));
        table.add_row(COLUMNS.map(|(name, _)| "-".repeat(name.len())));
    }

    for row in rows {
        let cells = [
            or_sentinel(row.account_id.as_ref()),
            row.product_name.as_str(),
            or_sentinel(row.stack_name.as_ref()),
            row.product_status.as_str(),
            or_sentinel(row.stack_status.as_ref()),
            or_sentinel(row.account_email.as_ref()),
        ]
        .map(|text| {
            let cell = Cell::new(text);
            if row.highlighted { cell.fg(Color::Red) } else { cell }
        });
        table.add_row(cells);
    }

    // Constraints only attach to columns that already exist.
    table.set_constraints(
        COLUMNS.map(|(_, width)| ColumnConstraint::LowerBoundary(Width::Fixed(width))),
    );
    table
}

/// Write the cleanup section: manual commands or deletion results.
fn write_cleanup(
    out: &mut impl Write,
    actions: &[CleanupOutput],
    profile: &str,
) -> io::Result<()> {
    if actions.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "You probably want to remove the following SC Products:")?;
    for action in actions {
        if let Some(command) = &action.command {
            writeln!(out, "{command}")?;
            continue;
        }
        writeln!(
            out,
            "Deleting Service Catalog Provisioned Product {} from {profile} profile",
            action.product_name
        )?;
        if let Some(status) = &action.record_status {
            writeln!(out, "  Result of deletion: {status}")?;
        }
        for e in &action.record_errors {
            writeln!(out, "  {} {}: {}", "Error".red(), e.code, e.description)?;
        }
        if let Some(err) = &action.error {
            writeln!(out, "  {}", err.red())?;
        }
    }
    Ok(())
}

// --- Console failure lines ---

/// Report a per-product failure, with profile context.
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn write_lookup_failure(
    out: &mut impl Write,
    failure: &LookupFailure,
    profile: &str,
) -> io::Result<()> {
    let line = match (&failure.error, &failure.stack_name) {
        (CloudError::Validation { .. }, Some(stack)) => format!(
            "Validation Failure in profile {profile} looking for stack {stack} with status of {}",
            failure.stack_status.as_deref().unwrap_or_default()
        ),
        (CloudError::Validation { .. }, None) => format!("{profile}: Validation Failure"),
        (CloudError::AuthFailure { .. }, _) => format!("{profile}: Authorization Failure"),
        (CloudError::AccessDenied { .. }, _) => format!("{profile}: Access Denied Failure"),
        (CloudError::Other { message }, _) => {
            format!("{profile}: Other kind of failure\n{message}")
        }
    };
    writeln!(out, "{}", line.red())
}

// --- Error output ---

/// Write a structured error to stderr.
pub fn write_error(err: &ErrorOutput, format: OutputFormat, json_flag: bool) {
    let fmt = resolve_format(format, json_flag);
    let mut out = io::stderr().lock();
    match fmt {
        OutputFormat::Json | OutputFormat::Compact | OutputFormat::Ndjson => {
            let s = serde_json::to_string_pretty(err).unwrap_or_default();
            let _ = writeln!(out, "{s}");
        }
        _ => {
            let _ = writeln!(out, "{} {}", "Error:".red().bold(), err.error.message);
        }
    }
}

// --- Debug timer ---

/// A RAII timer that logs elapsed milliseconds at debug level on drop.
///
/// Created via [`OutputCtx::timer`].
pub struct DebugTimer {
    label: &'static str,
    start: std::time::Instant,
}

impl DebugTimer {
    #[must_use]
    fn new(label: &'static str) -> Self {
        Self {
            label,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for DebugTimer {
    fn drop(&mut self) {
        let ms = self.start.elapsed().as_secs_f64() * 1000.0;
        debug!(label = self.label, "{ms:.2}ms");
    }
}

// --- Generic JSON helpers ---

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("JSON serialization error: {e}"),
    }
}

fn print_compact_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("JSON serialization error: {e}"),
    }
}

fn print_ndjson<T: Serialize>(values: &[T]) {
    for v in values {
        match serde_json::to_string(v) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("JSON serialization error: {e}"),
        }
    }
}
