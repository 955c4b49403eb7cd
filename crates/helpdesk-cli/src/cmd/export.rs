//! `hd export`: write the two-sheet xlsx report to a file.

use super::FilterArgs;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use anyhow::Context;
use clap::Args;
use helpdesk_core::config::ExportConfig;
use helpdesk_core::export::ExportStats;
use helpdesk_core::{CancelToken, ExportQuery, HelpdeskService, TicketStore};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Destination file.
    #[arg(short, long, default_value = "help-desk-tickets.xlsx")]
    pub out: PathBuf,

    /// Rows per fetch (overrides config).
    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Writer threads (overrides config).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Cancel the export after this many seconds (overrides config).
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl ExportArgs {
    pub fn apply(&self, config: &mut ExportConfig) {
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = Some(timeout_secs);
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportReport {
    path: PathBuf,
    bytes: usize,
    content_type: &'static str,
    content_disposition: String,
    stats: ExportStats,
}

pub fn run_export<S: TicketStore>(
    args: &ExportArgs,
    service: &HelpdeskService<S>,
    cancel: &CancelToken,
    output: OutputMode,
) -> anyhow::Result<()> {
    let query = ExportQuery {
        filter: args.filter.to_filter(),
    };
    let file = service.export_tickets(&query, cancel, chrono::Utc::now())?;
    std::fs::write(&args.out, &file.bytes)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    let report = ExportReport {
        path: args.out.clone(),
        bytes: file.bytes.len(),
        content_type: file.content_type,
        content_disposition: file.content_disposition(),
        stats: file.stats,
    };
    render_mode(output, &report, render_text, render_pretty)
}

fn render_text(report: &ExportReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{} bytes\t{} rows\t{} batches",
        report.path.display(),
        report.bytes,
        report.stats.detail_rows,
        report.stats.batches
    )
}

fn render_pretty(report: &ExportReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Export written")?;
    pretty_kv(w, "File", report.path.display().to_string())?;
    pretty_kv(w, "Size", format!("{} bytes", report.bytes))?;
    pretty_kv(w, "Tickets", report.stats.detail_rows.to_string())?;
    pretty_kv(w, "Summary rows", report.stats.summary_rows.to_string())?;
    pretty_kv(
        w,
        "Batches",
        format!("{} ({} fetches)", report.stats.batches, report.stats.fetches),
    )
}
