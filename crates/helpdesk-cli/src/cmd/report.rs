//! `hd report`: the three summary tables without building a workbook.

use super::WindowArgs;
use crate::output::{OutputMode, pretty_rule, pretty_section, render_mode};
use clap::Args;
use helpdesk_core::report::ReportRow;
use helpdesk_core::{HelpdeskService, ReportSet, TicketStore};
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub window: WindowArgs,
}

pub fn run_report<S: TicketStore>(
    args: &ReportArgs,
    service: &HelpdeskService<S>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let reports = service.reports(&args.window.to_range())?;
    render_mode(output, &reports, render_text, render_pretty)
}

const STATUS_COLUMNS: [&str; 4] = ["in_progress", "resolved", "blank", "total"];
const PRIORITY_COLUMNS: [&str; 5] = ["high", "medium", "low", "blank", "total"];

fn text_table<R: ReportRow>(
    w: &mut dyn Write,
    table: &str,
    columns: &[&str],
    rows: &[R],
) -> io::Result<()> {
    writeln!(w, "table\tname\t{}", columns.join("\t"))?;
    for row in rows {
        let counts: Vec<String> = row
            .buckets()
            .iter()
            .chain(std::iter::once(&row.total()))
            .map(u64::to_string)
            .collect();
        writeln!(w, "{table}\t{}\t{}", row.name(), counts.join("\t"))?;
    }
    Ok(())
}

fn render_text(reports: &ReportSet, w: &mut dyn Write) -> io::Result<()> {
    text_table(w, "category", &STATUS_COLUMNS, &reports.categories)?;
    text_table(w, "supporter", &STATUS_COLUMNS, &reports.supporters)?;
    text_table(w, "priority", &PRIORITY_COLUMNS, &reports.priorities)
}

fn pretty_table<R: ReportRow>(
    w: &mut dyn Write,
    heading: &str,
    columns: &[&str],
    rows: &[R],
) -> io::Result<()> {
    pretty_section(w, heading)?;
    write!(w, "{:<32}", "")?;
    for column in columns {
        write!(w, "{column:>12}")?;
    }
    writeln!(w)?;
    for row in rows {
        write!(w, "{:<32}", row.name())?;
        for count in row.buckets() {
            write!(w, "{count:>12}")?;
        }
        writeln!(w, "{:>12}", row.total())?;
    }
    if rows.is_empty() {
        writeln!(w, "(no tickets)")?;
    }
    pretty_rule(w)?;
    writeln!(w)
}

fn render_pretty(reports: &ReportSet, w: &mut dyn Write) -> io::Result<()> {
    let status = ["In Progress", "Resolved", "Blank", "Grand Total"];
    pretty_table(w, "Tickets by category", &status, &reports.categories)?;
    pretty_table(w, "Tickets by IT supporter", &status, &reports.supporters)?;
    pretty_table(
        w,
        "Priority by category",
        &["High", "Medium", "Low", "Blank", "Grand Total"],
        &reports.priorities,
    )
}
