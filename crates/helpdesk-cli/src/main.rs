#![forbid(unsafe_code)]

mod cmd;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use helpdesk_core::db::open_store;
use helpdesk_core::{CancelToken, ErrorKind, HelpdeskConfig, HelpdeskError, HelpdeskService};
use output::{CliError, OutputMode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "hd: help desk ticket listing, reports and spreadsheet export",
    long_about = None
)]
struct Cli {
    /// Ticket database (`SQLite` file exposing `v_helpdesk_report`).
    #[arg(long, global = true, env = "HELPDESK_DB")]
    db: Option<PathBuf>,

    /// Config file (default: .helpdesk/config.toml, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "List tickets, newest first",
        long_about = "List one page of tickets matching the filters. Pass the printed \
                      next page token back with --page-token to continue.",
        after_help = "EXAMPLES:\n    # First page of network tickets\n    hd list --category Network --page-size 50\n\n    # Continue from a previous page\n    hd list --category Network --page-size 50 --page-token <token>\n\n    # Every in-progress ticket as JSON\n    hd list --status \"IN PROGRESS\" --all --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        about = "Export tickets to an xlsx workbook",
        long_about = "Write a workbook with a detail sheet of every matching ticket and a \
                      summary sheet of category, supporter and priority tables.",
        after_help = "EXAMPLES:\n    # Export the first quarter\n    hd export --after 2024-01-01 --before 2024-03-31 --out q1.xlsx\n\n    # Export with more writer threads\n    hd export --workers 8 --out all.xlsx"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        about = "Print the summary reports",
        long_about = "Print the category, supporter and priority summaries for a creation window.",
        after_help = "EXAMPLES:\n    # Reports for March\n    hd report --after 2024-03-01 --before 2024-03-31\n\n    # Emit machine-readable output\n    hd report --json"
    )]
    Report(cmd::report::ReportArgs),
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Export(_) => "export",
            Self::Report(_) => "report",
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HELPDESK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "helpdesk=debug,info"
        } else {
            "helpdesk=info,warn"
        })
    });

    let format = env::var("HELPDESK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Process exit status for a failure.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<HelpdeskError>().map(HelpdeskError::kind) {
        Some(ErrorKind::InvalidCursor | ErrorKind::InvalidFilter) => 3,
        Some(ErrorKind::NotFound) => 4,
        Some(ErrorKind::QueryError) => 5,
        Some(ErrorKind::ExportError | ErrorKind::ConcurrencyError) => 6,
        Some(ErrorKind::Cancelled) => 7,
        None => 1,
    }
}

fn run(cli: &Cli, mut config: HelpdeskConfig, output: OutputMode) -> anyhow::Result<()> {
    if let Commands::Export(args) = &cli.command {
        args.apply(&mut config.export);
    }
    config.validate()?;

    let db_path = cli
        .db
        .clone()
        .or_else(|| config.database.path.clone())
        .context("no ticket database configured; pass --db, set HELPDESK_DB or add [database] path to the config")?;
    let store = open_store(&db_path, config.database.busy_timeout())?;

    let timeout = config.export.timeout();
    let span = tracing::info_span!("hd", command = cli.command.name());
    info!(parent: &span, db = %db_path.display(), "ticket database opened");
    let service = HelpdeskService::new(store, config.export, span);

    match &cli.command {
        Commands::List(args) => cmd::list::run_list(args, &service, output),
        Commands::Export(args) => {
            let cancel = timeout.map_or_else(CancelToken::new, CancelToken::with_timeout);
            cmd::export::run_export(args, &service, &cancel, output)
        }
        Commands::Report(args) => cmd::report::run_report(args, &service, output),
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let working_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = helpdesk_core::load_config(cli.config.as_deref(), &working_dir);
    let output = output::resolve_output_mode(
        cli.format,
        cli.json,
        config.as_ref().ok().and_then(|c| c.output.as_deref()),
    );

    let result = config
        .map_err(anyhow::Error::from)
        .and_then(|config| run(&cli, config, output));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Err(render_err) = output::render_error(output, &CliError::from(&err)) {
                eprintln!("error: {err:#} (while rendering: {render_err})");
            }
            ExitCode::from(exit_code(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_before_and_after_subcommand() {
        let cli = Cli::parse_from(["hd", "--json", "list"]);
        assert!(cli.json);
        let cli = Cli::parse_from(["hd", "report", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["hd", "list", "--format", "text"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn global_db_and_export_timeout_parse() {
        let cli = Cli::parse_from([
            "hd",
            "export",
            "--db",
            "/tmp/tickets.sqlite3",
            "--timeout-secs",
            "30",
            "--out",
            "out.xlsx",
        ]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/tickets.sqlite3")));
        match cli.command {
            Commands::Export(args) => assert_eq!(args.timeout_secs, Some(30)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn timeout_is_only_accepted_by_export() {
        for command in ["list", "report"] {
            let err = Cli::try_parse_from(["hd", command, "--timeout-secs", "30"])
                .expect_err("list and report never cancel");
            assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
        }
    }

    #[test]
    fn list_subcommand_parses_filters() {
        let cli = Cli::parse_from(["hd", "list", "--category", "Network", "-n", "2"]);
        match cli.command {
            Commands::List(args) => {
                assert_eq!(args.filter.category.as_deref(), Some("Network"));
                assert_eq!(args.page_size, 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn domain_errors_map_to_exit_codes() {
        let cases = [
            (HelpdeskError::InvalidCursor("x".to_string()), 3),
            (
                HelpdeskError::InvalidFilter {
                    field: "createdAfter",
                    reason: "x".to_string(),
                },
                3,
            ),
            (HelpdeskError::NotFound, 4),
            (HelpdeskError::Export("x".to_string()), 6),
            (
                HelpdeskError::Concurrency {
                    task: "batch 1".to_string(),
                    reason: "x".to_string(),
                },
                6,
            ),
            (HelpdeskError::Cancelled("deadline exceeded"), 7),
        ];
        for (err, code) in cases {
            assert_eq!(exit_code(&anyhow::Error::new(err)), code);
        }
        assert_eq!(exit_code(&anyhow::anyhow!("plain")), 1);
    }

    #[test]
    fn context_does_not_hide_domain_kind() {
        let err = anyhow::Error::new(HelpdeskError::NotFound).context("loading ticket");
        assert_eq!(exit_code(&err), 4);
    }

    #[test]
    fn timeout_is_unbounded_by_default() {
        assert_eq!(HelpdeskConfig::default().export.timeout(), None::<std::time::Duration>);
    }
}
