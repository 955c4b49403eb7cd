pub mod export;
pub mod list;
pub mod report;

use chrono::{DateTime, Utc};
use clap::Args;
use helpdesk_core::query::parse_filter_time;
use helpdesk_core::{CreatedRange, HelpdeskError, TicketFilter};

fn parse_after(raw: &str) -> Result<DateTime<Utc>, HelpdeskError> {
    parse_filter_time("createdAfter", raw)
}

fn parse_before(raw: &str) -> Result<DateTime<Utc>, HelpdeskError> {
    parse_filter_time("createdBefore", raw)
}

/// Creation-time window flags shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Only tickets created at or after this time (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_parser = parse_after)]
    pub after: Option<DateTime<Utc>>,

    /// Only tickets created at or before this time (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_parser = parse_before)]
    pub before: Option<DateTime<Utc>>,
}

impl WindowArgs {
    pub const fn to_range(&self) -> CreatedRange {
        CreatedRange {
            after: self.after,
            before: self.before,
        }
    }
}

/// Ticket filter flags shared by `list` and `export`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Exact ticket id.
    #[arg(long)]
    pub id: Option<i64>,

    /// Exact ticket number.
    #[arg(long)]
    pub number: Option<String>,

    /// Exact category (type of form).
    #[arg(short, long)]
    pub category: Option<String>,

    /// Exact priority: HIGH, MEDIUM, LOW.
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Substring of the raw status, e.g. "IN PROGRESS".
    #[arg(short, long)]
    pub status: Option<String>,

    /// Exact requester employee id.
    #[arg(long = "requester")]
    pub requester_id: Option<String>,

    #[command(flatten)]
    pub window: WindowArgs,
}

impl FilterArgs {
    pub fn to_filter(&self) -> TicketFilter {
        TicketFilter {
            id: self.id,
            number: self.number.clone(),
            category: self.category.clone(),
            priority: self.priority.clone(),
            status: self.status.clone(),
            requester_id: self.requester_id.clone(),
            created: self.window.to_range(),
        }
    }
}
