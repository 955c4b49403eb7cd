//! `hd list`: one page of tickets, newest first.

use super::FilterArgs;
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};
use clap::Args;
use helpdesk_core::{HelpdeskService, ListQuery, TicketPage, TicketRecord, TicketStore};
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Rows per page; 0 or less means 20, capped at 200.
    #[arg(short = 'n', long, default_value_t = 0, allow_negative_numbers = true)]
    pub page_size: i64,

    /// Token from a previous page's `nextPageToken`.
    #[arg(long)]
    pub page_token: Option<String>,

    /// Follow page tokens until the last page.
    #[arg(long, conflicts_with = "page_token")]
    pub all: bool,
}

impl ListArgs {
    fn query(&self, page_token: Option<String>) -> ListQuery {
        ListQuery {
            filter: self.filter.to_filter(),
            page_size: self.page_size,
            page_token,
        }
    }
}

pub fn run_list<S: TicketStore>(
    args: &ListArgs,
    service: &HelpdeskService<S>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let mut page = service.list_tickets(&args.query(args.page_token.clone()))?;
    if args.all {
        let mut tickets = std::mem::take(&mut page.tickets);
        while page.has_more() {
            page = service.list_tickets(&args.query(Some(page.next_page_token.clone())))?;
            tickets.append(&mut page.tickets);
        }
        page.tickets = tickets;
    }

    render_mode(output, &page, render_text, render_pretty)
}

fn render_text(page: &TicketPage, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "id\tnumber\tstatus\tpriority\tcategory\tcreated\ttitle")?;
    for t in &page.tickets {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            t.id,
            t.number,
            t.status,
            t.priority,
            t.category,
            t.created_at.to_rfc3339(),
            t.title
        )?;
    }
    if page.has_more() {
        writeln!(w, "next_page_token\t{}", page.next_page_token)?;
    }
    Ok(())
}

fn render_pretty(page: &TicketPage, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Tickets ({})", page.tickets.len()))?;
    if page.tickets.is_empty() {
        writeln!(w, "No tickets match.")?;
    }
    for t in &page.tickets {
        pretty_ticket(w, t)?;
    }
    if page.has_more() {
        pretty_rule(w)?;
        pretty_kv(w, "Next page", &page.next_page_token)?;
    }
    Ok(())
}

fn pretty_ticket(w: &mut dyn Write, t: &TicketRecord) -> io::Result<()> {
    writeln!(
        w,
        "#{:<6} {:<12} {:<12} {:<8} {}",
        t.id,
        t.number,
        t.status.as_str(),
        t.priority.as_str(),
        t.title
    )?;
    let requester = if t.requester.display_name.is_empty() {
        t.requester.id.clone()
    } else {
        format!("{} ({})", t.requester.display_name, t.requester.id)
    };
    writeln!(
        w,
        "        {} | {} | {}",
        t.category,
        t.created_at.format("%Y-%m-%d %H:%M"),
        requester
    )?;
    if let Some(closed) = t.closed_date {
        writeln!(w, "        closed {closed}")?;
    }
    Ok(())
}
