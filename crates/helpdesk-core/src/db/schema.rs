//! Canonical layout of the ticket report view.
//!
//! Production deployments point at an existing database that already exposes
//! `v_helpdesk_report`. The DDL here stands up the same shape in `SQLite` for
//! local development and tests.

use rusqlite::{Connection, params};

use crate::model::{CLOSED_DATE_SENTINEL, TicketRecord};

/// Name of the view every query reads from.
pub const REPORT_VIEW: &str = "v_helpdesk_report";

/// Columns selected for a [`TicketRecord`], in mapping order.
pub const TICKET_COLUMNS: &str = "id, number, category, priority, status, title, description, \
     creator_number, creator_display_name, position, department, branch, \
     supporter_name, supporter_position, created_at, closed_date";

/// Backing table and report view.
pub const REPORT_SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS helpdesk_tickets (
    id INTEGER PRIMARY KEY,
    number TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    priority TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    creator_number TEXT NOT NULL DEFAULT '',
    creator_display_name TEXT NOT NULL DEFAULT '',
    creator_position TEXT NOT NULL DEFAULT '',
    creator_department TEXT NOT NULL DEFAULT '',
    creator_branch TEXT NOT NULL DEFAULT '',
    supporter_name TEXT NOT NULL DEFAULT '',
    supporter_position TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    closed_date TEXT NOT NULL DEFAULT '1900-01-01'
);

CREATE INDEX IF NOT EXISTS idx_helpdesk_tickets_created
    ON helpdesk_tickets(created_at);

CREATE INDEX IF NOT EXISTS idx_helpdesk_tickets_category
    ON helpdesk_tickets(category, id DESC);

CREATE VIEW IF NOT EXISTS v_helpdesk_report AS
SELECT
    id,
    number,
    category,
    priority,
    status,
    title,
    description,
    creator_number,
    creator_display_name,
    creator_position AS position,
    creator_department AS department,
    creator_branch AS branch,
    supporter_name,
    supporter_position,
    created_at,
    closed_date
FROM helpdesk_tickets;
";

/// Create the backing table and the report view.
///
/// # Errors
///
/// Returns an error if executing the DDL fails.
pub fn create_report_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(REPORT_SCHEMA_SQL)
}

/// Insert one ticket into the backing table, writing the raw status verbatim
/// and the sentinel for an absent closed date.
///
/// # Errors
///
/// Returns an error if the insert fails (for example a duplicate id).
pub fn insert_ticket(conn: &Connection, ticket: &TicketRecord) -> rusqlite::Result<()> {
    let closed_date = ticket.closed_date.map_or_else(
        || CLOSED_DATE_SENTINEL.to_string(),
        |date| date.format("%Y-%m-%d").to_string(),
    );
    conn.execute(
        "INSERT INTO helpdesk_tickets (id, number, category, priority, status, title, \
         description, creator_number, creator_display_name, creator_position, \
         creator_department, creator_branch, supporter_name, supporter_position, \
         created_at, closed_date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            ticket.id,
            ticket.number,
            ticket.category,
            ticket.priority.as_str(),
            ticket.raw_status,
            ticket.title,
            ticket.description,
            ticket.requester.id,
            ticket.requester.display_name,
            ticket.requester.position,
            ticket.requester.department,
            ticket.requester.branch,
            ticket.supporter.display_name,
            ticket.supporter.position,
            ticket.created_at,
            closed_date,
        ],
    )?;
    Ok(())
}
