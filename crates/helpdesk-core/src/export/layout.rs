//! Fixed workbook layout: sheet names, headers, table offsets and row
//! formatting.
//!
//! Summary sheet:
//!
//! ```text
//! row 1                      Date update: <from>-<to>
//! row 4                      category table header, rows follow
//! row 4 + 10 + categories    supporter table header, rows follow
//! ... + 10 + supporters      priority table header, rows follow
//! ```
//!
//! Detail sheet: column headers on row 1, one ticket per row from row 2.

use chrono::NaiveDate;

use super::sheet::{CellValue, ExportDocument, Row, RowRange};
use crate::error::{HelpdeskError, Result};
use crate::model::TicketRecord;
use crate::query::CreatedRange;
use crate::report::{ReportRow, ReportSet};

pub const DETAIL_SHEET: &str = "Help Desk Requests";
pub const SUMMARY_SHEET: &str = "Summary";

/// First data row of the detail sheet.
pub const FIRST_DETAIL_ROW: u32 = 2;
/// Header row of the first summary table.
pub const FIRST_TABLE_ROW: u32 = 4;
/// Gap between one table's header and the next, before its rows.
pub const TABLE_SPACING: u32 = 10;

const DATE_FORMAT: &str = "%d/%m/%Y";
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub const DETAIL_HEADERS: [&str; 15] = [
    "HelpDesk Number",
    "Type of Form",
    "Title",
    "Description",
    "Request Date",
    "ID Staff Request",
    "Request by (Eng)",
    "Position",
    "Department",
    "Branch",
    "IT Support Name",
    "IT Support Position",
    "Priority",
    "Status",
    "Closed Date",
];

pub const CATEGORY_HEADERS: [&str; 5] = [
    "Helpdesk Ticket Summary Report Type",
    "In Progress",
    "Resolved",
    "Blank",
    "Grand Total",
];

pub const SUPPORTER_HEADERS: [&str; 5] = [
    "IT Technical Summary Report Full Name",
    "In Progress",
    "Resolved",
    "Blank",
    "Grand Total",
];

pub const PRIORITY_HEADERS: [&str; 6] = [
    "Priority Summary Report Type",
    "High",
    "Medium",
    "Low",
    "Blank",
    "Grand Total",
];

/// Header rows of the three summary tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLayout {
    pub category: u32,
    pub supporter: u32,
    pub priority: u32,
}

impl SummaryLayout {
    /// Place the tables for the given report sizes.
    ///
    /// # Errors
    ///
    /// Returns `ExportError` if a table would start past the last sheet row.
    pub fn for_reports(reports: &ReportSet) -> Result<Self> {
        let category = FIRST_TABLE_ROW;
        let supporter = next_table(category, reports.categories.len())?;
        let priority = next_table(supporter, reports.supporters.len())?;
        Ok(Self {
            category,
            supporter,
            priority,
        })
    }
}

fn next_table(header_row: u32, rows: usize) -> Result<u32> {
    u32::try_from(rows)
        .ok()
        .and_then(|rows| header_row.checked_add(TABLE_SPACING)?.checked_add(rows))
        .ok_or_else(|| HelpdeskError::Export("summary table does not fit the sheet".to_string()))
}

/// `Date update: <from>-<to>`, both `dd/mm/YYYY`.
///
/// A missing upper bound shows `today`; a missing lower bound stays empty.
#[must_use]
pub fn date_header(range: &CreatedRange, today: NaiveDate) -> String {
    let from = range
        .after
        .map(|after| after.format(DATE_FORMAT).to_string())
        .unwrap_or_default();
    let to = range
        .before
        .map_or(today, |before| before.date_naive())
        .format(DATE_FORMAT);
    format!("Date update: {from}-{to}")
}

fn header_row(headers: &[&str]) -> Row {
    headers
        .iter()
        .map(|header| CellValue::Header((*header).to_string()))
        .collect()
}

/// Write every header cell. Runs before any writer is started.
///
/// # Errors
///
/// Returns `ConcurrencyError` if a header row is already populated.
pub fn write_headers(
    document: &ExportDocument,
    layout: &SummaryLayout,
    range: &CreatedRange,
    today: NaiveDate,
) -> Result<()> {
    document
        .detail
        .write_rows(RowRange::single(1), vec![header_row(&DETAIL_HEADERS)])?;

    let summary = &document.summary;
    summary.write_rows(
        RowRange::single(1),
        vec![vec![CellValue::Text(date_header(range, today))]],
    )?;
    summary.write_rows(
        RowRange::single(layout.category),
        vec![header_row(&CATEGORY_HEADERS)],
    )?;
    summary.write_rows(
        RowRange::single(layout.supporter),
        vec![header_row(&SUPPORTER_HEADERS)],
    )?;
    summary.write_rows(
        RowRange::single(layout.priority),
        vec![header_row(&PRIORITY_HEADERS)],
    )?;
    Ok(())
}

/// Detail row for one ticket, columns A through O.
#[must_use]
pub fn ticket_row(ticket: &TicketRecord) -> Row {
    let closed = ticket
        .closed_date
        .map_or(CellValue::Empty, |date| {
            CellValue::Text(date.format(DATE_FORMAT).to_string())
        });
    vec![
        ticket.number.as_str().into(),
        ticket.category.as_str().into(),
        ticket.title.as_str().into(),
        ticket.description.as_str().into(),
        ticket.created_at.format(TIMESTAMP_FORMAT).to_string().into(),
        ticket.requester.id.as_str().into(),
        ticket.requester.display_name.as_str().into(),
        ticket.requester.position.as_str().into(),
        ticket.requester.department.as_str().into(),
        ticket.requester.branch.as_str().into(),
        ticket.supporter.display_name.as_str().into(),
        ticket.supporter.position.as_str().into(),
        ticket.priority.as_str().into(),
        ticket.status.as_str().into(),
        closed,
    ]
}

/// Summary rows: name, each bucket, then the total.
#[must_use]
pub fn report_rows<R: ReportRow>(rows: &[R]) -> Vec<Row> {
    rows.iter()
        .map(|row| {
            let mut cells = vec![CellValue::from(row.name())];
            cells.extend(row.buckets().into_iter().map(CellValue::Number));
            cells.push(CellValue::Number(row.total()));
            cells
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Requester, Supporter, TicketStatus};
    use crate::report::{CategoryReport, PriorityReport, SupporterReport};
    use chrono::{TimeZone, Utc};

    fn category(name: &str) -> CategoryReport {
        CategoryReport {
            name: name.to_string(),
            in_progress: 1,
            resolved: 2,
            blank: 0,
            total: 3,
        }
    }

    #[test]
    fn tables_are_spaced_by_previous_length() {
        let reports = ReportSet {
            categories: vec![category("Mail"), category("Network")],
            supporters: vec![
                SupporterReport {
                    name: "Dara".to_string(),
                    in_progress: 0,
                    resolved: 1,
                    blank: 0,
                    total: 1,
                };
                3
            ],
            priorities: Vec::new(),
        };
        let layout = SummaryLayout::for_reports(&reports).expect("layout");
        assert_eq!(layout.category, 4);
        assert_eq!(layout.supporter, 4 + 10 + 2);
        assert_eq!(layout.priority, 16 + 10 + 3);
    }

    #[test]
    fn empty_reports_still_get_distinct_tables() {
        let layout = SummaryLayout::for_reports(&ReportSet::default()).expect("layout");
        assert_eq!((layout.category, layout.supporter, layout.priority), (4, 14, 24));
    }

    #[test]
    fn date_header_defaults_upper_bound_to_today() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 9).expect("date");
        let mut range = CreatedRange::default();
        assert_eq!(date_header(&range, today), "Date update: -09/05/2024");

        range.after = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single();
        range.before = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).single();
        assert_eq!(date_header(&range, today), "Date update: 02/01/2024-31/03/2024");
    }

    #[test]
    fn ticket_row_formats_dates_and_normalized_status() {
        let ticket = TicketRecord {
            id: 7,
            number: "HD-0007".to_string(),
            category: "Network".to_string(),
            priority: Priority::High,
            raw_status: "FINISHED,MANAGER(APPROVE),IT(RESOLVE)".to_string(),
            status: TicketStatus::Resolved,
            title: "VPN down".to_string(),
            description: "cannot connect".to_string(),
            requester: Requester {
                id: "E100".to_string(),
                display_name: "Sok Dara".to_string(),
                position: "Teller".to_string(),
                department: "Operations".to_string(),
                branch: "HQ".to_string(),
            },
            supporter: Supporter {
                display_name: "Chan Vibol".to_string(),
                position: "Engineer".to_string(),
            },
            created_at: Utc
                .with_ymd_and_hms(2024, 2, 3, 14, 5, 6)
                .single()
                .expect("time"),
            closed_date: None,
        };

        let row = ticket_row(&ticket);
        assert_eq!(row.len(), DETAIL_HEADERS.len());
        assert_eq!(row[4].as_text(), Some("03/02/2024 14:05:06"));
        assert_eq!(row[12].as_text(), Some("HIGH"));
        assert_eq!(row[13].as_text(), Some("RESOLVED"));
        assert_eq!(row[14], CellValue::Empty);

        let closed = TicketRecord {
            closed_date: NaiveDate::from_ymd_opt(2024, 2, 5),
            ..ticket
        };
        assert_eq!(ticket_row(&closed)[14].as_text(), Some("05/02/2024"));
    }

    #[test]
    fn report_rows_end_with_total() {
        let rows = report_rows(&[PriorityReport {
            name: "Network".to_string(),
            high: 1,
            medium: 2,
            low: 3,
            blank: 4,
            total: 10,
        }]);
        assert_eq!(rows[0].len(), PRIORITY_HEADERS.len());
        assert_eq!(rows[0][0].as_text(), Some("Network"));
        assert_eq!(rows[0][5], CellValue::Number(10));
    }
}
