//! End-to-end scenarios over an on-disk ticket database opened read-only.

use chrono::{NaiveDate, TimeZone, Utc};
use helpdesk_core::cancel::CancelToken;
use helpdesk_core::config::ExportConfig;
use helpdesk_core::db::{DEFAULT_BUSY_TIMEOUT, SqliteStore, open_store};
use helpdesk_core::error::ErrorKind;
use helpdesk_core::export::{CellValue, ExportPipeline};
use helpdesk_core::model::{TicketRecord, TicketStatus};
use helpdesk_core::query::{CreatedRange, ExportQuery, ListQuery, TicketFilter};
use helpdesk_core::service::{HelpdeskService, TicketPage};
use rusqlite::Connection;
use tracing::Span;

use fixtures::*;

const IN_PROGRESS: &str = "FINISHED,MANAGER(APPROVE),IT(IN PROGRESS)";
const RESOLVED: &str = "FINISHED,MANAGER(APPROVE),IT(RESOLVE)";

fn service_over(dir: &tempfile::TempDir, tickets: &[TicketRecord]) -> HelpdeskService<SqliteStore> {
    let path = seed_database(dir.path(), tickets);
    let store = open_store(&path, DEFAULT_BUSY_TIMEOUT).expect("open store");
    HelpdeskService::new(store, ExportConfig::default(), Span::none())
}

fn list(
    service: &HelpdeskService<SqliteStore>,
    filter: TicketFilter,
    size: i64,
    token: &str,
) -> TicketPage {
    service
        .list_tickets(&ListQuery {
            filter,
            page_size: size,
            page_token: Some(token.to_string()),
        })
        .expect("list page")
}

#[test]
fn network_category_in_pages_of_two() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut tickets: Vec<_> = (1..=5).map(|id| ticket(id * 10, "Network", RESOLVED)).collect();
    tickets.extend((1..=4).map(|id| ticket(id * 10 + 1, "Mail", RESOLVED)));
    let service = service_over(&dir, &tickets);
    let network = || TicketFilter {
        category: Some("Network".to_string()),
        ..TicketFilter::default()
    };

    let first = list(&service, network(), 2, "");
    assert_eq!(first.tickets.iter().map(|t| t.id).collect::<Vec<_>>(), vec![50, 40]);
    assert!(!first.next_page_token.is_empty());

    let second = list(&service, network(), 2, &first.next_page_token);
    assert_eq!(second.tickets.iter().map(|t| t.id).collect::<Vec<_>>(), vec![30, 20]);
    assert!(!second.next_page_token.is_empty());

    let third = list(&service, network(), 2, &second.next_page_token);
    assert_eq!(third.tickets.iter().map(|t| t.id).collect::<Vec<_>>(), vec![10]);
    assert_eq!(third.next_page_token, "");
}

#[test]
fn sentinel_closed_date_is_absent_in_list_and_export() {
    let dir = tempfile::tempdir().expect("temp dir");
    let tickets = vec![
        ticket(1, "Network", RESOLVED),
        closed_on(ticket(2, "Network", RESOLVED), 2024, 3, 9),
    ];
    let path = seed_database(dir.path(), &tickets);
    {
        let conn = Connection::open(&path).expect("open for writing");
        conn.execute(
            "INSERT INTO helpdesk_tickets (id, number, created_at, closed_date) \
             VALUES (3, 'HD-00003', '2024-01-01 00:03:00+00:00', '1900-01-01 00:00:00')",
            [],
        )
        .expect("insert timestamped sentinel");
    }
    let store = open_store(&path, DEFAULT_BUSY_TIMEOUT).expect("open store");
    let service = HelpdeskService::new(store, ExportConfig::default(), Span::none());

    let page = list(&service, TicketFilter::default(), 10, "");
    let closed: Vec<_> = page.tickets.iter().map(|t| (t.id, t.closed_date)).collect();
    assert_eq!(
        closed,
        vec![(3, None), (2, NaiveDate::from_ymd_opt(2024, 3, 9)), (1, None)]
    );
    let json = serde_json::to_value(&page).expect("serialize page");
    assert!(json["tickets"][0]["closedDate"].is_null());
    assert!(!json.to_string().contains("1900"));

    let config = ExportConfig::default();
    let cancel = CancelToken::new();
    let outcome = ExportPipeline::new(service.store(), &config, &cancel)
        .run(&TicketFilter::default(), NaiveDate::from_ymd_opt(2024, 6, 1).expect("date"))
        .expect("export");
    let detail = &outcome.document.detail;
    let closed_cells: Vec<_> = (2..=4)
        .map(|row| detail.row(row).expect("row").expect("populated")[14].clone())
        .collect();
    assert_eq!(
        closed_cells,
        vec![
            CellValue::Empty,
            CellValue::Text("09/03/2024".to_string()),
            CellValue::Empty,
        ]
    );
}

#[test]
fn status_filter_matches_substring_of_raw_status() {
    let dir = tempfile::tempdir().expect("temp dir");
    let tickets = vec![
        ticket(1, "Network", IN_PROGRESS),
        ticket(2, "Network", RESOLVED),
        ticket(3, "Mail", "REQUEST"),
        ticket(4, "Mail", IN_PROGRESS),
    ];
    let service = service_over(&dir, &tickets);

    let page = list(
        &service,
        TicketFilter {
            status: Some("IN PROGRESS".to_string()),
            ..TicketFilter::default()
        },
        0,
        "",
    );
    assert_eq!(page.tickets.iter().map(|t| t.id).collect::<Vec<_>>(), vec![4, 1]);
    assert!(page.tickets.iter().all(|t| t.status == TicketStatus::InProgress));
    assert_eq!(page.next_page_token, "");

    // LIKE wildcards in the filter are literal.
    let none = list(
        &service,
        TicketFilter {
            status: Some("%".to_string()),
            ..TicketFilter::default()
        },
        0,
        "",
    );
    assert!(none.tickets.is_empty());
}

#[test]
fn creation_window_bounds_are_inclusive() {
    let dir = tempfile::tempdir().expect("temp dir");
    let tickets: Vec<_> = (1..=6).map(|id| ticket(id, "Network", RESOLVED)).collect();
    let service = service_over(&dir, &tickets);

    let page = list(
        &service,
        TicketFilter {
            created: CreatedRange {
                after: Some(minutes_after_epoch(2)),
                before: Some(minutes_after_epoch(4)),
            },
            ..TicketFilter::default()
        },
        20,
        "",
    );
    assert_eq!(page.tickets.iter().map(|t| t.id).collect::<Vec<_>>(), vec![4, 3, 2]);
}

#[test]
fn reports_group_sort_and_substitute_blank() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut blank = ticket(5, "", "REQUEST");
    blank.supporter.display_name = String::new();
    let tickets = vec![
        ticket(1, "Network", IN_PROGRESS),
        ticket(2, "Network", RESOLVED),
        ticket(3, "Network", "PENDING"),
        ticket(4, "Mail", RESOLVED),
        blank,
    ];
    let service = service_over(&dir, &tickets);

    let reports = service.reports(&CreatedRange::default()).expect("reports");
    let categories: Vec<_> = reports
        .categories
        .iter()
        .map(|r| (r.name.as_str(), r.in_progress, r.resolved, r.blank, r.total))
        .collect();
    assert_eq!(
        categories,
        vec![
            ("(Blank)", 0, 0, 1, 1),
            ("Mail", 0, 1, 0, 1),
            ("Network", 1, 1, 1, 3),
        ]
    );
    let supporters: Vec<_> = reports.supporters.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(supporters, vec!["(Blank)", "Chan Vibol"]);
    let network = reports
        .priorities
        .iter()
        .find(|r| r.name == "Network")
        .expect("network priorities");
    assert_eq!((network.high, network.total), (3, 3));
}

#[test]
fn empty_and_whitespace_categories_form_one_blank_row() {
    let dir = tempfile::tempdir().expect("temp dir");
    let tickets = vec![
        ticket(1, "", IN_PROGRESS),
        ticket(2, "  ", RESOLVED),
        ticket(3, "  ", "REQUEST"),
        ticket(4, "Network", RESOLVED),
    ];
    let service = service_over(&dir, &tickets);

    let reports = service.reports(&CreatedRange::default()).expect("reports");
    let categories: Vec<_> = reports
        .categories
        .iter()
        .map(|r| (r.name.as_str(), r.in_progress, r.resolved, r.blank, r.total))
        .collect();
    assert_eq!(
        categories,
        vec![("(Blank)", 1, 1, 1, 3), ("Network", 0, 1, 0, 1)]
    );
    let priorities: Vec<_> = reports.priorities.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(priorities, vec!["(Blank)", "Network"]);
}

#[test]
fn export_file_for_filtered_window() {
    let dir = tempfile::tempdir().expect("temp dir");
    let tickets: Vec<_> = (1..=450).map(|id| ticket(id, "Network", RESOLVED)).collect();
    let service = service_over(&dir, &tickets);
    let now = Utc.with_ymd_and_hms(2024, 6, 30, 8, 0, 0).single().expect("time");

    let file = service
        .export_tickets(&ExportQuery::default(), &CancelToken::new(), now)
        .expect("export");
    assert!(file.bytes.starts_with(b"PK"));
    assert_eq!(file.stats.batches, 3);
    assert_eq!(file.stats.fetches, 4);
    assert_eq!(file.stats.detail_rows, 450);
    assert_eq!(
        file.content_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
}

#[test]
fn bad_token_and_inverted_window_are_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let service = service_over(&dir, &[ticket(1, "Network", RESOLVED)]);

    let err = service
        .list_tickets(&ListQuery {
            page_token: Some("%%%".to_string()),
            ..ListQuery::default()
        })
        .expect_err("bad token");
    assert_eq!(err.kind(), ErrorKind::InvalidCursor);

    let inverted = ExportQuery {
        filter: TicketFilter {
            created: CreatedRange {
                after: Some(minutes_after_epoch(10)),
                before: Some(minutes_after_epoch(1)),
            },
            ..TicketFilter::default()
        },
    };
    let err = service
        .export_tickets(&inverted, &CancelToken::new(), Utc::now())
        .expect_err("inverted window");
    assert_eq!(err.kind(), ErrorKind::InvalidFilter);
}
