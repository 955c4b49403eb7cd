//! In-memory store and ticket fixtures for unit tests.

use chrono::{Duration, TimeZone, Utc};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::{HelpdeskError, Result};
use crate::model::{Priority, Requester, Supporter, TicketRecord, TicketStatus};
use crate::query::{Clause, Column, CreatedRange, QueryPlan, Value};
use crate::store::{SummaryRow, SummarySpec, TicketStore};

/// Ticket `id` in `category`, created `id` minutes after 2024-01-01.
pub fn ticket(id: i64, category: &str) -> TicketRecord {
    let raw_status = match id % 3 {
        0 => "FINISHED,MANAGER(APPROVE),IT(RESOLVE)",
        1 => "FINISHED,MANAGER(APPROVE),IT(IN PROGRESS)",
        _ => "REQUEST",
    };
    let priority = match id % 4 {
        0 => Priority::High,
        1 => Priority::Medium,
        2 => Priority::Low,
        _ => Priority::Other(String::new()),
    };
    TicketRecord {
        id,
        number: format!("HD-{id:05}"),
        category: category.to_string(),
        priority,
        raw_status: raw_status.to_string(),
        status: TicketStatus::from_raw(raw_status),
        title: format!("ticket {id}"),
        description: String::new(),
        requester: Requester {
            id: format!("E{}", id % 7),
            display_name: "Sok Dara".to_string(),
            ..Requester::default()
        },
        supporter: Supporter {
            display_name: if id % 5 == 0 { String::new() } else { "Chan Vibol".to_string() },
            position: "Engineer".to_string(),
        },
        created_at: Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
            + Duration::minutes(id),
        closed_date: None,
    }
}

/// Tickets `1..=count`, cycling through the given categories.
pub fn tickets(count: i64, categories: &[&str]) -> Vec<TicketRecord> {
    (1..=count)
        .map(|id| {
            let index = usize::try_from(id).unwrap_or_default() % categories.len();
            ticket(id, categories[index])
        })
        .collect()
}

/// Evaluates plans against a vector, the way the SQL store does.
#[derive(Default)]
pub struct MemoryStore {
    tickets: Vec<TicketRecord>,
    fetches: Cell<usize>,
    fail_on_fetch: Option<usize>,
    cancel_on_fetch: Option<(usize, Arc<CancelToken>)>,
}

impl MemoryStore {
    pub fn new(tickets: Vec<TicketRecord>) -> Self {
        Self {
            tickets,
            ..Self::default()
        }
    }

    /// Fail the `n`th fetch (1-based) with a query error.
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on_fetch = Some(n);
        self
    }

    /// Trip `token` while serving the `n`th fetch (1-based).
    pub fn cancelling_on(mut self, n: usize, token: Arc<CancelToken>) -> Self {
        self.cancel_on_fetch = Some((n, token));
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

fn column_text(ticket: &TicketRecord, column: Column) -> String {
    match column {
        Column::Id => ticket.id.to_string(),
        Column::Number => ticket.number.clone(),
        Column::Category => ticket.category.clone(),
        Column::Priority => ticket.priority.as_str().to_string(),
        Column::Status => ticket.raw_status.clone(),
        Column::RequesterId => ticket.requester.id.clone(),
        Column::SupporterName => ticket.supporter.display_name.clone(),
        Column::CreatedAt => ticket.created_at.to_rfc3339(),
    }
}

fn matches(ticket: &TicketRecord, clause: &Clause) -> bool {
    match clause {
        Clause::Equals(Column::Id, Value::Int(id)) => ticket.id == *id,
        Clause::Equals(column, Value::Text(text)) => column_text(ticket, *column) == *text,
        Clause::Equals(_, _) => false,
        Clause::Contains(column, needle) => column_text(ticket, *column).contains(needle.as_str()),
        Clause::AtMost(_, time) => ticket.created_at <= *time,
        Clause::AtLeast(_, time) => ticket.created_at >= *time,
        Clause::Before(_, id) => ticket.id < *id,
    }
}

impl TicketStore for MemoryStore {
    fn fetch_page(&self, plan: &QueryPlan) -> Result<Vec<TicketRecord>> {
        let fetch = self.fetches.get() + 1;
        self.fetches.set(fetch);
        if let Some((n, token)) = &self.cancel_on_fetch {
            if *n == fetch {
                token.cancel();
            }
        }
        if self.fail_on_fetch == Some(fetch) {
            return Err(HelpdeskError::query(
                format!("fetch page {fetch}"),
                rusqlite::Error::InvalidQuery,
            ));
        }

        let mut page: Vec<_> = self
            .tickets
            .iter()
            .filter(|t| plan.predicate.clauses.iter().all(|c| matches(t, c)))
            .cloned()
            .collect();
        page.sort_by(|a, b| b.id.cmp(&a.id));
        page.truncate(plan.limit as usize);
        Ok(page)
    }

    fn summarize(&self, spec: &SummarySpec, range: &CreatedRange) -> Result<Vec<SummaryRow>> {
        let window = range.predicate();
        let mut groups: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for ticket in self
            .tickets
            .iter()
            .filter(|t| window.clauses.iter().all(|c| matches(t, c)))
        {
            let bucket = spec
                .buckets
                .iter()
                .position(|b| b.values.contains(&column_text(ticket, b.column)))
                .unwrap_or(spec.buckets.len());
            let counts = groups
                .entry(column_text(ticket, spec.group_by))
                .or_insert_with(|| vec![0; spec.buckets.len() + 1]);
            counts[bucket] += 1;
        }
        Ok(groups
            .into_iter()
            .map(|(name, counts)| SummaryRow { name, counts })
            .collect())
    }
}
