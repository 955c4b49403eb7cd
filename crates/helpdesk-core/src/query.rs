//! Structured ticket queries and the store-agnostic predicates built from them.
//!
//! A [`TicketFilter`] becomes a [`Predicate`]: a conjunction of [`Clause`]s,
//! each carrying its own bound value. Stores render predicates into their own
//! dialect; nothing here knows about SQL text.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cursor;
use crate::error::{HelpdeskError, Result};

/// Page size used when the caller asks for zero or a negative size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page a single list call returns.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Effective page size for a requested size.
///
/// `resolve_page_size(resolve_page_size(n)) == resolve_page_size(n)` for all `n`.
#[must_use]
pub fn resolve_page_size(requested: i64) -> u32 {
    if requested <= 0 {
        DEFAULT_PAGE_SIZE
    } else if requested > i64::from(MAX_PAGE_SIZE) {
        MAX_PAGE_SIZE
    } else {
        // 1..=200 always fits.
        u32::try_from(requested).unwrap_or(MAX_PAGE_SIZE)
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Creation-time window, both ends inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRange {
    #[serde(rename = "createdAfter", default)]
    pub after: Option<DateTime<Utc>>,
    #[serde(rename = "createdBefore", default)]
    pub before: Option<DateTime<Utc>>,
}

impl CreatedRange {
    /// Reject windows whose lower bound lies after the upper bound.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::InvalidFilter`] for an inverted window.
    pub fn validate(&self) -> Result<()> {
        match (self.after, self.before) {
            (Some(after), Some(before)) if after > before => Err(HelpdeskError::invalid_filter(
                "createdAfter",
                format!("{after} is later than createdBefore {before}"),
            )),
            _ => Ok(()),
        }
    }

    fn push_clauses(&self, clauses: &mut Vec<Clause>) {
        if let Some(before) = self.before {
            clauses.push(Clause::AtMost(Column::CreatedAt, before));
        }
        if let Some(after) = self.after {
            clauses.push(Clause::AtLeast(Column::CreatedAt, after));
        }
    }

    /// Predicate restricted to the window only.
    #[must_use]
    pub fn predicate(&self) -> Predicate {
        let mut clauses = Vec::new();
        self.push_clauses(&mut clauses);
        Predicate { clauses }
    }
}

/// Field filters shared by list and export requests.
///
/// All fields are optional; empty strings count as unset. Set fields are
/// combined with AND semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketFilter {
    /// Exact ticket identifier.
    pub id: Option<i64>,
    /// Exact ticket number.
    pub number: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// Exact priority (`HIGH`, `MEDIUM`, `LOW`, ...).
    pub priority: Option<String>,
    /// Substring of the raw status.
    pub status: Option<String>,
    /// Exact requester (employee) id.
    pub requester_id: Option<String>,
    #[serde(flatten)]
    pub created: CreatedRange,
}

impl TicketFilter {
    /// Build the predicate for this filter, optionally bounded above by an id.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::InvalidFilter`] when the creation window is
    /// inverted.
    pub fn predicate(&self, id_before: Option<i64>) -> Result<Predicate> {
        self.created.validate()?;

        let mut clauses = Vec::new();
        if let Some(status) = non_empty(self.status.as_ref()) {
            clauses.push(Clause::Contains(Column::Status, status.to_string()));
        }
        if let Some(priority) = non_empty(self.priority.as_ref()) {
            clauses.push(Clause::Equals(Column::Priority, priority.into()));
        }
        if let Some(category) = non_empty(self.category.as_ref()) {
            clauses.push(Clause::Equals(Column::Category, category.into()));
        }
        if let Some(number) = non_empty(self.number.as_ref()) {
            clauses.push(Clause::Equals(Column::Number, number.into()));
        }
        if let Some(requester) = non_empty(self.requester_id.as_ref()) {
            clauses.push(Clause::Equals(Column::RequesterId, requester.into()));
        }
        if let Some(id) = self.id.filter(|id| *id != 0) {
            clauses.push(Clause::Equals(Column::Id, Value::Int(id)));
        }
        self.created.push_clauses(&mut clauses);
        if let Some(id) = id_before {
            clauses.push(Clause::Before(Column::Id, id));
        }

        Ok(Predicate { clauses })
    }
}

/// A page request from the list API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    #[serde(flatten)]
    pub filter: TicketFilter,
    pub page_size: i64,
    pub page_token: Option<String>,
}

impl ListQuery {
    /// Effective number of rows this request may return.
    #[must_use]
    pub fn effective_page_size(&self) -> u32 {
        resolve_page_size(self.page_size)
    }

    /// Resolve filters, page token and page size into one bounded plan.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::InvalidCursor`] when the page token does not
    /// decode, or [`HelpdeskError::InvalidFilter`] for an inverted window.
    pub fn plan(&self) -> Result<QueryPlan> {
        let id_before = match non_empty(self.page_token.as_ref()) {
            Some(token) => Some(cursor::decode(token)?.id),
            None => None,
        };
        Ok(QueryPlan {
            predicate: self.filter.predicate(id_before)?,
            limit: self.effective_page_size(),
        })
    }
}

/// An export request: list filters without paging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportQuery {
    #[serde(flatten)]
    pub filter: TicketFilter,
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Columns of the report view a predicate may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Number,
    Category,
    Priority,
    Status,
    RequesterId,
    SupporterName,
    CreatedAt,
}

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Text(String),
    Time(DateTime<Utc>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A single restriction on the result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Equals(Column, Value),
    Contains(Column, String),
    AtMost(Column, DateTime<Utc>),
    AtLeast(Column, DateTime<Utc>),
    /// Strictly less than; the keyset bound.
    Before(Column, i64),
}

/// Conjunction of clauses. An empty predicate matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    pub clauses: Vec<Clause>,
}

impl Predicate {
    /// Same predicate with its keyset bound replaced by `id < id_before`.
    #[must_use]
    pub fn with_id_before(&self, id_before: Option<i64>) -> Self {
        let mut clauses: Vec<Clause> = self
            .clauses
            .iter()
            .filter(|clause| !matches!(clause, Clause::Before(Column::Id, _)))
            .cloned()
            .collect();
        if let Some(id) = id_before {
            clauses.push(Clause::Before(Column::Id, id));
        }
        Self { clauses }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// A predicate plus the row limit, ordered by identifier descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub predicate: Predicate,
    pub limit: u32,
}

// ---------------------------------------------------------------------------
// Filter value parsing
// ---------------------------------------------------------------------------

/// Parse a filter timestamp: RFC 3339, or `YYYY-MM-DD` meaning midnight UTC.
///
/// # Errors
///
/// Returns [`HelpdeskError::InvalidFilter`] naming `field` when the value is
/// neither form.
pub fn parse_filter_time(field: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            HelpdeskError::invalid_filter(
                field,
                format!("'{raw}' is not an RFC 3339 timestamp or YYYY-MM-DD date"),
            )
        })
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}
