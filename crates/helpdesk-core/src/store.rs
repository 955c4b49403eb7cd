//! The read-only seam between the core and whatever holds the tickets.

use crate::error::Result;
use crate::model::TicketRecord;
use crate::query::{Column, CreatedRange, QueryPlan};

/// A group-count request: rows grouped by `group_by`, each row falling into
/// the first bucket whose column value is listed, or the trailing "other"
/// bucket when none match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarySpec {
    pub group_by: Column,
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub column: Column,
    pub values: Vec<String>,
}

impl Bucket {
    pub fn new<I, S>(column: Column, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// One group of a summary. `counts` has one entry per bucket plus the
/// trailing "other" bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub name: String,
    pub counts: Vec<u64>,
}

/// Read access to the ticket report view.
///
/// Implementations never mutate the backing store.
pub trait TicketStore {
    /// Run one bounded query, newest identifier first.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` for execution or scan failures and `NotFound` only
    /// when the store signals an explicit not-found condition. An empty page
    /// is `Ok(vec![])`.
    fn fetch_page(&self, plan: &QueryPlan) -> Result<Vec<TicketRecord>>;

    /// Group-count tickets created inside `range`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` when the grouping query fails.
    fn summarize(&self, spec: &SummarySpec, range: &CreatedRange) -> Result<Vec<SummaryRow>>;
}

impl<S: TicketStore + ?Sized> TicketStore for &S {
    fn fetch_page(&self, plan: &QueryPlan) -> Result<Vec<TicketRecord>> {
        (**self).fetch_page(plan)
    }

    fn summarize(&self, spec: &SummarySpec, range: &CreatedRange) -> Result<Vec<SummaryRow>> {
        (**self).summarize(spec, range)
    }
}
