//! Summary reports over the ticket view.
//!
//! Three independent grouping queries, each restricted only by the creation
//! window:
//!
//! - category: in progress / resolved / other status, per category
//! - supporter: the same status buckets, per supporter display name
//! - priority: high / medium / low / other priority, per **category**
//!
//! Groups are sorted by name and an empty name is shown as [`BLANK_GROUP`].
//! Every total is the sum of its buckets.

use serde::Serialize;

use crate::error::Result;
use crate::model::TicketStatus;
use crate::query::{Column, CreatedRange};
use crate::store::{Bucket, SummaryRow, SummarySpec, TicketStore};

/// Placeholder shown for an empty group name.
pub const BLANK_GROUP: &str = "(Blank)";

/// Status breakdown for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReport {
    pub name: String,
    pub in_progress: u64,
    pub resolved: u64,
    pub blank: u64,
    pub total: u64,
}

/// Status breakdown for one supporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupporterReport {
    pub name: String,
    pub in_progress: u64,
    pub resolved: u64,
    pub blank: u64,
    pub total: u64,
}

/// Priority breakdown for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityReport {
    pub name: String,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub blank: u64,
    pub total: u64,
}

/// Common view over the three report row shapes.
pub trait ReportRow {
    fn name(&self) -> &str;
    fn buckets(&self) -> Vec<u64>;
    fn total(&self) -> u64;
}

impl ReportRow for CategoryReport {
    fn name(&self) -> &str {
        &self.name
    }
    fn buckets(&self) -> Vec<u64> {
        vec![self.in_progress, self.resolved, self.blank]
    }
    fn total(&self) -> u64 {
        self.total
    }
}

impl ReportRow for SupporterReport {
    fn name(&self) -> &str {
        &self.name
    }
    fn buckets(&self) -> Vec<u64> {
        vec![self.in_progress, self.resolved, self.blank]
    }
    fn total(&self) -> u64 {
        self.total
    }
}

impl ReportRow for PriorityReport {
    fn name(&self) -> &str {
        &self.name
    }
    fn buckets(&self) -> Vec<u64> {
        vec![self.high, self.medium, self.low, self.blank]
    }
    fn total(&self) -> u64 {
        self.total
    }
}

fn status_spec(group_by: Column) -> SummarySpec {
    SummarySpec {
        group_by,
        buckets: vec![
            Bucket::new(Column::Status, TicketStatus::InProgress.raw_values()),
            Bucket::new(Column::Status, TicketStatus::Resolved.raw_values()),
        ],
    }
}

fn priority_spec() -> SummarySpec {
    SummarySpec {
        group_by: Column::Category,
        buckets: vec![
            Bucket::new(Column::Priority, ["HIGH"]),
            Bucket::new(Column::Priority, ["MEDIUM"]),
            Bucket::new(Column::Priority, ["LOW"]),
        ],
    }
}

/// Sort by raw name, then swap empty names for the placeholder.
///
/// Empty and whitespace-only names collapse into one placeholder group, kept
/// at the position of the first of them.
fn normalized(mut rows: Vec<SummaryRow>, width: usize) -> Vec<(String, Vec<u64>)> {
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    let mut groups: Vec<(String, Vec<u64>)> = Vec::with_capacity(rows.len());
    let mut blank: Option<usize> = None;
    for row in rows {
        let mut counts = row.counts;
        counts.resize(width, 0);
        if !row.name.trim().is_empty() {
            groups.push((row.name, counts));
            continue;
        }
        match blank.and_then(|index| groups.get_mut(index)) {
            Some((_, merged)) => {
                for (total, count) in merged.iter_mut().zip(counts) {
                    *total += count;
                }
            }
            None => {
                blank = Some(groups.len());
                groups.push((BLANK_GROUP.to_string(), counts));
            }
        }
    }
    groups
}

/// Per-category status report.
///
/// # Errors
///
/// Propagates the store's `QueryError`.
pub fn category_report<S: TicketStore + ?Sized>(
    store: &S,
    range: &CreatedRange,
) -> Result<Vec<CategoryReport>> {
    let rows = store.summarize(&status_spec(Column::Category), range)?;
    Ok(normalized(rows, 3)
        .into_iter()
        .map(|(name, c)| CategoryReport {
            name,
            in_progress: c[0],
            resolved: c[1],
            blank: c[2],
            total: c.iter().sum(),
        })
        .collect())
}

/// Per-supporter status report.
///
/// # Errors
///
/// Propagates the store's `QueryError`.
pub fn supporter_report<S: TicketStore + ?Sized>(
    store: &S,
    range: &CreatedRange,
) -> Result<Vec<SupporterReport>> {
    let rows = store.summarize(&status_spec(Column::SupporterName), range)?;
    Ok(normalized(rows, 3)
        .into_iter()
        .map(|(name, c)| SupporterReport {
            name,
            in_progress: c[0],
            resolved: c[1],
            blank: c[2],
            total: c.iter().sum(),
        })
        .collect())
}

/// Per-category priority report.
///
/// # Errors
///
/// Propagates the store's `QueryError`.
pub fn priority_report<S: TicketStore + ?Sized>(
    store: &S,
    range: &CreatedRange,
) -> Result<Vec<PriorityReport>> {
    let rows = store.summarize(&priority_spec(), range)?;
    Ok(normalized(rows, 4)
        .into_iter()
        .map(|(name, c)| PriorityReport {
            name,
            high: c[0],
            medium: c[1],
            low: c[2],
            blank: c[3],
            total: c.iter().sum(),
        })
        .collect())
}

/// All three reports for one creation window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSet {
    pub categories: Vec<CategoryReport>,
    pub supporters: Vec<SupporterReport>,
    pub priorities: Vec<PriorityReport>,
}

impl ReportSet {
    /// Run the three builders. They share no data, so order is irrelevant;
    /// the first failure aborts the set.
    ///
    /// # Errors
    ///
    /// Propagates the first builder error.
    pub fn collect<S: TicketStore + ?Sized>(store: &S, range: &CreatedRange) -> Result<Self> {
        Ok(Self {
            categories: category_report(store, range)?,
            supporters: supporter_report(store, range)?,
            priorities: priority_report(store, range)?,
        })
    }
}
