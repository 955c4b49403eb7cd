//! `SQLite` rendering of predicates and the [`TicketStore`] implementation.
//!
//! Predicates become a `WHERE` clause with positional parameters; no filter
//! value is ever spliced into SQL text.

use rusqlite::types::{ToSql, Type};
use rusqlite::{Connection, params_from_iter};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::schema::{REPORT_VIEW, TICKET_COLUMNS};
use crate::error::{HelpdeskError, Result};
use crate::model::{Priority, Requester, Supporter, TicketRecord, TicketStatus, normalize_closed_date};
use crate::query::{Clause, Column, CreatedRange, Predicate, QueryPlan, Value};
use crate::store::{SummaryRow, SummarySpec, TicketStore};

const fn column_sql(column: Column) -> &'static str {
    match column {
        Column::Id => "id",
        Column::Number => "number",
        Column::Category => "category",
        Column::Priority => "priority",
        Column::Status => "status",
        Column::RequesterId => "creator_number",
        Column::SupporterName => "supporter_name",
        Column::CreatedAt => "created_at",
    }
}

/// Accumulates conditions and their positional parameters.
#[derive(Default)]
struct SqlParts {
    conditions: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl SqlParts {
    fn bind(&mut self, value: Box<dyn ToSql>) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    fn push_predicate(&mut self, predicate: &Predicate) {
        for clause in &predicate.clauses {
            let condition = match clause {
                Clause::Equals(column, value) => {
                    let placeholder = self.bind(value_param(value));
                    format!("{} = {placeholder}", column_sql(*column))
                }
                Clause::Contains(column, needle) => {
                    let placeholder = self.bind(Box::new(format!("%{}%", escape_like(needle))));
                    format!("{} LIKE {placeholder} ESCAPE '\\'", column_sql(*column))
                }
                Clause::AtMost(column, time) => {
                    let placeholder = self.bind(Box::new(*time));
                    format!("{} <= {placeholder}", column_sql(*column))
                }
                Clause::AtLeast(column, time) => {
                    let placeholder = self.bind(Box::new(*time));
                    format!("{} >= {placeholder}", column_sql(*column))
                }
                Clause::Before(column, id) => {
                    let placeholder = self.bind(Box::new(*id));
                    format!("{} < {placeholder}", column_sql(*column))
                }
            };
            self.conditions.push(condition);
        }
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    fn param_refs(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(AsRef::as_ref).collect()
    }
}

fn value_param(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Int(v) => Box::new(*v),
        Value::Text(v) => Box::new(v.clone()),
        Value::Time(v) => Box::new(*v),
    }
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn page_query(plan: &QueryPlan) -> (String, SqlParts) {
    let mut parts = SqlParts::default();
    parts.push_predicate(&plan.predicate);
    let sql = format!(
        "SELECT {TICKET_COLUMNS} FROM {REPORT_VIEW}{} ORDER BY id DESC LIMIT {}",
        parts.where_clause(),
        plan.limit
    );
    (sql, parts)
}

/// Render the page query for a plan, returning the SQL and its parameter
/// count. Exposed for diagnostics.
#[must_use]
pub fn page_sql(plan: &QueryPlan) -> (String, usize) {
    let (sql, parts) = page_query(plan);
    (sql, parts.params.len())
}

fn row_to_ticket(row: &rusqlite::Row<'_>) -> rusqlite::Result<TicketRecord> {
    let raw_status: String = row.get(4)?;
    let closed_raw: Option<String> = row.get(15)?;
    let closed_date = normalize_closed_date(closed_raw.as_deref())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(15, Type::Text, Box::new(e)))?;

    Ok(TicketRecord {
        id: row.get(0)?,
        number: row.get(1)?,
        category: row.get(2)?,
        priority: Priority::from(row.get::<_, String>(3)?),
        status: TicketStatus::from_raw(&raw_status),
        raw_status,
        title: row.get(5)?,
        description: row.get(6)?,
        requester: Requester {
            id: row.get(7)?,
            display_name: row.get(8)?,
            position: row.get(9)?,
            department: row.get(10)?,
            branch: row.get(11)?,
        },
        supporter: Supporter {
            display_name: row.get(12)?,
            position: row.get(13)?,
        },
        created_at: row.get(14)?,
        closed_date,
    })
}

/// Ticket store backed by a single `SQLite` connection.
///
/// The connection is not shared across threads; the export pipeline only
/// touches the store from its control loop.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl TicketStore for SqliteStore {
    fn fetch_page(&self, plan: &QueryPlan) -> Result<Vec<TicketRecord>> {
        let (sql, parts) = page_query(plan);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| HelpdeskError::query("prepare ticket page query", e))?;
        let rows = stmt
            .query_map(params_from_iter(parts.param_refs()), row_to_ticket)
            .map_err(|e| HelpdeskError::query("execute ticket page query", e))?;

        let mut tickets = Vec::with_capacity(usize::try_from(plan.limit).unwrap_or_default());
        for row in rows {
            tickets.push(row.map_err(|e| HelpdeskError::query("scan ticket row", e))?);
        }
        Ok(tickets)
    }

    fn summarize(&self, spec: &SummarySpec, range: &CreatedRange) -> Result<Vec<SummaryRow>> {
        let mut parts = SqlParts::default();
        let other = spec.buckets.len();

        let mut arms = String::new();
        for (index, bucket) in spec.buckets.iter().enumerate() {
            if bucket.values.is_empty() {
                continue;
            }
            let placeholders = bucket
                .values
                .iter()
                .map(|value| parts.bind(Box::new(value.clone())))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(
                arms,
                " WHEN {} IN ({placeholders}) THEN {index}",
                column_sql(bucket.column)
            );
        }
        let bucket_expr = if arms.is_empty() {
            other.to_string()
        } else {
            format!("CASE{arms} ELSE {other} END")
        };

        parts.push_predicate(&range.predicate());
        let sql = format!(
            "SELECT grp, bucket, COUNT(*) FROM (\
             SELECT COALESCE({group}, '') AS grp, {bucket_expr} AS bucket \
             FROM {REPORT_VIEW}{where_clause}) \
             GROUP BY grp, bucket ORDER BY grp, bucket",
            group = column_sql(spec.group_by),
            where_clause = parts.where_clause(),
        );

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| HelpdeskError::query("prepare summary query", e))?;
        let rows = stmt
            .query_map(params_from_iter(parts.param_refs()), |row| {
                let name: String = row.get(0)?;
                let bucket: i64 = row.get(1)?;
                let count: i64 = row.get(2)?;
                Ok((name, bucket, count))
            })
            .map_err(|e| HelpdeskError::query("execute summary query", e))?;

        let mut groups: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for row in rows {
            let (name, bucket, count) =
                row.map_err(|e| HelpdeskError::query("scan summary row", e))?;
            let slot = usize::try_from(bucket).unwrap_or(other).min(other);
            let counts = groups.entry(name).or_insert_with(|| vec![0; other + 1]);
            counts[slot] += u64::try_from(count).unwrap_or(0);
        }

        Ok(groups
            .into_iter()
            .map(|(name, counts)| SummaryRow { name, counts })
            .collect())
    }
}
