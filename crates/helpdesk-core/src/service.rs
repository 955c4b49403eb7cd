//! Operation-level entry points shared by every adapter.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Span, error, info};

use crate::cancel::CancelToken;
use crate::config::ExportConfig;
use crate::cursor::{self, Cursor};
use crate::error::Result;
use crate::export::{ExportFile, ExportOutcome, ExportPipeline};
use crate::model::TicketRecord;
use crate::query::{CreatedRange, ExportQuery, ListQuery};
use crate::report::ReportSet;
use crate::store::TicketStore;

/// One page of the ticket list.
///
/// `next_page_token` is empty on the last page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPage {
    pub tickets: Vec<TicketRecord>,
    pub next_page_token: String,
}

impl TicketPage {
    #[must_use]
    pub fn has_more(&self) -> bool {
        !self.next_page_token.is_empty()
    }
}

/// List, export and report operations over one store.
///
/// Every operation logs inside the span supplied at construction.
pub struct HelpdeskService<S> {
    store: S,
    export: ExportConfig,
    span: Span,
}

impl<S: TicketStore> HelpdeskService<S> {
    pub const fn new(store: S, export: ExportConfig, span: Span) -> Self {
        Self {
            store,
            export,
            span,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Fetch one page, newest first.
    ///
    /// A full page always carries a next token, so the caller may see one
    /// final empty page when the row count is a multiple of the page size.
    ///
    /// # Errors
    ///
    /// `InvalidCursor` for a foreign page token, `InvalidFilter` for an
    /// inverted window, `QueryError`/`NotFound` from the store.
    pub fn list_tickets(&self, query: &ListQuery) -> Result<TicketPage> {
        let _entered = self.span.enter();

        let plan = query.plan().inspect_err(|err| {
            info!(kind = %err.kind(), error = %err, "rejected list query");
        })?;
        let limit = plan.limit;
        let tickets = self.store.fetch_page(&plan).inspect_err(|err| {
            error!(kind = %err.kind(), error = %err, "ticket page query failed");
        })?;

        let next_page_token = match tickets.last() {
            Some(last) if tickets.len() == limit as usize => {
                cursor::encode(&Cursor::new(last.id, last.created_at))
            }
            _ => String::new(),
        };
        info!(
            returned = tickets.len(),
            limit,
            has_more = !next_page_token.is_empty(),
            "listed tickets"
        );

        Ok(TicketPage {
            tickets,
            next_page_token,
        })
    }

    /// Build the xlsx export. `now` fills an open upper bound in the header.
    ///
    /// # Errors
    ///
    /// `InvalidFilter`, `QueryError`, `ConcurrencyError`, `ExportError` or
    /// `Cancelled`; never a partial file.
    pub fn export_tickets(
        &self,
        query: &ExportQuery,
        cancel: &CancelToken,
        now: DateTime<Utc>,
    ) -> Result<ExportFile> {
        let _entered = self.span.enter();
        info!(
            batch_size = self.export.batch_size,
            workers = self.export.workers,
            queue_depth = self.export.queue_depth,
            "export started"
        );

        let file = ExportPipeline::new(&self.store, &self.export, cancel)
            .run(&query.filter, now.date_naive())
            .and_then(ExportOutcome::into_file)
            .inspect_err(|err| {
                error!(kind = %err.kind(), error = %err, "export failed");
            })?;

        info!(
            batches = file.stats.batches,
            fetches = file.stats.fetches,
            rows = file.stats.detail_rows,
            bytes = file.bytes.len(),
            "export finished"
        );
        Ok(file)
    }

    /// The three summary reports for a creation window.
    ///
    /// # Errors
    ///
    /// `InvalidFilter` for an inverted window, `QueryError` from the store.
    pub fn reports(&self, range: &CreatedRange) -> Result<ReportSet> {
        let _entered = self.span.enter();
        range.validate()?;
        let reports = ReportSet::collect(&self.store, range).inspect_err(|err| {
            error!(kind = %err.kind(), error = %err, "summary reports failed");
        })?;
        info!(
            categories = reports.categories.len(),
            supporters = reports.supporters.len(),
            priorities = reports.priorities.len(),
            "summary reports built"
        );
        Ok(reports)
    }
}
