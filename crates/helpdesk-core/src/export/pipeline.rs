//! Concurrent export: one control loop fetches, a bounded pool writes.
//!
//! ```text
//!   control thread                         writer pool (scoped threads)
//!   ──────────────                         ───────────────────────────
//!   reports + headers
//!   table jobs ───────┐
//!   loop {            │   bounded channel   ┌─> writer 0 ─┐
//!     cancel.check()  ├──(queue_depth)──────┼─> writer 1 ─┼─> ExportDocument
//!     fetch page      │                     └─> writer n ─┘   (disjoint ranges)
//!     take RowRange ──┘
//!   }
//!   join, verify, serialize
//! ```
//!
//! Only the control thread touches the store, the keyset cursor and the row
//! sequencer. Each job carries its own immutable [`RowRange`].

use chrono::NaiveDate;
use crossbeam_channel::{Receiver, Sender, bounded};
use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{debug, error, trace};

use super::layout::{self, FIRST_DETAIL_ROW, SummaryLayout};
use super::sheet::{ExportDocument, Row, RowRange, RowSequencer};
use crate::cancel::CancelToken;
use crate::config::ExportConfig;
use crate::error::{HelpdeskError, Result};
use crate::model::TicketRecord;
use crate::query::{Predicate, QueryPlan, TicketFilter};
use crate::report::ReportSet;
use crate::store::TicketStore;

/// Counters for one export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStats {
    /// Non-empty pages dispatched.
    pub batches: usize,
    /// Store round trips, including the terminating empty page.
    pub fetches: usize,
    pub detail_rows: usize,
    pub summary_rows: usize,
}

/// A populated document and how it was built.
#[derive(Debug)]
pub struct ExportOutcome {
    pub document: ExportDocument,
    pub stats: ExportStats,
}

enum WriteJob {
    Table {
        table: &'static str,
        range: RowRange,
        rows: Vec<Row>,
    },
    Detail {
        batch: usize,
        newest: i64,
        oldest: i64,
        range: RowRange,
        tickets: Vec<TicketRecord>,
    },
}

impl WriteJob {
    fn describe(&self) -> String {
        match self {
            Self::Table { table, range, .. } => {
                format!("{table} table rows {}..{}", range.start, range.end())
            }
            Self::Detail {
                batch,
                newest,
                oldest,
                range,
                ..
            } => format!(
                "batch {batch} ids {newest}..={oldest} rows {}..{}",
                range.start,
                range.end()
            ),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Table { rows, .. } => rows.len(),
            Self::Detail { tickets, .. } => tickets.len(),
        }
    }

    fn write(self, document: &ExportDocument) -> Result<()> {
        match self {
            Self::Table { range, rows, .. } => document.summary.write_rows(range, rows),
            Self::Detail { range, tickets, .. } => document
                .detail
                .write_rows(range, tickets.iter().map(layout::ticket_row).collect()),
        }
    }
}

/// Abort flag plus the first failure any writer hit.
#[derive(Default)]
struct Shared {
    abort: AtomicBool,
    failure: Mutex<Option<HelpdeskError>>,
}

impl Shared {
    fn abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    fn aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    fn fail(&self, err: HelpdeskError) {
        self.abort();
        if let Ok(mut slot) = self.failure.lock() {
            slot.get_or_insert(err);
        }
    }

    fn take_failure(&self) -> Option<HelpdeskError> {
        self.failure.lock().ok().and_then(|mut slot| slot.take())
    }
}

fn write_worker(
    worker: usize,
    jobs: &Receiver<WriteJob>,
    document: &ExportDocument,
    shared: &Shared,
) -> usize {
    let mut written = 0;
    for job in jobs {
        // Keep draining after an abort so the control loop never blocks.
        if shared.aborted() {
            continue;
        }
        let task = job.describe();
        let rows = job.len();
        match job.write(document) {
            Ok(()) => {
                written += rows;
                trace!(worker, %task, rows, "write job done");
            }
            Err(err) => {
                error!(worker, %task, error = %err, "write job failed");
                shared.fail(err);
            }
        }
    }
    written
}

/// Every dispatched row must have been written by some worker.
fn verify_written(written: usize, stats: &ExportStats) -> Result<()> {
    let expected = stats.detail_rows + stats.summary_rows;
    if written == expected {
        return Ok(());
    }
    Err(HelpdeskError::Concurrency {
        task: "join writers".to_string(),
        reason: format!("{written} of {expected} rows were written"),
    })
}

/// One export run over a store.
pub struct ExportPipeline<'a, S: TicketStore + ?Sized> {
    store: &'a S,
    config: &'a ExportConfig,
    cancel: &'a CancelToken,
}

impl<'a, S: TicketStore + ?Sized> ExportPipeline<'a, S> {
    pub const fn new(store: &'a S, config: &'a ExportConfig, cancel: &'a CancelToken) -> Self {
        Self {
            store,
            config,
            cancel,
        }
    }

    /// Build the document for `filter`. `today` closes an open date header.
    ///
    /// No partial document is ever returned: the first fetch, write or
    /// cancellation error wins.
    ///
    /// # Errors
    ///
    /// `InvalidFilter` for a bad filter, `QueryError` from the store,
    /// `ConcurrencyError` from a writer, `Cancelled` from the token.
    pub fn run(&self, filter: &TicketFilter, today: NaiveDate) -> Result<ExportOutcome> {
        self.run_into(ExportDocument::new(), filter, today)
    }

    fn run_into(
        &self,
        document: ExportDocument,
        filter: &TicketFilter,
        today: NaiveDate,
    ) -> Result<ExportOutcome> {
        self.cancel.check()?;
        let predicate = filter.predicate(None)?;

        let reports = ReportSet::collect(self.store, &filter.created)?;
        let layout = SummaryLayout::for_reports(&reports)?;
        layout::write_headers(&document, &layout, &filter.created, today)?;

        let workers = self.config.workers.max(1);
        let shared = Shared::default();

        let (dispatched, written) = thread::scope(|scope| {
            let (sender, receiver) = bounded::<WriteJob>(self.config.queue_depth);
            let writers: Vec<_> = (0..workers)
                .map(|worker| {
                    let receiver = receiver.clone();
                    let (document, shared) = (&document, &shared);
                    scope.spawn(move || write_worker(worker, &receiver, document, shared))
                })
                .collect();
            drop(receiver);

            let dispatched = self.dispatch(&sender, &predicate, &reports, &layout, &shared);
            if dispatched.is_err() {
                shared.abort();
            }
            drop(sender);

            let mut written = 0;
            for (worker, handle) in writers.into_iter().enumerate() {
                match handle.join() {
                    Ok(rows) => written += rows,
                    Err(_) => shared.fail(HelpdeskError::Concurrency {
                        task: format!("writer-{worker}"),
                        reason: "writer thread panicked".to_string(),
                    }),
                }
            }
            (dispatched, written)
        });

        let stats = dispatched?;
        if let Some(failure) = shared.take_failure() {
            return Err(failure);
        }
        verify_written(written, &stats)?;

        Ok(ExportOutcome { document, stats })
    }

    fn dispatch(
        &self,
        jobs: &Sender<WriteJob>,
        predicate: &Predicate,
        reports: &ReportSet,
        layout: &SummaryLayout,
        shared: &Shared,
    ) -> Result<ExportStats> {
        let mut stats = ExportStats::default();

        let tables = [
            ("category", layout.category, layout::report_rows(&reports.categories)),
            ("supporter", layout.supporter, layout::report_rows(&reports.supporters)),
            ("priority", layout.priority, layout::report_rows(&reports.priorities)),
        ];
        for (table, header_row, rows) in tables {
            let range = RowSequencer::starting_at(header_row + 1).take(rows.len())?;
            let len = rows.len();
            if jobs.send(WriteJob::Table { table, range, rows }).is_err() {
                return Ok(stats);
            }
            stats.summary_rows += len;
        }

        let batch_size = self.config.batch_size.max(1);
        let mut rows = RowSequencer::starting_at(FIRST_DETAIL_ROW);
        let mut last_id = None;
        loop {
            if shared.aborted() {
                debug!(batches = stats.batches, "writer failed, no further fetches");
                break;
            }
            self.cancel.check()?;

            let plan = QueryPlan {
                predicate: predicate.with_id_before(last_id),
                limit: batch_size,
            };
            let page = self.store.fetch_page(&plan)?;
            stats.fetches += 1;

            let (Some(newest), Some(oldest)) =
                (page.first().map(|t| t.id), page.last().map(|t| t.id))
            else {
                break;
            };
            last_id = Some(oldest);
            let range = rows.take(page.len())?;
            stats.batches += 1;
            debug!(
                batch = stats.batches,
                newest,
                oldest,
                start_row = range.start,
                rows = range.len,
                "dispatching batch"
            );

            let len = page.len();
            let job = WriteJob::Detail {
                batch: stats.batches,
                newest,
                oldest,
                range,
                tickets: page,
            };
            if jobs.send(job).is_err() {
                break;
            }
            stats.detail_rows += len;
        }

        Ok(stats)
    }
}
