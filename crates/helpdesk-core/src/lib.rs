//! helpdesk-core library.
//!
//! Read-only access to the help desk ticket report view: filtered keyset
//! pagination, summary reports and a concurrent two-sheet xlsx export.
//!
//! # Conventions
//!
//! - **Errors**: every fallible operation returns [`error::Result`]; the
//!   [`error::ErrorKind`] of a failure is stable across releases.
//! - **Logging**: `tracing` macros only. The service logs inside the span
//!   its caller supplies.

pub mod cancel;
pub mod config;
pub mod cursor;
pub mod db;
pub mod error;
pub mod export;
pub mod model;
pub mod query;
pub mod report;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;

pub use cancel::CancelToken;
pub use config::{ConfigError, HelpdeskConfig, load_config};
pub use error::{ErrorKind, HelpdeskError, Result};
pub use export::ExportFile;
pub use model::{Priority, TicketRecord, TicketStatus};
pub use query::{CreatedRange, ExportQuery, ListQuery, TicketFilter};
pub use report::ReportSet;
pub use service::{HelpdeskService, TicketPage};
pub use store::TicketStore;
