//! Two-sheet xlsx export of the filtered ticket set plus summary tables.

pub mod layout;
pub mod pipeline;
pub mod sheet;

use serde::Serialize;

pub use pipeline::{ExportOutcome, ExportPipeline, ExportStats};
pub use sheet::{CellValue, ExportDocument, RowRange, Sheet};

use crate::error::Result;

pub const CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const FILENAME: &str = "help-desk-tickets.xlsx";

/// A finished export ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: &'static str,
    pub stats: ExportStats,
}

impl ExportFile {
    /// `attachment; filename="help-desk-tickets.xlsx"`
    #[must_use]
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

impl ExportOutcome {
    /// Serialize the document.
    ///
    /// # Errors
    ///
    /// Returns `ExportError` if the workbook cannot be rendered.
    pub fn into_file(self) -> Result<ExportFile> {
        Ok(ExportFile {
            bytes: self.document.to_xlsx()?,
            content_type: CONTENT_TYPE,
            filename: FILENAME,
            stats: self.stats,
        })
    }
}
