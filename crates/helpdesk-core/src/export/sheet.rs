//! In-memory workbook shared by concurrent row writers.
//!
//! Sheets are declared once, when the [`ExportDocument`] is built; afterwards
//! the document is only reachable through `&self`, so no writer can add or
//! rename a sheet. Writers own disjoint [`RowRange`]s handed out by a single
//! [`RowSequencer`] and insert a whole range under one short lock, so a
//! range is either fully present or absent.
//!
//! Row numbers are 1-based, as spreadsheet applications display them.

use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::layout::{DETAIL_SHEET, SUMMARY_SHEET};
use crate::error::{HelpdeskError, Result};

/// A single cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Empty,
    Text(String),
    /// Column or table heading, rendered bold on a shaded fill.
    Header(String),
    Number(u64),
}

impl CellValue {
    /// Text content, if any, for assertions and previews.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Header(text) => Some(text),
            Self::Empty | Self::Number(_) => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u64> for CellValue {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

pub type Row = Vec<CellValue>;

/// A contiguous block of rows `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: u32,
    pub len: u32,
}

impl RowRange {
    #[must_use]
    pub const fn single(row: u32) -> Self {
        Self { start: row, len: 1 }
    }

    /// One past the last row.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.start + self.len
    }
}

/// Hands out consecutive, non-overlapping row ranges.
///
/// Owned by exactly one thread; the offset advances before the range is
/// handed to a writer.
#[derive(Debug)]
pub struct RowSequencer {
    next: u32,
}

impl RowSequencer {
    #[must_use]
    pub const fn starting_at(row: u32) -> Self {
        Self { next: row }
    }

    /// Reserve the next `len` rows.
    ///
    /// # Errors
    ///
    /// Returns `ExportError` once the sheet would exceed `u32` rows.
    pub fn take(&mut self, len: usize) -> Result<RowRange> {
        let len = u32::try_from(len)
            .map_err(|_| HelpdeskError::Export(format!("batch of {len} rows is too large")))?;
        let end = self
            .next
            .checked_add(len)
            .ok_or_else(|| HelpdeskError::Export("sheet row limit exceeded".to_string()))?;
        let range = RowRange {
            start: self.next,
            len,
        };
        self.next = end;
        Ok(range)
    }

    #[must_use]
    pub const fn next_row(&self) -> u32 {
        self.next
    }
}

/// One worksheet.
#[derive(Debug)]
pub struct Sheet {
    name: &'static str,
    rows: Mutex<BTreeMap<u32, Row>>,
}

impl Sheet {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: Mutex::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<u32, Row>>> {
        self.rows.lock().map_err(|_| HelpdeskError::Concurrency {
            task: format!("sheet '{}'", self.name),
            reason: "a writer panicked while holding the sheet".to_string(),
        })
    }

    /// Insert `rows` into `range` as one unit.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrencyError` if the range starts before row 1 or runs
    /// past the last row, if the row count does not match the range, or if
    /// any row in the range is already populated; nothing is written in that
    /// case.
    pub fn write_rows(&self, range: RowRange, rows: Vec<Row>) -> Result<()> {
        if range.start == 0 || range.start.checked_add(range.len).is_none() {
            return Err(HelpdeskError::Concurrency {
                task: format!("sheet '{}' rows from {}", self.name, range.start),
                reason: format!("{} rows from row {} are outside the sheet", range.len, range.start),
            });
        }
        if rows.len() != range.len as usize {
            return Err(HelpdeskError::Concurrency {
                task: format!("sheet '{}' rows {}..{}", self.name, range.start, range.end()),
                reason: format!("range holds {} rows but {} were supplied", range.len, rows.len()),
            });
        }

        let mut sheet = self.lock()?;
        if let Some((taken, _)) = sheet.range(range.start..range.end()).next() {
            return Err(HelpdeskError::Concurrency {
                task: format!("sheet '{}' rows {}..{}", self.name, range.start, range.end()),
                reason: format!("row {taken} is already populated"),
            });
        }
        for (row, cells) in (range.start..).zip(rows) {
            sheet.insert(row, cells);
        }
        Ok(())
    }

    /// Copy of one row.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrencyError` if a writer poisoned the sheet.
    pub fn row(&self, row: u32) -> Result<Option<Row>> {
        Ok(self.lock()?.get(&row).cloned())
    }

    /// Populated row numbers in ascending order.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrencyError` if a writer poisoned the sheet.
    pub fn populated_rows(&self) -> Result<Vec<u32>> {
        Ok(self.lock()?.keys().copied().collect())
    }
}

/// The two-sheet export artifact.
#[derive(Debug)]
pub struct ExportDocument {
    pub detail: Sheet,
    pub summary: Sheet,
}

impl Default for ExportDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportDocument {
    /// Declare both sheets. This is the only place sheets are created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            detail: Sheet::new(DETAIL_SHEET),
            summary: Sheet::new(SUMMARY_SHEET),
        }
    }

    /// Render the document as an xlsx file.
    ///
    /// # Errors
    ///
    /// Returns `ExportError` if the workbook cannot be built or serialized.
    pub fn to_xlsx(&self) -> Result<Vec<u8>> {
        let header = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0x00E0_EBF5));
        let mut workbook = Workbook::new();

        for sheet in [&self.detail, &self.summary] {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet.name()).map_err(xlsx_error)?;

            let rows = sheet.lock()?;
            for (&row, cells) in rows.iter() {
                let row = row.checked_sub(1).ok_or_else(|| {
                    HelpdeskError::Export(format!("sheet '{}' has a row 0", sheet.name()))
                })?;
                for (col, cell) in cells.iter().enumerate() {
                    let col = u16::try_from(col)
                        .map_err(|_| HelpdeskError::Export(format!("column {col} out of range")))?;
                    match cell {
                        CellValue::Empty => {}
                        CellValue::Text(text) => {
                            worksheet
                                .write_string(row, col, text.as_str())
                                .map_err(xlsx_error)?;
                        }
                        CellValue::Header(text) => {
                            worksheet
                                .write_string_with_format(row, col, text.as_str(), &header)
                                .map_err(xlsx_error)?;
                        }
                        CellValue::Number(value) => {
                            #[allow(clippy::cast_precision_loss)]
                            let value = *value as f64;
                            worksheet
                                .write_number(row, col, value)
                                .map_err(xlsx_error)?;
                        }
                    }
                }
            }
        }

        workbook.save_to_buffer().map_err(xlsx_error)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn xlsx_error(error: XlsxError) -> HelpdeskError {
    HelpdeskError::Export(error.to_string())
}
