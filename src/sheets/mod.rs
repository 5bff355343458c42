// src/sheets/mod.rs

pub mod a1;
pub mod auth;
pub mod client;
pub mod memory;
pub mod writer;

use anyhow::Result;
use async_trait::async_trait;

use crate::table::Cell;

pub use a1::A1Range;
pub use client::SheetsClient;
pub use memory::MemorySheets;
pub use writer::SheetWriter;

/// The slice of the Sheets v4 API the pipeline needs. Ranges are A1 strings.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Titles of every tab in the spreadsheet; also serves as a reachability check.
    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>>;

    async fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<()>;

    /// Formatted values; trailing empty rows and cells are omitted, like the API does.
    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>>;

    async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<()>;

    /// Write `rows` at the top-left of `range`.
    async fn update_values(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<Cell>]) -> Result<()>;

    /// Write `rows` below the last non-empty row of the table found in `range`.
    async fn append_values(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<Cell>]) -> Result<()>;
}
