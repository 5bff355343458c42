// src/sheets/writer.rs

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use super::{A1Range, SheetsApi};
use crate::error::EtlError;
use crate::table::{to_grid, Cell, TableRow};

/// Full-overwrite writes into one spreadsheet.
pub struct SheetWriter<'a, S: SheetsApi + ?Sized> {
    api: &'a S,
    spreadsheet_id: &'a str,
}

impl<'a, S: SheetsApi + ?Sized> SheetWriter<'a, S> {
    pub fn new(api: &'a S, spreadsheet_id: &'a str) -> Self {
        Self { api, spreadsheet_id }
    }

    /// Create the tab unless it already exists.
    pub async fn ensure_tab(&self, title: &str) -> Result<()> {
        let titles = self.api.sheet_titles(self.spreadsheet_id).await?;
        if titles.iter().any(|t| t == title) {
            return Ok(());
        }
        self.api
            .add_sheet(self.spreadsheet_id, title)
            .await
            .with_context(|| format!("creating tab {}", title))?;
        info!(tab = title, "created worksheet");
        Ok(())
    }

    /// Replace everything inside `range` with `rows`, creating the tab if needed.
    #[instrument(level = "debug", skip(self, rows), fields(rows = rows.len()))]
    pub async fn overwrite(&self, range: &str, rows: &[Vec<Cell>]) -> Result<()> {
        let parsed: A1Range = range.parse()?;
        self.ensure_tab(&parsed.tab).await?;

        let write = async {
            self.api.clear_values(self.spreadsheet_id, range).await?;
            if !rows.is_empty() {
                self.api.update_values(self.spreadsheet_id, range, rows).await?;
            }
            Ok::<_, anyhow::Error>(())
        };
        write.await.map_err(|e| -> anyhow::Error {
            match e.downcast::<EtlError>() {
                Ok(etl @ EtlError::Connection(_)) => etl.into(),
                Ok(other) => EtlError::Write {
                    range: range.to_string(),
                    reason: other.to_string(),
                }
                .into(),
                Err(e) => EtlError::Write {
                    range: range.to_string(),
                    reason: format!("{:#}", e),
                }
                .into(),
            }
        })?;
        debug!(range, "overwrote range");
        Ok(())
    }

    /// Header plus rows into the table's own tab, over columns `A..` only.
    /// Returns the number of data rows written.
    pub async fn write_table<R: TableRow>(&self, rows: &[R]) -> Result<usize> {
        let range = A1Range::columns(R::TAB, R::HEADER.len()).to_string();
        self.overwrite(&range, &to_grid(rows)).await?;
        info!(tab = R::TAB, rows = rows.len(), "wrote table");
        Ok(rows.len())
    }

    /// Append rows below the last used row of `range`.
    pub async fn append(&self, range: &str, rows: &[Vec<Cell>]) -> Result<()> {
        self.api
            .append_values(self.spreadsheet_id, range, rows)
            .await
            .map_err(|e| {
                EtlError::Write {
                    range: range.to_string(),
                    reason: format!("{:#}", e),
                }
                .into()
            })
    }

    pub async fn read(&self, range: &str) -> Result<Vec<Vec<String>>> {
        self.api.get_values(self.spreadsheet_id, range).await
    }
}
