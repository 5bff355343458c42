// src/sheets/memory.rs

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{A1Range, SheetsApi};
use crate::error::EtlError;
use crate::table::Cell;

#[derive(Debug, Default)]
struct Tab {
    title: String,
    cells: Vec<Vec<String>>,
}

impl Tab {
    fn set(&mut self, row: usize, col: usize, value: String) {
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let line = &mut self.cells[row];
        if line.len() <= col {
            line.resize(col + 1, String::new());
        }
        line[col] = value;
    }

    /// Last row index at or after `range.start_row` with a value inside the range's columns.
    fn last_used_row(&self, range: &A1Range) -> Option<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(r, line)| {
                *r >= range.start_row
                    && line
                        .iter()
                        .enumerate()
                        .any(|(c, v)| !v.is_empty() && range.contains(*r, c))
            })
            .map(|(r, _)| r)
            .last()
    }
}

#[derive(Debug, Default)]
struct Book {
    tabs: Vec<Tab>,
}

impl Book {
    fn tab_mut(&mut self, title: &str) -> Result<&mut Tab> {
        self.tabs
            .iter_mut()
            .find(|t| t.title == title)
            .ok_or_else(|| anyhow!("Unable to parse range: no tab named {:?}", title))
    }
}

/// In-memory spreadsheets with the same range semantics as the Sheets API.
/// Backs the pipeline tests; writes to a tab can be made to fail on purpose.
#[derive(Debug, Default)]
pub struct MemorySheets {
    books: Mutex<HashMap<String, Book>>,
    failing_tabs: Mutex<HashSet<String>>,
}

fn trim_grid(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    for row in rows.iter_mut() {
        while row.last().map_or(false, |v| v.is_empty()) {
            row.pop();
        }
    }
    while rows.last().map_or(false, |r| r.is_empty()) {
        rows.pop();
    }
    rows
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty spreadsheet.
    pub fn add_spreadsheet(&self, spreadsheet_id: &str) {
        if let Ok(mut books) = self.books.lock() {
            books.entry(spreadsheet_id.to_string()).or_default();
        }
    }

    /// Replace a tab's content, creating spreadsheet and tab as needed.
    pub fn seed(&self, spreadsheet_id: &str, title: &str, rows: Vec<Vec<String>>) {
        if let Ok(mut books) = self.books.lock() {
            let book = books.entry(spreadsheet_id.to_string()).or_default();
            match book.tabs.iter_mut().find(|t| t.title == title) {
                Some(tab) => tab.cells = rows,
                None => book.tabs.push(Tab {
                    title: title.to_string(),
                    cells: rows,
                }),
            }
        }
    }

    /// Make every later write to `title` fail.
    pub fn fail_writes_to(&self, title: &str) {
        if let Ok(mut failing) = self.failing_tabs.lock() {
            failing.insert(title.to_string());
        }
    }

    /// Trimmed content of a tab, `None` if the tab does not exist.
    pub fn tab_values(&self, spreadsheet_id: &str, title: &str) -> Option<Vec<Vec<String>>> {
        let books = self.books.lock().ok()?;
        let tab = books.get(spreadsheet_id)?.tabs.iter().find(|t| t.title == title)?;
        Some(trim_grid(tab.cells.clone()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Book>>> {
        self.books
            .lock()
            .map_err(|_| anyhow!("memory sheets lock poisoned"))
    }

    fn check_writable(&self, range: &A1Range) -> Result<()> {
        let failing = self
            .failing_tabs
            .lock()
            .map_err(|_| anyhow!("memory sheets lock poisoned"))?;
        if failing.contains(&range.tab) {
            bail!("simulated write failure on {}", range.tab);
        }
        Ok(())
    }

    fn with_tab<T>(
        &self,
        spreadsheet_id: &str,
        range: &A1Range,
        f: impl FnOnce(&mut Tab) -> Result<T>,
    ) -> Result<T> {
        let mut books = self.lock()?;
        let book = books
            .get_mut(spreadsheet_id)
            .ok_or_else(|| EtlError::Connection(format!("spreadsheet {} not found", spreadsheet_id)))?;
        f(book.tab_mut(&range.tab)?)
    }

    fn write_at(tab: &mut Tab, range: &A1Range, row0: usize, rows: &[Vec<Cell>]) -> Result<()> {
        let height = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if height > 0 {
            if let Some(end) = range.end_row {
                if row0 + height - 1 > end {
                    bail!("requested writing within {} but tried to write {} rows", range, height);
                }
            }
        }
        if width > 0 {
            if let Some(end) = range.end_col {
                if range.start_col + width - 1 > end {
                    bail!("requested writing within {} but tried to write {} columns", range, width);
                }
            }
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                tab.set(row0 + r, range.start_col + c, cell.to_string());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SheetsApi for MemorySheets {
    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>> {
        let books = self.lock()?;
        let book = books
            .get(spreadsheet_id)
            .ok_or_else(|| EtlError::Connection(format!("spreadsheet {} not found", spreadsheet_id)))?;
        Ok(book.tabs.iter().map(|t| t.title.clone()).collect())
    }

    async fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<()> {
        let mut books = self.lock()?;
        let book = books
            .get_mut(spreadsheet_id)
            .ok_or_else(|| EtlError::Connection(format!("spreadsheet {} not found", spreadsheet_id)))?;
        if book.tabs.iter().any(|t| t.title == title) {
            bail!("a sheet with the name {:?} already exists", title);
        }
        book.tabs.push(Tab {
            title: title.to_string(),
            cells: Vec::new(),
        });
        Ok(())
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let range: A1Range = range.parse()?;
        self.with_tab(spreadsheet_id, &range, |tab| {
            let rows: Vec<Vec<String>> = tab
                .cells
                .iter()
                .enumerate()
                .filter(|(r, _)| range.contains(*r, range.start_col))
                .map(|(r, line)| {
                    line.iter()
                        .enumerate()
                        .filter(|(c, _)| range.contains(r, *c))
                        .map(|(_, v)| v.clone())
                        .collect()
                })
                .collect();
            Ok(trim_grid(rows))
        })
    }

    async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<()> {
        let range: A1Range = range.parse()?;
        self.check_writable(&range)?;
        self.with_tab(spreadsheet_id, &range, |tab| {
            for (r, line) in tab.cells.iter_mut().enumerate() {
                for (c, v) in line.iter_mut().enumerate() {
                    if range.contains(r, c) {
                        v.clear();
                    }
                }
            }
            Ok(())
        })
    }

    async fn update_values(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<Cell>]) -> Result<()> {
        let range: A1Range = range.parse()?;
        self.check_writable(&range)?;
        self.with_tab(spreadsheet_id, &range, |tab| {
            Self::write_at(tab, &range, range.start_row, rows)
        })
    }

    async fn append_values(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<Cell>]) -> Result<()> {
        let range: A1Range = range.parse()?;
        self.check_writable(&range)?;
        self.with_tab(spreadsheet_id, &range, |tab| {
            let row0 = tab
                .last_used_row(&range)
                .map_or(range.start_row, |r| r + 1);
            let open = A1Range {
                end_row: None,
                ..range.clone()
            };
            Self::write_at(tab, &open, row0, rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(rows: &[&[&str]]) -> Vec<Vec<Cell>> {
        rows.iter()
            .map(|r| r.iter().map(|c| Cell::from(*c)).collect())
            .collect()
    }

    #[tokio::test]
    async fn update_then_read_back() {
        let sheets = MemorySheets::new();
        sheets.add_spreadsheet("db");
        sheets.add_sheet("db", "t").await.unwrap();

        sheets
            .update_values("db", "t!B2:C3", &cells(&[&["a", "b"], &["c"]]))
            .await
            .unwrap();

        assert_eq!(
            sheets.get_values("db", "t!A1:C3").await.unwrap(),
            vec![vec![], vec!["".to_string(), "a".into(), "b".into()], vec!["".into(), "c".into()]]
        );
        assert_eq!(
            sheets.get_values("db", "t!B2:B").await.unwrap(),
            vec![vec!["a".to_string()], vec!["c".to_string()]]
        );
    }

    #[tokio::test]
    async fn update_must_fit_bounded_range() {
        let sheets = MemorySheets::new();
        sheets.seed("db", "t", vec![]);
        let err = sheets
            .update_values("db", "t!A1:B1", &cells(&[&["a"], &["b"]]))
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn clear_only_touches_the_range() {
        let sheets = MemorySheets::new();
        sheets.seed(
            "db",
            "t",
            vec![
                vec!["a".into(), "b".into(), "c".into()],
                vec!["d".into(), "e".into(), "f".into()],
            ],
        );
        sheets.clear_values("db", "t!A1:B").await.unwrap();
        assert_eq!(
            sheets.tab_values("db", "t").unwrap(),
            vec![
                vec!["".to_string(), "".into(), "c".into()],
                vec!["".into(), "".into(), "f".into()],
            ]
        );
    }

    #[tokio::test]
    async fn append_goes_below_the_last_row() {
        let sheets = MemorySheets::new();
        sheets.seed("db", "log", vec![]);
        sheets
            .append_values("db", "log!A:B", &cells(&[&["h1", "h2"], &["1", "2"]]))
            .await
            .unwrap();
        sheets
            .append_values("db", "log!A:B", &cells(&[&["3", "4"]]))
            .await
            .unwrap();
        assert_eq!(sheets.tab_values("db", "log").unwrap().len(), 3);
        assert_eq!(
            sheets.get_values("db", "log!A3:B3").await.unwrap(),
            vec![vec!["3".to_string(), "4".to_string()]]
        );
    }

    #[tokio::test]
    async fn unknown_tabs_and_spreadsheets_fail() {
        let sheets = MemorySheets::new();
        sheets.add_spreadsheet("db");
        assert!(sheets.get_values("db", "nope!A1").await.is_err());

        let err = sheets.sheet_titles("other").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::Connection(_))
        ));

        sheets.add_sheet("db", "t").await.unwrap();
        assert!(sheets.add_sheet("db", "t").await.is_err());
    }

    #[tokio::test]
    async fn failing_tab_rejects_writes() {
        let sheets = MemorySheets::new();
        sheets.seed("db", "t", vec![]);
        sheets.fail_writes_to("t");
        assert!(sheets.clear_values("db", "t!A1:B").await.is_err());
        assert!(sheets.get_values("db", "t!A1:B").await.is_ok());
    }
}
