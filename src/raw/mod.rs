// src/raw/mod.rs

pub mod layout;
pub mod values;

use anyhow::Result;

use crate::error::EtlError;
use values::clean_str;

pub use layout::{ChoristerEntry, RawSheet, RehearsalColumn, SongEntry};

/// A tab as read from the Sheets API: one header row plus string rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column names from the first row, trimmed.
    pub headers: Vec<String>,
    /// Data rows. Sheets drops trailing empty cells, so rows may be ragged.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Split a values grid into header and rows. An empty grid gives an empty table.
    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut it = values.into_iter();
        let headers = it
            .next()
            .map(|h| h.iter().map(|c| clean_str(c)).collect())
            .unwrap_or_default();
        Self {
            headers,
            rows: it.collect(),
        }
    }

    /// Index of the first column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Fail with a schema mismatch naming every absent column.
    pub fn require_columns(&self, table: &str, names: &[&str]) -> Result<()> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| self.column_index(n).is_none())
            .map(|n| n.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EtlError::SchemaMismatch {
                table: table.to_string(),
                missing,
            }
            .into())
        }
    }

    pub fn records(&self) -> impl Iterator<Item = RawRecord<'_>> {
        self.rows.iter().enumerate().map(move |(i, row)| RawRecord {
            table: self,
            row,
            // 1-based sheet row, header included
            line: i + 2,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One source row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    table: &'a RawTable,
    row: &'a [String],
    pub line: usize,
}

impl<'a> RawRecord<'a> {
    /// Trimmed value under `name`; empty when the column or the cell is absent.
    pub fn get(&self, name: &str) -> String {
        self.table
            .column_index(name)
            .map(|idx| self.cell(idx))
            .unwrap_or_default()
    }

    /// Trimmed value at a column index; empty past the end of a short row.
    pub fn cell(&self, idx: usize) -> String {
        self.row.get(idx).map(|c| clean_str(c)).unwrap_or_default()
    }
}
