// src/table.rs

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;

use crate::raw::{values::parse_number, RawRecord, RawTable};

/// A value written to a sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn empty() -> Self {
        Cell::Text(String::new())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            // f64 Display already prints 2.0 as "2"
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<&String> for Cell {
    fn from(s: &String) -> Self {
        Cell::Text(s.clone())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<u8> for Cell {
    fn from(n: u8) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<Option<f64>> for Cell {
    fn from(n: Option<f64>) -> Self {
        n.map(Cell::Number).unwrap_or_else(Cell::empty)
    }
}

/// A row type that owns a destination tab.
pub trait TableRow {
    /// Tab the table is written to.
    const TAB: &'static str;
    /// Header row, in column order.
    const HEADER: &'static [&'static str];
    /// Cells in `HEADER` order.
    fn to_cells(&self) -> Vec<Cell>;
}

/// A row type that can be read back from its own tab.
pub trait FromRecord: TableRow + Sized {
    fn from_record(record: &RawRecord<'_>) -> Result<Self>;
}

/// Header row followed by every data row.
pub fn to_grid<R: TableRow>(rows: &[R]) -> Vec<Vec<Cell>> {
    let mut grid = Vec::with_capacity(rows.len() + 1);
    grid.push(R::HEADER.iter().map(|h| Cell::from(*h)).collect());
    grid.extend(rows.iter().map(|r| r.to_cells()));
    grid
}

/// Parse a tab previously written with `to_grid`.
pub fn read_table<R: FromRecord>(values: Vec<Vec<String>>) -> Result<Vec<R>> {
    let table = RawTable::from_values(values);
    table.require_columns(R::TAB, R::HEADER)?;
    table
        .records()
        .filter(|r| R::HEADER.iter().any(|h| !r.get(h).is_empty()))
        .map(|r| R::from_record(&r).with_context(|| format!("{} row {}", R::TAB, r.line)))
        .collect()
}

/// Numeric cell; empty reads as zero.
pub fn number_or_zero(record: &RawRecord<'_>, column: &str) -> f64 {
    parse_number(&record.get(column)).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        key: String,
        value: f64,
    }

    impl TableRow for Pair {
        const TAB: &'static str = "pairs";
        const HEADER: &'static [&'static str] = &["key", "value"];

        fn to_cells(&self) -> Vec<Cell> {
            vec![Cell::from(&self.key), Cell::from(self.value)]
        }
    }

    impl FromRecord for Pair {
        fn from_record(record: &RawRecord<'_>) -> Result<Self> {
            Ok(Pair {
                key: record.get("key"),
                value: number_or_zero(record, "value"),
            })
        }
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(Cell::from(2.0).to_string(), "2");
        assert_eq!(Cell::from(1.5).to_string(), "1.5");
        assert_eq!(Cell::from(None::<f64>).to_string(), "");
        assert_eq!(serde_json::to_string(&Cell::from(3usize)).unwrap(), "3.0");
        assert_eq!(serde_json::to_string(&Cell::from("x")).unwrap(), "\"x\"");
    }

    #[test]
    fn grid_starts_with_header() {
        let rows = vec![Pair { key: "a".into(), value: 1.0 }];
        let grid = to_grid(&rows);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0], vec![Cell::from("key"), Cell::from("value")]);
        assert_eq!(grid[1][1], Cell::Number(1.0));
    }

    #[test]
    fn read_back_skips_blank_rows_and_checks_header() {
        let values = vec![
            vec!["key".to_string(), "value".to_string()],
            vec!["a".to_string(), "1,5".to_string()],
            vec![],
            vec!["b".to_string()],
        ];
        let rows: Vec<Pair> = read_table(values).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, 1.5);
        assert_eq!(rows[1].key, "b");
        assert_eq!(rows[1].value, 0.0);

        let bad = vec![vec!["key".to_string()]];
        assert!(read_table::<Pair>(bad).is_err());
    }
}
