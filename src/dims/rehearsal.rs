// src/dims/rehearsal.rs

use std::collections::HashSet;
use tracing::warn;

use crate::raw::{values::normalize_date, RehearsalColumn};
use crate::table::{Cell, TableRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimRehearsal {
    /// `YYYY-MM-DD`, or the column label when it is not a date.
    pub rehearsal_date: String,
    pub column_label: String,
}

impl TableRow for DimRehearsal {
    const TAB: &'static str = "dim_rehearsal";
    const HEADER: &'static [&'static str] = &["rehearsal_date", "column_label"];

    fn to_cells(&self) -> Vec<Cell> {
        vec![Cell::from(&self.rehearsal_date), Cell::from(&self.column_label)]
    }
}

/// One rehearsal per date column, first column wins. Also returns the rehearsal
/// key of every column so repeated columns fold onto the same date.
pub fn build_rehearsals(columns: &[RehearsalColumn]) -> (Vec<DimRehearsal>, Vec<String>) {
    let mut rehearsals = Vec::new();
    let mut keys = Vec::with_capacity(columns.len());
    let mut seen = HashSet::new();

    for column in columns {
        let date = normalize_date(&column.label).unwrap_or_else(|| {
            warn!(label = %column.label, "rehearsal column label is not a date; using it verbatim");
            column.label.clone()
        });
        if seen.insert(date.clone()) {
            rehearsals.push(DimRehearsal {
                rehearsal_date: date.clone(),
                column_label: column.label.clone(),
            });
        } else {
            warn!(label = %column.label, rehearsal_date = %date, "duplicate rehearsal column; keeping the first");
        }
        keys.push(date);
    }

    (rehearsals, keys)
}
