// src/facts/song_time.rs

use anyhow::Result;
use std::collections::HashSet;
use tracing::warn;

use crate::dims::Dimensions;
use crate::raw::{values::parse_number, RawRecord, RawSheet};
use crate::table::{number_or_zero, Cell, FromRecord, TableRow};

/// Minutes spent on one song at one rehearsal.
#[derive(Debug, Clone, PartialEq)]
pub struct FactSongTime {
    pub rehearsal_date: String,
    pub song_id: String,
    pub minutes_spent: f64,
}

impl TableRow for FactSongTime {
    const TAB: &'static str = "fact_song_time";
    const HEADER: &'static [&'static str] = &["rehearsal_date", "song_id", "minutes_spent"];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(&self.rehearsal_date),
            Cell::from(&self.song_id),
            Cell::from(self.minutes_spent),
        ]
    }
}

impl FromRecord for FactSongTime {
    fn from_record(record: &RawRecord<'_>) -> Result<Self> {
        Ok(Self {
            rehearsal_date: record.get("rehearsal_date"),
            song_id: record.get("song_id"),
            minutes_spent: number_or_zero(record, "minutes_spent"),
        })
    }
}

/// Unpivot song rows × date columns. Sparse: only cells holding a number.
/// When several columns fold onto one date, the first numeric cell wins.
pub fn build_fact_song_time(sheet: &RawSheet, dims: &Dimensions) -> Vec<FactSongTime> {
    let mut facts = Vec::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for (entry, id) in sheet.songs.iter().zip(&dims.song_of_entry) {
        let Some(song_id) = id else { continue };
        for (cell, date) in entry.cells.iter().zip(&dims.rehearsal_of_column) {
            if let Some(minutes_spent) = parse_number(cell) {
                if !seen.insert((song_id.as_str(), date.as_str())) {
                    warn!(
                        song_id = %song_id,
                        rehearsal_date = %date,
                        "duplicate song time cell; keeping the first"
                    );
                    continue;
                }
                facts.push(FactSongTime {
                    rehearsal_date: date.clone(),
                    song_id: song_id.clone(),
                    minutes_spent,
                });
            }
        }
    }
    facts
}
