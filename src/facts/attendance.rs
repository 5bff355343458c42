// src/facts/attendance.rs

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::dims::{DimChorister, DimRehearsal, Dimensions};
use crate::raw::{values::parse_number, RawRecord, RawSheet};
use crate::table::{number_or_zero, Cell, FromRecord, TableRow};

/// Attendance outcome of one chorister at one rehearsal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    Present,
    Missed,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Missed => "missed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "present" => Some(AttendanceStatus::Present),
            "missed" => Some(AttendanceStatus::Missed),
            _ => None,
        }
    }

    /// Status for a stored row with no status text: positive hours count as present.
    pub fn from_hours(hours: f64) -> Self {
        if hours > 0.0 {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Missed
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactAttendance {
    pub rehearsal_date: String,
    pub chorister_id: String,
    pub hours_attended: f64,
    pub status: AttendanceStatus,
}

impl FactAttendance {
    pub fn missed_flag(&self) -> u8 {
        u8::from(self.status == AttendanceStatus::Missed)
    }
}

impl TableRow for FactAttendance {
    const TAB: &'static str = "fact_attendance";
    const HEADER: &'static [&'static str] = &[
        "rehearsal_date",
        "chorister_id",
        "hours_attended",
        "status",
        "missed_flag",
    ];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(&self.rehearsal_date),
            Cell::from(&self.chorister_id),
            Cell::from(self.hours_attended),
            Cell::from(self.status.as_str()),
            Cell::from(self.missed_flag()),
        ]
    }
}

impl FromRecord for FactAttendance {
    fn from_record(record: &RawRecord<'_>) -> Result<Self> {
        let hours_attended = number_or_zero(record, "hours_attended");
        let raw_status = record.get("status");
        let status = if raw_status.is_empty() {
            AttendanceStatus::from_hours(hours_attended)
        } else {
            AttendanceStatus::from_str(&raw_status)
                .ok_or_else(|| anyhow!("unknown attendance status {:?}", raw_status))?
        };
        Ok(Self {
            rehearsal_date: record.get("rehearsal_date"),
            chorister_id: record.get("chorister_id"),
            hours_attended,
            status,
        })
    }
}

/// A numeric cell seen in the RAW sheet for one chorister at one rehearsal.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub chorister_id: String,
    pub rehearsal_date: String,
    pub hours: f64,
}

/// Collect every numeric chorister × date cell. Empty and non-numeric cells are
/// not observations.
pub fn attendance_observations(sheet: &RawSheet, dims: &Dimensions) -> Vec<Observation> {
    let mut out = Vec::new();
    for (entry, id) in sheet.choristers.iter().zip(&dims.chorister_of_entry) {
        let Some(id) = id else { continue };
        for (cell, date) in entry.cells.iter().zip(&dims.rehearsal_of_column) {
            match parse_number(cell) {
                Some(hours) => out.push(Observation {
                    chorister_id: id.clone(),
                    rehearsal_date: date.clone(),
                    hours,
                }),
                None if !cell.is_empty() => {
                    debug!(line = entry.line, value = %cell, "ignoring non-numeric attendance cell")
                }
                None => {}
            }
        }
    }
    out
}

/// Full chorister × rehearsal cross-join, chorister-major. Observed pairs are
/// `present`, even at zero hours; pairs without an observation are `missed` with
/// zero hours. The first observation of a pair wins.
pub fn build_fact_attendance(
    choristers: &[DimChorister],
    rehearsals: &[DimRehearsal],
    observations: &[Observation],
) -> Vec<FactAttendance> {
    let mut lookup: HashMap<(&str, &str), f64> = HashMap::with_capacity(observations.len());
    for obs in observations {
        let key = (obs.chorister_id.as_str(), obs.rehearsal_date.as_str());
        if lookup.contains_key(&key) {
            warn!(
                chorister_id = %obs.chorister_id,
                rehearsal_date = %obs.rehearsal_date,
                "duplicate attendance observation; keeping the first"
            );
            continue;
        }
        lookup.insert(key, obs.hours);
    }

    let mut facts = Vec::with_capacity(choristers.len() * rehearsals.len());
    for chorister in choristers {
        for rehearsal in rehearsals {
            let key = (chorister.chorister_id.as_str(), rehearsal.rehearsal_date.as_str());
            let (hours_attended, status) = match lookup.get(&key) {
                Some(&hours) => (hours, AttendanceStatus::Present),
                None => (0.0, AttendanceStatus::Missed),
            };
            facts.push(FactAttendance {
                rehearsal_date: rehearsal.rehearsal_date.clone(),
                chorister_id: chorister.chorister_id.clone(),
                hours_attended,
                status,
            });
        }
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chorister(id: &str) -> DimChorister {
        DimChorister {
            chorister_id: id.into(),
            tgid: String::new(),
            full_name: id.into(),
            joined_date: String::new(),
        }
    }

    fn rehearsal(date: &str) -> DimRehearsal {
        DimRehearsal {
            rehearsal_date: date.into(),
            column_label: date.into(),
        }
    }

    fn seen(id: &str, date: &str, hours: f64) -> Observation {
        Observation {
            chorister_id: id.into(),
            rehearsal_date: date.into(),
            hours,
        }
    }

    #[test]
    fn absent_pairs_are_missed() {
        let facts = build_fact_attendance(
            &[chorister("A"), chorister("B")],
            &[rehearsal("2024-01-01"), rehearsal("2024-01-08")],
            &[seen("A", "2024-01-01", 2.0)],
        );

        assert_eq!(facts.len(), 4);
        let status = |id: &str, date: &str| {
            facts
                .iter()
                .find(|f| f.chorister_id == id && f.rehearsal_date == date)
                .map(|f| f.status)
                .unwrap()
        };
        assert_eq!(status("A", "2024-01-01"), AttendanceStatus::Present);
        assert_eq!(status("A", "2024-01-08"), AttendanceStatus::Missed);
        assert_eq!(status("B", "2024-01-01"), AttendanceStatus::Missed);
        assert_eq!(status("B", "2024-01-08"), AttendanceStatus::Missed);
        assert_eq!(facts[0].hours_attended, 2.0);
        assert_eq!(facts[1].missed_flag(), 1);
    }

    #[test]
    fn cardinality_ignores_raw_sparsity() {
        let choristers: Vec<_> = (0..7).map(|i| chorister(&format!("c{}", i))).collect();
        let rehearsals: Vec<_> = (1..=5)
            .map(|d| rehearsal(&format!("2024-02-0{}", d)))
            .collect();

        for observations in [
            vec![],
            vec![seen("c3", "2024-02-02", 1.0)],
            // unknown chorister and unknown date are simply not matched
            vec![seen("zz", "2024-02-02", 1.0), seen("c1", "1999-01-01", 1.0)],
        ] {
            let facts = build_fact_attendance(&choristers, &rehearsals, &observations);
            assert_eq!(facts.len(), choristers.len() * rehearsals.len());
        }

        assert!(build_fact_attendance(&[], &rehearsals, &[]).is_empty());
        assert!(build_fact_attendance(&choristers, &[], &[]).is_empty());
    }

    #[test]
    fn first_observation_wins_and_observed_zero_is_present() {
        let facts = build_fact_attendance(
            &[chorister("A")],
            &[rehearsal("d1"), rehearsal("d2"), rehearsal("d3")],
            &[seen("A", "d1", 1.5), seen("A", "d1", 3.0), seen("A", "d2", 0.0)],
        );
        assert_eq!(facts[0].hours_attended, 1.5);
        assert_eq!(facts[0].status, AttendanceStatus::Present);
        assert_eq!(facts[1].hours_attended, 0.0);
        assert_eq!(facts[1].status, AttendanceStatus::Present);
        assert_eq!(facts[1].missed_flag(), 0);
        assert_eq!(facts[2].status, AttendanceStatus::Missed);
        assert_eq!(facts[2].missed_flag(), 1);
    }

    #[test]
    fn status_round_trips_through_sheet_text() {
        for s in [AttendanceStatus::Present, AttendanceStatus::Missed] {
            assert_eq!(AttendanceStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(AttendanceStatus::from_str(" MISSED "), Some(AttendanceStatus::Missed));
        assert_eq!(AttendanceStatus::from_str("late"), None);
    }
}
