// src/marts/attendance.rs

use anyhow::Result;
use std::collections::HashMap;

use super::{ratio, round4, VoiceParts};
use crate::dims::{DimChorister, DimChoristerAssignment};
use crate::error::EtlError;
use crate::facts::{AttendanceStatus, FactAttendance};
use crate::raw::values::{format_date, parse_date};
use crate::table::{Cell, TableRow};

/// One row per fact_attendance row, joined with the chorister and the voice part
/// valid on that date.
#[derive(Debug, Clone, PartialEq)]
pub struct MartAttendance {
    pub rehearsal_date: String,
    pub chorister_id: String,
    pub full_name: String,
    pub joined_date: String,
    pub voice_part: String,
    pub hours_attended: f64,
    pub attended: bool,
    pub missed: bool,
    pub available: bool,
}

impl TableRow for MartAttendance {
    const TAB: &'static str = "mart_attendance";
    const HEADER: &'static [&'static str] = &[
        "rehearsal_date",
        "chorister_id",
        "full_name",
        "joined_date",
        "voice_part",
        "hours_attended",
        "attended_flag",
        "missed_flag",
        "available_flag",
    ];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(&self.rehearsal_date),
            Cell::from(&self.chorister_id),
            Cell::from(&self.full_name),
            Cell::from(&self.joined_date),
            Cell::from(&self.voice_part),
            Cell::from(self.hours_attended),
            Cell::from(u8::from(self.attended)),
            Cell::from(u8::from(self.missed)),
            Cell::from(u8::from(self.available)),
        ]
    }
}

/// A chorister is available from the joined date on. Without a joined date no
/// rehearsal counts; a joined date that is present but not a date is an error.
pub fn build_mart_attendance(
    choristers: &[DimChorister],
    assignments: &[DimChoristerAssignment],
    facts: &[FactAttendance],
) -> Result<Vec<MartAttendance>> {
    let by_id: HashMap<&str, &DimChorister> = choristers
        .iter()
        .map(|c| (c.chorister_id.as_str(), c))
        .collect();
    let voices = VoiceParts::new(assignments);

    let mut rows = Vec::with_capacity(facts.len());
    for fact in facts {
        let chorister = by_id.get(fact.chorister_id.as_str());
        let joined_raw = chorister.map(|c| c.joined_date.as_str()).unwrap_or("");
        let joined = if joined_raw.is_empty() {
            None
        } else {
            Some(parse_date(joined_raw).ok_or_else(|| EtlError::InvalidValue {
                field: "joined_date",
                key: fact.chorister_id.clone(),
                value: joined_raw.to_string(),
            })?)
        };

        let date = parse_date(&fact.rehearsal_date);
        let available = match (joined, date) {
            (None, _) => false,
            (Some(joined), Some(date)) => date >= joined,
            (Some(_), None) => false,
        };

        rows.push(MartAttendance {
            rehearsal_date: date.map(format_date).unwrap_or_else(|| fact.rehearsal_date.clone()),
            chorister_id: fact.chorister_id.clone(),
            full_name: chorister.map(|c| c.full_name.clone()).unwrap_or_default(),
            joined_date: joined.map(format_date).unwrap_or_default(),
            voice_part: voices.on(&fact.chorister_id, date).to_string(),
            hours_attended: fact.hours_attended,
            attended: fact.hours_attended > 0.0,
            missed: fact.status == AttendanceStatus::Missed,
            available,
        });
    }
    Ok(rows)
}

/// Attendance rate per chorister, over the rehearsals they were available for.
#[derive(Debug, Clone, PartialEq)]
pub struct MartChoristerAttendance {
    pub chorister_id: String,
    pub full_name: String,
    pub rehearsals_available: usize,
    pub rehearsals_attended: usize,
    pub rehearsals_missed: usize,
    pub hours_total: f64,
    pub attendance_rate: Option<f64>,
}

impl TableRow for MartChoristerAttendance {
    const TAB: &'static str = "mart_chorister_attendance";
    const HEADER: &'static [&'static str] = &[
        "chorister_id",
        "full_name",
        "rehearsals_available",
        "rehearsals_attended",
        "rehearsals_missed",
        "hours_total",
        "attendance_rate",
    ];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(&self.chorister_id),
            Cell::from(&self.full_name),
            Cell::from(self.rehearsals_available),
            Cell::from(self.rehearsals_attended),
            Cell::from(self.rehearsals_missed),
            Cell::from(self.hours_total),
            Cell::from(self.attendance_rate),
        ]
    }
}

/// Attendance rate per rehearsal date, over the choristers available that day.
#[derive(Debug, Clone, PartialEq)]
pub struct MartRehearsalAttendance {
    pub rehearsal_date: String,
    pub choristers_available: usize,
    pub choristers_attended: usize,
    pub choristers_missed: usize,
    pub hours_total: f64,
    pub attendance_rate: Option<f64>,
}

impl TableRow for MartRehearsalAttendance {
    const TAB: &'static str = "mart_rehearsal_attendance";
    const HEADER: &'static [&'static str] = &[
        "rehearsal_date",
        "choristers_available",
        "choristers_attended",
        "choristers_missed",
        "hours_total",
        "attendance_rate",
    ];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(&self.rehearsal_date),
            Cell::from(self.choristers_available),
            Cell::from(self.choristers_attended),
            Cell::from(self.choristers_missed),
            Cell::from(self.hours_total),
            Cell::from(self.attendance_rate),
        ]
    }
}

#[derive(Default)]
struct Tally {
    available: usize,
    attended: usize,
    missed: usize,
    hours: f64,
}

impl Tally {
    fn add(&mut self, row: &MartAttendance) {
        self.hours += row.hours_attended;
        if !row.available {
            return;
        }
        self.available += 1;
        if row.attended {
            self.attended += 1;
        } else {
            self.missed += 1;
        }
    }
}

/// Group rows by `key`, keeping first-seen key order.
fn tally_by<'a, F>(rows: &'a [MartAttendance], key: F) -> Vec<(&'a MartAttendance, Tally)>
where
    F: Fn(&MartAttendance) -> &str,
{
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<(&MartAttendance, Tally)> = Vec::new();
    for row in rows {
        let slot = *slots.entry(key(row)).or_insert_with(|| {
            out.push((row, Tally::default()));
            out.len() - 1
        });
        out[slot].1.add(row);
    }
    out
}

pub fn build_chorister_attendance(rows: &[MartAttendance]) -> Vec<MartChoristerAttendance> {
    tally_by(rows, |r| r.chorister_id.as_str())
        .into_iter()
        .map(|(first, t)| MartChoristerAttendance {
            chorister_id: first.chorister_id.clone(),
            full_name: first.full_name.clone(),
            rehearsals_available: t.available,
            rehearsals_attended: t.attended,
            rehearsals_missed: t.missed,
            hours_total: round4(t.hours),
            attendance_rate: ratio(t.attended, t.available),
        })
        .collect()
}

pub fn build_rehearsal_attendance(rows: &[MartAttendance]) -> Vec<MartRehearsalAttendance> {
    tally_by(rows, |r| r.rehearsal_date.as_str())
        .into_iter()
        .map(|(first, t)| MartRehearsalAttendance {
            rehearsal_date: first.rehearsal_date.clone(),
            choristers_available: t.available,
            choristers_attended: t.attended,
            choristers_missed: t.missed,
            hours_total: round4(t.hours),
            attendance_rate: ratio(t.attended, t.available),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chorister(id: &str, joined: &str) -> DimChorister {
        DimChorister {
            chorister_id: id.into(),
            tgid: String::new(),
            full_name: format!("{} name", id),
            joined_date: joined.into(),
        }
    }

    fn fact(date: &str, id: &str, hours: f64) -> FactAttendance {
        FactAttendance {
            rehearsal_date: date.into(),
            chorister_id: id.into(),
            hours_attended: hours,
            status: AttendanceStatus::from_hours(hours),
        }
    }

    fn assignment(id: &str, part: &str, from: &str, to: &str) -> DimChoristerAssignment {
        DimChoristerAssignment {
            chorister_id: id.into(),
            voice_part: part.into(),
            valid_from: from.into(),
            valid_to: to.into(),
        }
    }

    #[test]
    fn joins_chorister_voice_part_and_flags() {
        let rows = build_mart_attendance(
            &[chorister("A", "2024-01-05")],
            &[
                assignment("A", "S", "2024-01-05", "2024-01-10"),
                assignment("A", "A", "2024-01-11", ""),
            ],
            &[
                fact("2024-01-01", "A", 0.0),
                fact("2024-01-08", "A", 2.0),
                fact("2024-01-15", "A", 0.0),
            ],
        )
        .unwrap();

        assert!(!rows[0].available);
        assert_eq!(rows[0].voice_part, "");
        assert!(rows[1].available);
        assert!(rows[1].attended);
        assert_eq!(rows[1].voice_part, "S");
        assert_eq!(rows[1].full_name, "A name");
        assert!(rows[2].missed);
        assert_eq!(rows[2].voice_part, "A");
        assert_eq!(
            rows[1].to_cells()[6..],
            [Cell::Number(1.0), Cell::Number(0.0), Cell::Number(1.0)]
        );
    }

    #[test]
    fn unparseable_joined_date_is_an_error() {
        let err = build_mart_attendance(
            &[chorister("A", "sometime")],
            &[],
            &[fact("2024-01-01", "A", 1.0)],
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::InvalidValue { field: "joined_date", .. })
        ));
    }

    #[test]
    fn rates_count_only_available_rehearsals() {
        let rows = build_mart_attendance(
            &[
                chorister("A", "2024-01-05"),
                chorister("B", ""),
                chorister("C", "2023-12-01"),
            ],
            &[],
            &[
                fact("2024-01-01", "A", 0.0),
                fact("2024-01-08", "A", 2.0),
                fact("2024-01-15", "A", 0.0),
                fact("2024-01-01", "B", 0.1),
                fact("2024-01-08", "B", 0.2),
                fact("2024-01-15", "B", 0.0),
                fact("2024-01-01", "C", 1.0),
                fact("2024-01-08", "C", 1.5),
                fact("2024-01-15", "C", 0.0),
            ],
        )
        .unwrap();

        let per_chorister = build_chorister_attendance(&rows);
        assert_eq!(per_chorister.len(), 3);
        assert_eq!(per_chorister[0].rehearsals_available, 2);
        assert_eq!(per_chorister[0].rehearsals_attended, 1);
        assert_eq!(per_chorister[0].rehearsals_missed, 1);
        assert_eq!(per_chorister[0].attendance_rate, Some(0.5));
        assert_eq!(per_chorister[1].rehearsals_available, 0);
        assert_eq!(per_chorister[1].hours_total, 0.3);
        assert_eq!(per_chorister[1].attendance_rate, None);
        assert_eq!(per_chorister[2].hours_total, 2.5);
        assert_eq!(per_chorister[2].attendance_rate, Some(0.6667));

        let per_date = build_rehearsal_attendance(&rows);
        let dates: Vec<_> = per_date.iter().map(|r| r.rehearsal_date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-08", "2024-01-15"]);
        assert_eq!(per_date[0].choristers_available, 1);
        assert_eq!(per_date[0].attendance_rate, Some(1.0));
        assert_eq!(per_date[1].choristers_available, 2);
        assert_eq!(per_date[1].hours_total, 3.7);
        assert_eq!(per_date[1].attendance_rate, Some(1.0));
        assert_eq!(per_date[2].choristers_missed, 2);
        assert_eq!(per_date[2].attendance_rate, Some(0.0));
    }

    #[test]
    fn missing_joined_date_is_never_available() {
        let rows = build_mart_attendance(
            &[chorister("A", "")],
            &[],
            &[fact("2024-01-01", "A", 2.0), fact("Concert", "A", 0.0)],
        )
        .unwrap();
        assert!(rows.iter().all(|r| !r.available));
        assert!(rows[0].attended);
        assert_eq!(rows[0].joined_date, "");
        assert_eq!(rows[0].to_cells()[8], Cell::Number(0.0));

        let summary = build_chorister_attendance(&rows);
        assert_eq!(summary[0].rehearsals_available, 0);
        assert_eq!(summary[0].rehearsals_attended, 0);
        assert_eq!(summary[0].hours_total, 2.0);
        assert_eq!(summary[0].attendance_rate, None);
    }

    #[test]
    fn no_available_rehearsals_leaves_rate_empty() {
        let rows = build_mart_attendance(
            &[chorister("A", "2030-01-01")],
            &[],
            &[fact("2024-01-01", "A", 0.0)],
        )
        .unwrap();
        let summary = build_chorister_attendance(&rows);
        assert_eq!(summary[0].attendance_rate, None);
        assert_eq!(summary[0].to_cells()[6], Cell::empty());
    }
}
