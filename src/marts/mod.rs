// src/marts/mod.rs

pub mod attendance;
pub mod song;

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::info;

use crate::dims::{DimChorister, DimChoristerAssignment, DimSong};
use crate::facts::{FactAttendance, FactSongTime};
use crate::raw::values::parse_date;

pub use attendance::{
    build_chorister_attendance, build_mart_attendance, build_rehearsal_attendance, MartAttendance,
    MartChoristerAttendance, MartRehearsalAttendance,
};
pub use song::{
    build_mart_chorister_song, build_mart_song_rehearsal, MartChoristerSong, MartSongRehearsal,
};

/// All reporting tables, rebuilt from scratch on every run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Marts {
    pub attendance: Vec<MartAttendance>,
    pub chorister_attendance: Vec<MartChoristerAttendance>,
    pub rehearsal_attendance: Vec<MartRehearsalAttendance>,
    pub song_rehearsal: Vec<MartSongRehearsal>,
    pub chorister_song: Vec<MartChoristerSong>,
}

impl Marts {
    pub fn build(
        choristers: &[DimChorister],
        assignments: &[DimChoristerAssignment],
        songs: &[DimSong],
        attendance: &[FactAttendance],
        song_time: &[FactSongTime],
    ) -> Result<Self> {
        let mart_attendance = build_mart_attendance(choristers, assignments, attendance)?;
        let marts = Marts {
            chorister_attendance: build_chorister_attendance(&mart_attendance),
            rehearsal_attendance: build_rehearsal_attendance(&mart_attendance),
            song_rehearsal: build_mart_song_rehearsal(songs, song_time),
            chorister_song: build_mart_chorister_song(
                choristers,
                assignments,
                songs,
                attendance,
                song_time,
            ),
            attendance: mart_attendance,
        };
        info!(
            attendance = marts.attendance.len(),
            chorister_attendance = marts.chorister_attendance.len(),
            rehearsal_attendance = marts.rehearsal_attendance.len(),
            song_rehearsal = marts.song_rehearsal.len(),
            chorister_song = marts.chorister_song.len(),
            "built marts"
        );
        Ok(marts)
    }
}

pub(crate) fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// `n / d` rounded to four decimals; `None` when there is nothing to divide by.
pub(crate) fn ratio(n: usize, d: usize) -> Option<f64> {
    if d == 0 {
        return None;
    }
    Some(round4(n as f64 / d as f64))
}

struct Interval<'a> {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    voice_part: &'a str,
}

/// Voice part of a chorister on a date, from `dim_chorister_assignment`.
pub(crate) struct VoiceParts<'a> {
    by_chorister: HashMap<&'a str, Vec<Interval<'a>>>,
}

impl<'a> VoiceParts<'a> {
    pub(crate) fn new(assignments: &'a [DimChoristerAssignment]) -> Self {
        let mut by_chorister: HashMap<&str, Vec<Interval>> = HashMap::new();
        for a in assignments {
            by_chorister
                .entry(a.chorister_id.as_str())
                .or_default()
                .push(Interval {
                    from: parse_date(&a.valid_from),
                    to: parse_date(&a.valid_to),
                    voice_part: a.voice_part.as_str(),
                });
        }
        Self { by_chorister }
    }

    /// The covering assignment with the latest start wins; ties go to the first
    /// listed. An assignment without a start covers everything before its end.
    pub(crate) fn on(&self, chorister_id: &str, date: Option<NaiveDate>) -> &'a str {
        let Some(intervals) = self.by_chorister.get(chorister_id) else {
            return "";
        };
        let mut best: Option<&Interval<'a>> = None;
        for iv in intervals {
            let covers = match date {
                Some(d) => iv.from.map_or(true, |f| f <= d) && iv.to.map_or(true, |t| d <= t),
                None => iv.from.is_none() && iv.to.is_none(),
            };
            if covers && best.map_or(true, |b| iv.from > b.from) {
                best = Some(iv);
            }
        }
        best.map(|iv| iv.voice_part).unwrap_or("")
    }
}
