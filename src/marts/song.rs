// src/marts/song.rs

use std::collections::{HashMap, HashSet};

use super::VoiceParts;
use crate::dims::{DimChorister, DimChoristerAssignment, DimSong};
use crate::facts::{FactAttendance, FactSongTime};
use crate::raw::values::{date_or_label, parse_date};
use crate::table::{Cell, TableRow};

#[derive(Debug, Clone, PartialEq)]
pub struct MartSongRehearsal {
    pub rehearsal_date: String,
    pub song_id: String,
    pub song_name: String,
    pub minutes_spent: f64,
}

impl MartSongRehearsal {
    pub fn hours_spent(&self) -> f64 {
        self.minutes_spent / 60.0
    }
}

impl TableRow for MartSongRehearsal {
    const TAB: &'static str = "mart_song_rehearsal";
    const HEADER: &'static [&'static str] = &[
        "rehearsal_date",
        "song_id",
        "song_name",
        "minutes_spent",
        "hours_spent",
    ];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(&self.rehearsal_date),
            Cell::from(&self.song_id),
            Cell::from(&self.song_name),
            Cell::from(self.minutes_spent),
            Cell::from(self.hours_spent()),
        ]
    }
}

pub fn build_mart_song_rehearsal(songs: &[DimSong], facts: &[FactSongTime]) -> Vec<MartSongRehearsal> {
    let names: HashMap<&str, &str> = songs
        .iter()
        .map(|s| (s.song_id.as_str(), s.song_name.as_str()))
        .collect();

    facts
        .iter()
        .map(|f| MartSongRehearsal {
            rehearsal_date: date_or_label(&f.rehearsal_date),
            song_id: f.song_id.clone(),
            song_name: names.get(f.song_id.as_str()).unwrap_or(&"").to_string(),
            minutes_spent: f.minutes_spent,
        })
        .collect()
}

/// Songs a chorister was present for: every attended rehearsal × every song
/// rehearsed that day.
#[derive(Debug, Clone, PartialEq)]
pub struct MartChoristerSong {
    pub rehearsal_date: String,
    pub chorister_id: String,
    pub full_name: String,
    pub joined_date: String,
    pub voice_part: String,
    pub song_id: String,
    pub song_name: String,
    pub minutes_spent: f64,
}

impl TableRow for MartChoristerSong {
    const TAB: &'static str = "mart_chorister_song";
    const HEADER: &'static [&'static str] = &[
        "rehearsal_date",
        "chorister_id",
        "full_name",
        "joined_date",
        "voice_part",
        "song_id",
        "song_name",
        "minutes_spent",
        "hours_spent",
    ];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(&self.rehearsal_date),
            Cell::from(&self.chorister_id),
            Cell::from(&self.full_name),
            Cell::from(&self.joined_date),
            Cell::from(&self.voice_part),
            Cell::from(&self.song_id),
            Cell::from(&self.song_name),
            Cell::from(self.minutes_spent),
            Cell::from(self.minutes_spent / 60.0),
        ]
    }
}

/// Ordered date → chorister → song, each in first-seen order of its fact table.
pub fn build_mart_chorister_song(
    choristers: &[DimChorister],
    assignments: &[DimChoristerAssignment],
    songs: &[DimSong],
    attendance: &[FactAttendance],
    song_time: &[FactSongTime],
) -> Vec<MartChoristerSong> {
    let by_id: HashMap<&str, &DimChorister> = choristers
        .iter()
        .map(|c| (c.chorister_id.as_str(), c))
        .collect();
    let names: HashMap<&str, &str> = songs
        .iter()
        .map(|s| (s.song_id.as_str(), s.song_name.as_str()))
        .collect();
    let voices = VoiceParts::new(assignments);

    let mut dates: Vec<String> = Vec::new();
    let mut attending: HashMap<String, Vec<&str>> = HashMap::new();
    let mut seen: HashSet<(String, &str)> = HashSet::new();
    for fact in attendance.iter().filter(|f| f.hours_attended > 0.0) {
        let date = date_or_label(&fact.rehearsal_date);
        if date.is_empty() || !seen.insert((date.clone(), fact.chorister_id.as_str())) {
            continue;
        }
        attending
            .entry(date.clone())
            .or_insert_with(|| {
                dates.push(date.clone());
                Vec::new()
            })
            .push(fact.chorister_id.as_str());
    }

    let mut rehearsed: HashMap<String, Vec<&FactSongTime>> = HashMap::new();
    for fact in song_time {
        let date = date_or_label(&fact.rehearsal_date);
        if !date.is_empty() {
            rehearsed.entry(date).or_default().push(fact);
        }
    }

    let mut rows = Vec::new();
    for date in &dates {
        let Some(songs_that_day) = rehearsed.get(date) else { continue };
        let parsed = parse_date(date);
        for chorister_id in &attending[date] {
            let chorister = by_id.get(chorister_id);
            let voice_part = voices.on(chorister_id, parsed);
            for song in songs_that_day {
                rows.push(MartChoristerSong {
                    rehearsal_date: date.clone(),
                    chorister_id: chorister_id.to_string(),
                    full_name: chorister.map(|c| c.full_name.clone()).unwrap_or_default(),
                    joined_date: chorister.map(|c| c.joined_date.clone()).unwrap_or_default(),
                    voice_part: voice_part.to_string(),
                    song_id: song.song_id.clone(),
                    song_name: names.get(song.song_id.as_str()).unwrap_or(&"").to_string(),
                    minutes_spent: song.minutes_spent,
                });
            }
        }
    }
    rows
}
