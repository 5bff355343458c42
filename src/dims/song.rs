// src/dims/song.rs

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::raw::{RawRecord, SongEntry};
use crate::table::{Cell, FromRecord, TableRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimSong {
    pub song_id: String,
    pub song_name: String,
}

impl TableRow for DimSong {
    const TAB: &'static str = "dim_song";
    const HEADER: &'static [&'static str] = &["song_id", "song_name"];

    fn to_cells(&self) -> Vec<Cell> {
        vec![Cell::from(&self.song_id), Cell::from(&self.song_name)]
    }
}

impl FromRecord for DimSong {
    fn from_record(record: &RawRecord<'_>) -> Result<Self> {
        Ok(Self {
            song_id: record.get("song_id"),
            song_name: record.get("song_name"),
        })
    }
}

/// One song per `Song` row. The id is the readable title; a repeated title gets
/// ` (2)`, ` (3)`, ... so each row keeps its own id. Returns the dimension and the
/// id of every entry (`None` for untitled rows).
pub fn build_songs(entries: &[SongEntry]) -> (Vec<DimSong>, Vec<Option<String>>) {
    let mut songs = Vec::new();
    let mut entry_ids = Vec::with_capacity(entries.len());
    let mut title_count: HashMap<&str, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();

    for entry in entries {
        if entry.title.is_empty() {
            warn!(line = entry.line, "dropping song row without a title");
            entry_ids.push(None);
            continue;
        }

        let count = title_count.entry(entry.title.as_str()).or_insert(0);
        let mut song_id = entry.title.clone();
        while used.contains(&song_id) {
            *count += 1;
            song_id = format!("{} ({})", entry.title, *count + 1);
        }
        used.insert(song_id.clone());

        entry_ids.push(Some(song_id.clone()));
        songs.push(DimSong {
            song_id,
            song_name: entry.title.clone(),
        });
    }

    (songs, entry_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(line: usize, title: &str) -> SongEntry {
        SongEntry {
            line,
            title: title.into(),
            cells: vec![],
        }
    }

    #[test]
    fn repeated_titles_get_numbered() {
        let (songs, ids) = build_songs(&[
            song(2, "Ave Maria"),
            song(3, "Ave Maria"),
            song(4, ""),
            song(5, "Ave Maria"),
            song(6, "Hallelujah"),
        ]);

        let names: Vec<_> = songs.iter().map(|s| s.song_id.as_str()).collect();
        assert_eq!(
            names,
            vec!["Ave Maria", "Ave Maria (2)", "Ave Maria (3)", "Hallelujah"]
        );
        assert_eq!(ids[2], None);
        assert_eq!(ids[3].as_deref(), Some("Ave Maria (3)"));
    }

    #[test]
    fn suffix_never_collides_with_a_real_title() {
        let (songs, _) = build_songs(&[song(2, "X (2)"), song(3, "X"), song(4, "X")]);
        let names: Vec<_> = songs.iter().map(|s| s.song_id.as_str()).collect();
        assert_eq!(names, vec!["X (2)", "X", "X (3)"]);
    }
}
