// src/dims/mod.rs

pub mod chorister;
pub mod rehearsal;
pub mod song;

use tracing::info;

use crate::raw::RawSheet;

pub use chorister::{DimChorister, DimChoristerAssignment};
pub use rehearsal::DimRehearsal;
pub use song::DimSong;

/// Every dimension built from one RAW sheet, plus the keys the fact builder needs
/// to map raw rows and columns onto dimension ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dimensions {
    pub choristers: Vec<DimChorister>,
    pub assignments: Vec<DimChoristerAssignment>,
    pub songs: Vec<DimSong>,
    pub rehearsals: Vec<DimRehearsal>,
    /// Aligned with `RawSheet::choristers`.
    pub chorister_of_entry: Vec<Option<String>>,
    /// Aligned with `RawSheet::songs`.
    pub song_of_entry: Vec<Option<String>>,
    /// Aligned with `RawSheet::rehearsal_columns`.
    pub rehearsal_of_column: Vec<String>,
}

pub fn build_dimensions(sheet: &RawSheet) -> Dimensions {
    let choristers = chorister::build_choristers(&sheet.choristers);
    let (songs, song_of_entry) = song::build_songs(&sheet.songs);
    let (rehearsals, rehearsal_of_column) = rehearsal::build_rehearsals(&sheet.rehearsal_columns);

    info!(
        choristers = choristers.choristers.len(),
        assignments = choristers.assignments.len(),
        songs = songs.len(),
        rehearsals = rehearsals.len(),
        "built dimensions"
    );

    Dimensions {
        choristers: choristers.choristers,
        assignments: choristers.assignments,
        songs,
        rehearsals,
        chorister_of_entry: choristers.entry_ids,
        song_of_entry,
        rehearsal_of_column,
    }
}
