// src/raw/layout.rs
//
// Layout of the RAW attendance tab: fixed columns A=Tag, B=Joined, C=tgid, D=Who,
// then one column per rehearsal date. Chorister rows carry hours in the date cells,
// `Song` rows carry minutes.

use anyhow::Result;
use tracing::debug;

use super::RawTable;

pub const RAW_TAB: &str = "main";
pub const RAW_RANGE: &str = "main!A:ZZ";

pub const COL_TAG: &str = "Tag";
pub const COL_JOINED: &str = "Joined";
pub const COL_TGID: &str = "tgid";
pub const COL_WHO: &str = "Who";

pub const SONG_TAG: &str = "Song";

/// Date columns start at `E`.
pub const DATE_COLUMNS_START: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct RehearsalColumn {
    pub index: usize,
    pub label: String,
}

/// A chorister row. `cells` is aligned with `RawSheet::rehearsal_columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoristerEntry {
    pub line: usize,
    pub voice_part: String,
    pub full_name: String,
    pub joined: String,
    pub tgid: String,
    pub cells: Vec<String>,
}

/// A `Song` row; `Who` holds the title.
#[derive(Debug, Clone, PartialEq)]
pub struct SongEntry {
    pub line: usize,
    pub title: String,
    pub cells: Vec<String>,
}

/// The RAW tab split into its two row kinds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub rehearsal_columns: Vec<RehearsalColumn>,
    pub choristers: Vec<ChoristerEntry>,
    pub songs: Vec<SongEntry>,
}

impl RawSheet {
    /// Classify every row of the RAW tab. Rows with an empty `Tag` are skipped.
    pub fn parse(table: &RawTable) -> Result<Self> {
        table.require_columns(RAW_TAB, &[COL_TAG, COL_JOINED, COL_WHO])?;

        let rehearsal_columns: Vec<RehearsalColumn> = table
            .headers
            .iter()
            .enumerate()
            .skip(DATE_COLUMNS_START)
            .filter(|(_, label)| !label.is_empty())
            .map(|(index, label)| RehearsalColumn {
                index,
                label: label.clone(),
            })
            .collect();

        let mut sheet = RawSheet {
            rehearsal_columns,
            ..Default::default()
        };

        for record in table.records() {
            let tag = record.get(COL_TAG);
            if tag.is_empty() {
                debug!(line = record.line, "skipping row without Tag");
                continue;
            }
            let cells = sheet
                .rehearsal_columns
                .iter()
                .map(|c| record.cell(c.index))
                .collect();

            if tag == SONG_TAG {
                sheet.songs.push(SongEntry {
                    line: record.line,
                    title: record.get(COL_WHO),
                    cells,
                });
            } else {
                sheet.choristers.push(ChoristerEntry {
                    line: record.line,
                    voice_part: tag,
                    full_name: record.get(COL_WHO),
                    joined: record.get(COL_JOINED),
                    tgid: record.get(COL_TGID),
                    cells,
                });
            }
        }

        Ok(sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable::from_values(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn splits_choristers_and_songs() {
        let t = table(&[
            &["Tag", "Joined", "tgid", "Who", "01.01.24", "", "08.01.24"],
            &["S", "01.09.23", "111", "Anna", "2", "", "1,5"],
            &["", "", "", "ignored"],
            &["Song", "", "", "Ave Maria", "30"],
            &["T", "", "", "Boris"],
        ]);
        let sheet = RawSheet::parse(&t).unwrap();

        assert_eq!(
            sheet.rehearsal_columns,
            vec![
                RehearsalColumn { index: 4, label: "01.01.24".into() },
                RehearsalColumn { index: 6, label: "08.01.24".into() },
            ]
        );
        assert_eq!(sheet.choristers.len(), 2);
        assert_eq!(sheet.choristers[0].voice_part, "S");
        assert_eq!(sheet.choristers[0].tgid, "111");
        assert_eq!(sheet.choristers[0].cells, vec!["2", "1,5"]);
        assert_eq!(sheet.choristers[1].cells, vec!["", ""]);
        assert_eq!(sheet.choristers[1].line, 5);

        assert_eq!(sheet.songs.len(), 1);
        assert_eq!(sheet.songs[0].title, "Ave Maria");
        assert_eq!(sheet.songs[0].cells, vec!["30", ""]);
    }

    #[test]
    fn tgid_column_is_optional() {
        let t = table(&[&["Tag", "Joined", "Who", "x", "01.01.24"], &["A", "", "Vera", "", "1"]]);
        let sheet = RawSheet::parse(&t).unwrap();
        assert_eq!(sheet.choristers[0].tgid, "");
        assert_eq!(sheet.choristers[0].cells, vec!["1"]);
    }

    #[test]
    fn rejects_sheet_without_required_columns() {
        let t = table(&[&["Tag", "Name"]]);
        assert!(RawSheet::parse(&t).is_err());
    }
}
