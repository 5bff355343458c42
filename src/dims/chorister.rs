// src/dims/chorister.rs

use anyhow::Result;
use chrono::Duration;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::raw::values::{date_or_label, format_date, parse_date};
use crate::raw::{ChoristerEntry, RawRecord};
use crate::table::{Cell, FromRecord, TableRow};

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex should be valid"));
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w]+").expect("non-word regex should be valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimChorister {
    pub chorister_id: String,
    pub tgid: String,
    pub full_name: String,
    pub joined_date: String,
}

impl TableRow for DimChorister {
    const TAB: &'static str = "dim_chorister";
    const HEADER: &'static [&'static str] = &["chorister_id", "tgid", "full_name", "joined_date"];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(&self.chorister_id),
            Cell::from(&self.tgid),
            Cell::from(&self.full_name),
            Cell::from(&self.joined_date),
        ]
    }
}

impl FromRecord for DimChorister {
    fn from_record(record: &RawRecord<'_>) -> Result<Self> {
        Ok(Self {
            chorister_id: record.get("chorister_id"),
            tgid: record.get("tgid"),
            full_name: record.get("full_name"),
            joined_date: record.get("joined_date"),
        })
    }
}

/// Which voice part a chorister sang over a date interval. An empty `valid_to`
/// means the assignment is still open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimChoristerAssignment {
    pub chorister_id: String,
    pub voice_part: String,
    pub valid_from: String,
    pub valid_to: String,
}

impl TableRow for DimChoristerAssignment {
    const TAB: &'static str = "dim_chorister_assignment";
    const HEADER: &'static [&'static str] =
        &["chorister_id", "voice_part", "valid_from", "valid_to"];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(&self.chorister_id),
            Cell::from(&self.voice_part),
            Cell::from(&self.valid_from),
            Cell::from(&self.valid_to),
        ]
    }
}

impl FromRecord for DimChoristerAssignment {
    fn from_record(record: &RawRecord<'_>) -> Result<Self> {
        Ok(Self {
            chorister_id: record.get("chorister_id"),
            voice_part: record.get("voice_part"),
            valid_from: record.get("valid_from"),
            valid_to: record.get("valid_to"),
        })
    }
}

/// Lowercase, whitespace runs → `_`, drop everything that is not a word character.
pub fn normalize_name(full_name: &str) -> String {
    let lower = full_name.trim().to_lowercase();
    let underscored = WHITESPACE.replace_all(&lower, "_");
    NON_WORD.replace_all(&underscored, "").into_owned()
}

/// `tgid:<tgid>` when the Telegram id is known, else `name_joined:<name>:<joined>`.
pub fn make_chorister_id(full_name: &str, joined: &str, tgid: &str) -> String {
    if !tgid.is_empty() {
        return format!("tgid:{}", tgid);
    }
    format!("name_joined:{}:{}", normalize_name(full_name), joined)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoristerDims {
    pub choristers: Vec<DimChorister>,
    pub assignments: Vec<DimChoristerAssignment>,
    /// Chorister id for each raw entry, `None` when the entry was dropped.
    pub entry_ids: Vec<Option<String>>,
}

/// Build `dim_chorister` and `dim_chorister_assignment`. First occurrence of an id
/// wins; later duplicates only contribute new voice-part assignments.
pub fn build_choristers(entries: &[ChoristerEntry]) -> ChoristerDims {
    let mut dims = ChoristerDims::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut parts: Vec<(String, Vec<DimChoristerAssignment>)> = Vec::new();
    let mut part_slot: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        if entry.full_name.is_empty() {
            warn!(line = entry.line, "dropping chorister row without a name");
            dims.entry_ids.push(None);
            continue;
        }

        let id = make_chorister_id(&entry.full_name, &entry.joined, &entry.tgid);
        dims.entry_ids.push(Some(id.clone()));

        if seen.insert(id.clone()) {
            dims.choristers.push(DimChorister {
                chorister_id: id.clone(),
                tgid: entry.tgid.clone(),
                full_name: entry.full_name.clone(),
                joined_date: date_or_label(&entry.joined),
            });
        } else {
            warn!(
                line = entry.line,
                chorister_id = %id,
                "duplicate chorister row; keeping the first"
            );
        }

        let slot = *part_slot.entry(id.clone()).or_insert_with(|| {
            parts.push((id.clone(), Vec::new()));
            parts.len() - 1
        });
        let group = &mut parts[slot].1;
        if group.iter().any(|a| a.voice_part == entry.voice_part) {
            continue;
        }
        group.push(DimChoristerAssignment {
            chorister_id: id,
            voice_part: entry.voice_part.clone(),
            valid_from: date_or_label(&entry.joined),
            valid_to: String::new(),
        });
    }

    for (_, mut group) in parts {
        close_intervals(&mut group);
        dims.assignments.extend(group);
    }
    dims
}

/// Sort one chorister's assignments by start and end each one the day before the next.
fn close_intervals(group: &mut [DimChoristerAssignment]) {
    if group.len() < 2 {
        return;
    }
    // unknown starts sort first
    group.sort_by_key(|a| parse_date(&a.valid_from));
    for i in 0..group.len() - 1 {
        let this = parse_date(&group[i].valid_from);
        let next = parse_date(&group[i + 1].valid_from);
        if let (Some(this), Some(next)) = (this, next) {
            if next > this {
                group[i].valid_to = format_date(next - Duration::days(1));
            }
        } else if let (None, Some(next)) = (this, next) {
            group[i].valid_to = format_date(next - Duration::days(1));
        }
    }
}
