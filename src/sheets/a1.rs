// src/sheets/a1.rs
//
// Just enough A1 notation for the ranges this job reads and writes:
// `tab`, `tab!A1`, `tab!A:ZZ`, `tab!A1:F`, `tab!A1:C2`, with optional quoting.

use anyhow::{anyhow, bail, Result};
use std::fmt;
use std::str::FromStr;

/// `0 → A`, `25 → Z`, `26 → AA`.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Inverse of `column_letter`; case-insensitive.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        n = n.checked_mul(26)? + (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
    }
    Some(n - 1)
}

/// Zero-based, inclusive bounds. `None` on an end means "to the edge of the sheet".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub tab: String,
    pub start_col: usize,
    pub start_row: usize,
    pub end_col: Option<usize>,
    pub end_row: Option<usize>,
}

impl A1Range {
    /// The whole tab.
    pub fn whole(tab: &str) -> Self {
        Self {
            tab: tab.to_string(),
            start_col: 0,
            start_row: 0,
            end_col: None,
            end_row: None,
        }
    }

    /// `tab!A1:<last col>`: every row of the first `width` columns.
    pub fn columns(tab: &str, width: usize) -> Self {
        Self {
            end_col: Some(width.saturating_sub(1)),
            ..Self::whole(tab)
        }
    }

    /// `tab!A1:<last col><last row>` sized to a grid.
    pub fn grid(tab: &str, width: usize, height: usize) -> Self {
        Self {
            end_col: Some(width.saturating_sub(1)),
            end_row: Some(height.saturating_sub(1)),
            ..Self::whole(tab)
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start_row
            && col >= self.start_col
            && self.end_row.map_or(true, |r| row <= r)
            && self.end_col.map_or(true, |c| col <= c)
    }
}

fn quote_tab(tab: &str) -> String {
    if !tab.is_empty() && tab.chars().all(|c| c.is_alphanumeric() || c == '_') {
        tab.to_string()
    } else {
        format!("'{}'", tab.replace('\'', "''"))
    }
}

fn unquote_tab(raw: &str) -> String {
    match raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    }
}

/// Split `C12` into optional column and row parts.
fn parse_cell(s: &str) -> Result<(Option<usize>, Option<usize>)> {
    let split = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    let (letters, digits) = s.split_at(split);
    let col = if letters.is_empty() {
        None
    } else {
        Some(column_index(letters).ok_or_else(|| anyhow!("bad column in {:?}", s))?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        let n: usize = digits.parse().map_err(|_| anyhow!("bad row in {:?}", s))?;
        if n == 0 {
            bail!("rows are 1-based in {:?}", s);
        }
        Some(n - 1)
    };
    if col.is_none() && row.is_none() {
        bail!("empty cell reference");
    }
    Ok((col, row))
}

impl FromStr for A1Range {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (tab, cells) = match s.rfind('!') {
            Some(i) => (unquote_tab(&s[..i]), Some(&s[i + 1..])),
            None => (unquote_tab(s), None),
        };
        if tab.is_empty() {
            bail!("range {:?} has no tab name", s);
        }
        let Some(cells) = cells else {
            return Ok(Self::whole(&tab));
        };

        let (start, end) = match cells.split_once(':') {
            Some((a, b)) => (parse_cell(a)?, parse_cell(b)?),
            None => {
                let c = parse_cell(cells)?;
                (c, c)
            }
        };
        Ok(Self {
            tab,
            start_col: start.0.unwrap_or(0),
            start_row: start.1.unwrap_or(0),
            end_col: end.0,
            end_row: end.1,
        })
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}!{}{}",
            quote_tab(&self.tab),
            column_letter(self.start_col),
            self.start_row + 1
        )?;
        match (self.end_col, self.end_row) {
            (Some(c), Some(r)) => write!(f, ":{}{}", column_letter(c), r + 1),
            (Some(c), None) => write!(f, ":{}", column_letter(c)),
            // open column end: spell out the widest column Sheets allows
            (None, Some(r)) => write!(f, ":ZZZ{}", r + 1),
            (None, None) => write!(f, ":ZZZ"),
        }
    }
}
