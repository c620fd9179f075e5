// The manifest lists the dispatch files of one run, separated by `;`. Each entry is either a
// bare file name or a `start,end,file` triple restricting the entry to a service window:
//
// `WeekdayA.ssv;2021-04-21,2021-11-21,WeekdayB.ssv`
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use nom::{
    IResult, Parser,
    branch::alt,
    character::complete::{char, space0},
    combinator::{all_consuming, map, map_res},
    sequence::{delimited, terminated},
};

use crate::parsing::{
    error::{PResult, ParsingError},
    helpers::{string_till_separator_parser, ymd_parser},
};

#[derive(Clone, Debug, PartialEq)]
pub struct ManifestEntry {
    path: PathBuf,
    window: Option<(NaiveDate, NaiveDate)>,
}

impl ManifestEntry {
    pub fn new(path: PathBuf, window: Option<(NaiveDate, NaiveDate)>) -> Self {
        Self { path, window }
    }

    // Getters/Setters

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.window
    }
}

fn date_combinator(input: &str) -> IResult<&str, NaiveDate> {
    map_res(
        delimited(space0, ymd_parser, space0),
        |(year, month, day)| {
            NaiveDate::from_ymd_opt(year, month, day)
                .ok_or(ParsingError::UnableToBuildDate(year, month, day))
        },
    )
    .parse(input)
}

fn dated_entry_combinator(input: &str) -> IResult<&str, (String, Option<(NaiveDate, NaiveDate)>)> {
    map(
        (
            terminated(date_combinator, char(',')),
            terminated(date_combinator, char(',')),
            string_till_separator_parser,
        ),
        |(start, end, file)| (file, Some((start, end))),
    )
    .parse(input)
}

fn bare_entry_combinator(input: &str) -> IResult<&str, (String, Option<(NaiveDate, NaiveDate)>)> {
    map(string_till_separator_parser, |file| (file, None)).parse(input)
}

fn parse_entry(entry: &str, base_dir: &Path) -> PResult<ManifestEntry> {
    let (_, (file, window)) =
        all_consuming(alt((dated_entry_combinator, bare_entry_combinator))).parse(entry)?;
    if file.is_empty() {
        return Err(ParsingError::Unknown(format!(
            "Manifest entry '{entry}' has no file name"
        )));
    }
    if let Some((start, end)) = window {
        if start > end {
            return Err(ParsingError::Unknown(format!(
                "Manifest entry '{entry}' ends before it starts"
            )));
        }
    }
    Ok(ManifestEntry::new(base_dir.join(file), window))
}

/// Splits the manifest into its entries. File names are resolved against `base_dir`.
///
/// Every entry is read on its own, so an invalid entry does not hide the others.
pub fn parse(manifest: &str, base_dir: &Path) -> Vec<PResult<ManifestEntry>> {
    log::info!("Parsing manifest...");
    manifest
        .split(';')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| parse_entry(entry, base_dir))
        .collect()
}
