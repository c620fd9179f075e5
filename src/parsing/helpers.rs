/// Here we will define all the parsing Helper functions
/// Such as primitive parsers
use chrono::NaiveDate;
use nom::{
    IResult, Parser,
    bytes::complete::is_not,
    character::complete::{char, i32, u32},
    combinator::{all_consuming, map, opt, verify},
    sequence::preceded,
};

use crate::{
    parsing::error::{PResult, ParsingError},
    utils::seconds_from_hms,
};

/// `HH:MM[:SS]` to seconds since midnight. Hours may exceed 23 for trips running past
/// midnight.
pub(crate) fn time_parser(input: &str) -> IResult<&str, u32> {
    map(
        (
            verify(u32, |hours: &u32| *hours < 100),
            preceded(char(':'), verify(u32, |minutes: &u32| *minutes < 60)),
            opt(preceded(
                char(':'),
                verify(u32, |seconds: &u32| *seconds < 60),
            )),
        ),
        |(hours, minutes, seconds)| seconds_from_hms(hours, minutes, seconds.unwrap_or(0)),
    )
    .parse(input)
}

/// `yyyy-mm-dd`, the date is not validated.
pub(crate) fn ymd_parser(input: &str) -> IResult<&str, (i32, u32, u32)> {
    (i32, preceded(char('-'), u32), preceded(char('-'), u32)).parse(input)
}

pub(crate) fn string_till_separator_parser(input: &str) -> IResult<&str, String> {
    map(is_not(";"), |s: &str| s.trim().to_string()).parse(input)
}

pub(crate) fn parse_time(value: &str) -> PResult<u32> {
    let (_, seconds) = all_consuming(time_parser)
        .parse(value.trim())
        .map_err(|_| ParsingError::InvalidTime(value.to_string()))?;
    Ok(seconds)
}

pub(crate) fn parse_date(value: &str) -> PResult<NaiveDate> {
    let (_, (year, month, day)) = all_consuming(ymd_parser).parse(value.trim())?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(ParsingError::UnableToBuildDate(year, month, day))
}

/// The run descriptor is the run number with a route prefix, e.g. `599 - 12`.
pub(crate) fn parse_run(value: &str, prefix: &str) -> PResult<i32> {
    let stripped = if prefix.is_empty() {
        value.to_string()
    } else {
        value.replace(prefix, "")
    };
    stripped
        .trim()
        .parse::<i32>()
        .map_err(|_| ParsingError::InvalidRun(value.to_string()))
}
