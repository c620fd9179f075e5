// A HASTUS dispatch line carries 7 fields, either comma separated or packed in the first
// field and separated by `;`:
//
// `WeekdayDecReduced;L599;1008;599 - 1;05:12;Seatac/Airport Stn Rail & Intl Blvd S/S 176 St;North`
//
// service token, route marker, trip number, run descriptor, scheduled time, stop token (a
// numeric code or a stop name) and direction.
use std::str::FromStr;

use chrono::NaiveDate;

use crate::{
    models::{Direction, EntityId},
    parsing::{
        error::ParsingError,
        helpers::{parse_run, parse_time},
    },
    utils::block_id,
};

const FIELD_COUNT: usize = 7;

/// Trip numbers below this value mark administrative rows.
const FIRST_TRIP_NUMBER: i32 = 1000;

/// Stop names known to be mis-encoded in the dispatch exports, with their replacement.
const STOP_NAME_FIXES: [(&str, &str); 2] = [
    ("Tukwila Int\u{FFFD}l Blvd Station", "Tukwila Int'l Blvd Station"),
    ("Tukwila Int\u{EF}\u{BF}\u{BD}l Blvd Station", "Tukwila Int'l Blvd Station"),
];

// ------------------------------------------------------------------------------------------------
// --- DispatchContext
// ------------------------------------------------------------------------------------------------

/// Everything a dispatch line needs, besides its own fields, to derive its identities.
#[derive(Clone, Debug)]
pub struct DispatchContext {
    agency: String,
    route_id: EntityId,
    label_prefix: String,
    scope: Option<(NaiveDate, NaiveDate)>,
    run_prefix: String,
}

impl DispatchContext {
    pub fn new(
        agency: String,
        route_id: EntityId,
        label_prefix: String,
        scope: Option<(NaiveDate, NaiveDate)>,
        run_prefix: String,
    ) -> Self {
        Self {
            agency,
            route_id,
            label_prefix,
            scope,
            run_prefix,
        }
    }

    // Getters/Setters

    pub fn agency(&self) -> &str {
        &self.agency
    }

    pub fn route_id(&self) -> &EntityId {
        &self.route_id
    }

    pub fn scope(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.scope
    }

    // Functions

    /// `LLRWeekday` for a bare manifest entry, `LLR_20210421_20211121_Weekday` for a dated one.
    pub fn label(&self, service_token: &str) -> String {
        match self.scope {
            Some((start, end)) => format!(
                "{}_{}_{}_{}",
                self.label_prefix,
                start.format("%Y%m%d"),
                end.format("%Y%m%d"),
                service_token
            ),
            None => format!("{}{}", self.label_prefix, service_token),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// --- DispatchRecord
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct DispatchRecord {
    service_token: String,
    route: String,
    run: i32,
    trip_number: String,
    time: u32,
    stop: String,
    direction: Direction,
    service_id: EntityId,
    block_id: i32,
    trip_id: EntityId,
    route_id: EntityId,
}

impl DispatchRecord {
    // Getters/Setters

    pub fn service_token(&self) -> &str {
        &self.service_token
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn run(&self) -> i32 {
        self.run
    }

    /// The trip token as written in the file, leading zeros included.
    pub fn trip_number(&self) -> &str {
        &self.trip_number
    }

    /// Seconds since the start of the service day.
    pub fn time(&self) -> u32 {
        self.time
    }

    /// A numeric stop code or a stop name.
    pub fn stop(&self) -> &str {
        &self.stop
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn service_id(&self) -> &EntityId {
        &self.service_id
    }

    pub fn block_id(&self) -> i32 {
        self.block_id
    }

    pub fn trip_id(&self) -> &EntityId {
        &self.trip_id
    }

    pub fn route_id(&self) -> &EntityId {
        &self.route_id
    }
}

// ------------------------------------------------------------------------------------------------
// --- LineOutcome
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    FieldCount(usize),
    EmptyField(usize),
    MissingRoute,
    NotATrip(String),
    Administrative(i32),
}

#[derive(Debug)]
pub enum LineOutcome {
    Parsed(DispatchRecord),
    Skip(SkipReason),
    Error(ParsingError),
}

// ------------------------------------------------------------------------------------------------
// --- Parsing
// ------------------------------------------------------------------------------------------------

fn split_fields(tokens: Vec<String>) -> Vec<String> {
    if tokens.len() == FIELD_COUNT {
        return tokens.into_iter().map(|token| token.trim().to_string()).collect();
    }
    tokens
        .first()
        .map(|first| first.split(';').map(|field| field.trim().to_string()).collect())
        .unwrap_or_default()
}

fn fix_stop_name(stop: &str) -> String {
    STOP_NAME_FIXES
        .iter()
        .find(|(broken, _)| *broken == stop)
        .map_or_else(|| stop.to_string(), |(_, fixed)| fixed.to_string())
}

fn parse_direction(value: &str) -> Result<Direction, ParsingError> {
    Direction::from_str(value).map_err(|_| ParsingError::UnknownDirection(value.to_string()))
}

/// Turns the tokens of one dispatch line into a record.
///
/// Header, footer and administrative rows are skipped, as are lines with an empty field. A line
/// that looks like a trip but whose run, time or direction cannot be read is an error.
pub fn parse_record(tokens: Vec<String>, context: &DispatchContext) -> LineOutcome {
    let fields = split_fields(tokens);
    if fields.len() < FIELD_COUNT {
        return LineOutcome::Skip(SkipReason::FieldCount(fields.len()));
    }
    if let Some(index) = fields[..FIELD_COUNT].iter().position(|field| field.is_empty()) {
        return LineOutcome::Skip(SkipReason::EmptyField(index));
    }

    // The first character is a marker, e.g. L599.
    let route: String = fields[1].chars().skip(1).collect();
    if route.is_empty() {
        return LineOutcome::Skip(SkipReason::MissingRoute);
    }

    match fields[2].parse::<i32>() {
        Ok(value) if value < FIRST_TRIP_NUMBER => {
            return LineOutcome::Skip(SkipReason::Administrative(value));
        }
        Ok(_) => {}
        Err(_) => return LineOutcome::Skip(SkipReason::NotATrip(fields[2].clone())),
    }
    let trip_number = fields[2].clone();

    let run = match parse_run(&fields[3], &context.run_prefix) {
        Ok(run) => run,
        Err(e) => return LineOutcome::Error(e),
    };
    let time = match parse_time(&fields[4]) {
        Ok(time) => time,
        Err(e) => return LineOutcome::Error(e),
    };
    let direction = match parse_direction(&fields[6]) {
        Ok(direction) => direction,
        Err(e) => return LineOutcome::Error(e),
    };

    let service_token = fields[0].clone();
    let label = context.label(&service_token);
    let service_id = EntityId::new(&context.agency, &label);
    let trip_id = EntityId::new(&context.agency, &format!("{label}{trip_number}"));

    LineOutcome::Parsed(DispatchRecord {
        block_id: block_id(&service_id, run),
        service_token,
        route,
        run,
        trip_number,
        time,
        stop: fix_stop_name(&fields[5]),
        direction,
        service_id,
        trip_id,
        route_id: context.route_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn context() -> DispatchContext {
        DispatchContext::new(
            "40".to_string(),
            EntityId::new("40", "100479"),
            "LLR".to_string(),
            None,
            "599 -".to_string(),
        )
    }

    fn tokens(line: &str) -> Vec<String> {
        line.split(',').map(String::from).collect()
    }

    fn parsed(outcome: LineOutcome) -> DispatchRecord {
        match outcome {
            LineOutcome::Parsed(record) => record,
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn semicolon_packed_line() {
        let record = parsed(parse_record(
            tokens("WeekdayDecReduced;L599;1008;599 - 1;05:12;30003;North"),
            &context(),
        ));
        assert_eq!(record.service_token(), "WeekdayDecReduced");
        assert_eq!(record.route(), "599");
        assert_eq!(record.run(), 1);
        assert_eq!(record.trip_number(), "1008");
        assert_eq!(record.time(), 5 * 3600 + 12 * 60);
        assert_eq!(record.stop(), "30003");
        assert_eq!(record.direction(), Direction::North);
        assert_eq!(record.service_id().to_string(), "40_LLRWeekdayDecReduced");
        assert_eq!(record.trip_id().to_string(), "40_LLRWeekdayDecReduced1008");
        assert_eq!(record.route_id().to_string(), "40_100479");
        assert_eq!(
            record.block_id(),
            block_id(&EntityId::new("40", "LLRWeekdayDecReduced"), 1)
        );
    }

    #[test]
    fn comma_separated_line() {
        let record = parsed(parse_record(
            tokens(" WeekdayDecReduced , L599 ,1010, 599 - 2 ,23:58,Beacon Hill Stn Tun & Beacon Av S/S Lander St,South"),
            &context(),
        ));
        assert_eq!(record.service_token(), "WeekdayDecReduced");
        assert_eq!(record.route(), "599");
        assert_eq!(record.run(), 2);
        assert_eq!(record.stop(), "Beacon Hill Stn Tun & Beacon Av S/S Lander St");
        assert_eq!(record.direction(), Direction::South);
    }

    #[test]
    fn dated_scope_is_part_of_the_identities() {
        let context = DispatchContext::new(
            "40".to_string(),
            EntityId::new("40", "100479"),
            "LLR".to_string(),
            Some((
                NaiveDate::from_ymd_opt(2021, 4, 21).unwrap(),
                NaiveDate::from_ymd_opt(2021, 11, 21).unwrap(),
            )),
            "599 -".to_string(),
        );
        let record = parsed(parse_record(
            tokens("Saturday;L599;1008;599 - 1;05:12;30003;North"),
            &context,
        ));
        assert_eq!(record.service_id().id(), "LLR_20210421_20211121_Saturday");
        assert_eq!(record.trip_id().id(), "LLR_20210421_20211121_Saturday1008");
    }

    #[test]
    fn skipped_lines() {
        let context = context();
        assert!(matches!(
            parse_record(tokens("Service;Route;Trip;Run;Time;Stop"), &context),
            LineOutcome::Skip(SkipReason::FieldCount(6))
        ));
        assert!(matches!(
            parse_record(vec![], &context),
            LineOutcome::Skip(SkipReason::FieldCount(0))
        ));
        assert!(matches!(
            parse_record(tokens("WeekdayDecReduced;;1008;599 - 1;05:12;30003;North"), &context),
            LineOutcome::Skip(SkipReason::EmptyField(1))
        ));
        assert!(matches!(
            parse_record(tokens("Total;;;;;;"), &context),
            LineOutcome::Skip(SkipReason::EmptyField(1))
        ));
        assert!(matches!(
            parse_record(tokens("WeekdayDecReduced;L;1008;599 - 1;05:12;30003;North"), &context),
            LineOutcome::Skip(SkipReason::MissingRoute)
        ));
        assert!(matches!(
            parse_record(
                tokens("Service;Route;Trip;Run;Time;Stop;Direction"),
                &context
            ),
            LineOutcome::Skip(SkipReason::NotATrip(_))
        ));
        assert_eq!(
            match parse_record(
                tokens("WeekdayDecReduced;L599;999;599 - 1;05:12;30003;North"),
                &context
            ) {
                LineOutcome::Skip(reason) => reason,
                other => panic!("expected a skip, got {other:?}"),
            },
            SkipReason::Administrative(999)
        );
    }

    #[test]
    fn empty_fields_are_skipped() {
        let context = context();
        for (index, line) in [
            (0, ";L599;1008;599 - 1;05:12;30003;North"),
            (2, "WeekdayDecReduced;L599; ;599 - 1;05:12;30003;North"),
            (3, "WeekdayDecReduced;L599;1008;;05:12;30003;North"),
            (4, "WeekdayDecReduced;L599;1008;599 - 1;;30003;North"),
            (5, "WeekdayDecReduced;L599;1008;599 - 1;05:12;;North"),
            (6, "WeekdayDecReduced;L599;1008;599 - 1;05:12;30003; "),
        ] {
            match parse_record(tokens(line), &context) {
                LineOutcome::Skip(reason) => assert_eq!(reason, SkipReason::EmptyField(index)),
                other => panic!("expected a skip for {line}, got {other:?}"),
            }
        }
    }

    #[test]
    fn trip_token_is_kept_verbatim() {
        let record = parsed(parse_record(
            tokens("WeekdayDecReduced;L599;01008;599 - 1;05:12;30003;North"),
            &context(),
        ));
        assert_eq!(record.trip_number(), "01008");
        assert_eq!(record.trip_id().id(), "LLRWeekdayDecReduced01008");
    }

    #[test]
    fn erroneous_lines() {
        let context = context();
        assert!(matches!(
            parse_record(tokens("WeekdayDecReduced;L599;1008;599 - X;05:12;30003;North"), &context),
            LineOutcome::Error(ParsingError::InvalidRun(_))
        ));
        assert!(matches!(
            parse_record(tokens("WeekdayDecReduced;L599;1008;599 - 1;5h12;30003;North"), &context),
            LineOutcome::Error(ParsingError::InvalidTime(_))
        ));
        assert!(matches!(
            parse_record(tokens("WeekdayDecReduced;L599;1008;599 - 1;05:12;30003;East"), &context),
            LineOutcome::Error(ParsingError::UnknownDirection(_))
        ));
    }

    #[test]
    fn mis_encoded_stop_names() {
        let context = context();
        for name in [
            "Tukwila Int\u{FFFD}l Blvd Station",
            "Tukwila Int\u{EF}\u{BF}\u{BD}l Blvd Station",
            "Tukwila Int'l Blvd Station",
        ] {
            let line = format!("WeekdayDecReduced;L599;1008;599 - 1;05:12;{name};North");
            let record = parsed(parse_record(tokens(&line), &context));
            assert_eq!(record.stop(), "Tukwila Int'l Blvd Station");
        }
    }

    #[test]
    fn identical_inputs_share_their_identities() {
        let context = context();
        let first = parsed(parse_record(
            tokens("WeekdayDecReduced;L599;1008;599 - 1;05:12;30003;North"),
            &context,
        ));
        let second = parsed(parse_record(
            tokens("WeekdayDecReduced;L599;1008;599 - 1;05:20;30002;North"),
            &context,
        ));
        assert_eq!(first.trip_id(), second.trip_id());
        assert_eq!(first.block_id(), second.block_id());
    }
}
