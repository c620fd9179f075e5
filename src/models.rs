use std::{fmt, hash::Hash};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{self, Display, EnumString};

// ------------------------------------------------------------------------------------------------
// --- Model
// ------------------------------------------------------------------------------------------------

pub trait Model<M: Model<M>> {
    // Primary key type.
    type K: Clone + Eq + Hash + Serialize + for<'a> Deserialize<'a>;

    fn id(&self) -> M::K;
}

macro_rules! impl_Model {
    ($m:ty, $k:ty) => {
        impl Model<$m> for $m {
            type K = $k;

            fn id(&self) -> Self::K {
                self.id.clone()
            }
        }
    };
}

// ------------------------------------------------------------------------------------------------
// --- EntityId
// ------------------------------------------------------------------------------------------------

/// An identifier scoped by the agency that owns the entity, written `agency_id`.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct EntityId {
    agency: String,
    id: String,
}

impl EntityId {
    pub fn new(agency: &str, id: &str) -> Self {
        Self {
            agency: agency.to_string(),
            id: id.to_string(),
        }
    }

    // Getters/Setters

    pub fn agency(&self) -> &str {
        &self.agency
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.agency, self.id)
    }
}

// ------------------------------------------------------------------------------------------------
// --- Agency
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct Agency {
    id: String,
    name: String,
    url: String,
    timezone: String,
    lang: Option<String>,
    phone: Option<String>,
}

impl_Model!(Agency, String);

impl Agency {
    pub fn new(id: String, name: String, url: String, timezone: String) -> Self {
        Self {
            id,
            name,
            url,
            timezone,
            lang: None,
            phone: None,
        }
    }

    // Getters/Setters

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn set_lang(&mut self, value: Option<String>) {
        self.lang = value;
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn set_phone(&mut self, value: Option<String>) {
        self.phone = value;
    }
}

// ------------------------------------------------------------------------------------------------
// --- Block
// ------------------------------------------------------------------------------------------------

/// A vehicle run: the trips it operates share the same block id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Block {
    id: i32,
    sequence: i32,
    route: String,
    run: i32,
}

impl_Model!(Block, i32);

impl Block {
    pub fn new(id: i32, sequence: i32, route: String, run: i32) -> Self {
        Self {
            id,
            sequence,
            route,
            run,
        }
    }

    // Getters/Setters

    pub fn sequence(&self) -> i32 {
        self.sequence
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn run(&self) -> i32 {
        self.run
    }
}

// ------------------------------------------------------------------------------------------------
// --- Direction
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, EnumString, Serialize, Deserialize)]
pub enum Direction {
    #[strum(serialize = "South")]
    South,

    #[strum(serialize = "North")]
    North,
}

impl Direction {
    pub fn from_direction_id(value: u8) -> Option<Self> {
        match value {
            0 => Some(Direction::South),
            1 => Some(Direction::North),
            _ => None,
        }
    }

    /// GTFS `direction_id`.
    pub fn direction_id(&self) -> u8 {
        match self {
            Direction::South => 0,
            Direction::North => 1,
        }
    }

    /// Platform-specific stops carry this suffix in their stop code.
    pub fn stop_code_suffix(&self) -> &'static str {
        match self {
            Direction::South => "-T1",
            Direction::North => "-T2",
        }
    }
}

// ------------------------------------------------------------------------------------------------
// --- Route
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct Route {
    id: EntityId,
    short_name: String,
    long_name: String,
    description: Option<String>,
    route_type: i16,
}

impl_Model!(Route, EntityId);

impl Route {
    pub fn new(id: EntityId, short_name: String, long_name: String, route_type: i16) -> Self {
        Self {
            id,
            short_name,
            long_name,
            description: None,
            route_type,
        }
    }

    // Getters/Setters

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, value: Option<String>) {
        self.description = value;
    }

    pub fn route_type(&self) -> i16 {
        self.route_type
    }
}

// ------------------------------------------------------------------------------------------------
// --- ServiceCalendar
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceCalendar {
    id: EntityId, // The service id.
    monday: u8,
    tuesday: u8,
    wednesday: u8,
    thursday: u8,
    friday: u8,
    saturday: u8,
    sunday: u8,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl_Model!(ServiceCalendar, EntityId);

impl ServiceCalendar {
    /// A calendar without any active day.
    pub fn new(id: EntityId, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id,
            monday: 0,
            tuesday: 0,
            wednesday: 0,
            thursday: 0,
            friday: 0,
            saturday: 0,
            sunday: 0,
            start_date,
            end_date,
        }
    }

    // Getters/Setters

    pub fn service_id(&self) -> &EntityId {
        &self.id
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Monday to Sunday.
    pub fn days(&self) -> [u8; 7] {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ]
    }

    pub fn set_days(&mut self, days: [u8; 7]) {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ] = days;
    }

    pub fn thursday(&self) -> u8 {
        self.thursday
    }

    pub fn saturday(&self) -> u8 {
        self.saturday
    }

    pub fn sunday(&self) -> u8 {
        self.sunday
    }

    // Functions

    pub fn set_weekdays(&mut self) {
        self.monday = 1;
        self.tuesday = 1;
        self.wednesday = 1;
        self.thursday = 1;
        self.friday = 1;
    }

    pub fn set_saturday(&mut self) {
        self.saturday = 1;
    }

    pub fn set_sunday(&mut self) {
        self.sunday = 1;
    }

    pub fn has_active_day(&self) -> bool {
        self.days().iter().any(|day| *day != 0)
    }
}

// ------------------------------------------------------------------------------------------------
// --- ShapePoint
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ShapePoint {
    id: i32,
    shape_id: EntityId,
    latitude: f64,
    longitude: f64,
    sequence: u32,
    dist_traveled: Option<f64>,
}

impl_Model!(ShapePoint, i32);

impl ShapePoint {
    pub fn new(
        id: i32,
        shape_id: EntityId,
        latitude: f64,
        longitude: f64,
        sequence: u32,
        dist_traveled: Option<f64>,
    ) -> Self {
        Self {
            id,
            shape_id,
            latitude,
            longitude,
            sequence,
            dist_traveled,
        }
    }

    // Getters/Setters

    pub fn shape_id(&self) -> &EntityId {
        &self.shape_id
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn dist_traveled(&self) -> Option<f64> {
        self.dist_traveled
    }
}

// ------------------------------------------------------------------------------------------------
// --- Stop
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct Stop {
    id: EntityId,
    code: String,
    name: String,
    latitude: f64,
    longitude: f64,
    location_type: Option<u8>,
    parent_station: Option<String>,
}

impl_Model!(Stop, EntityId);

impl Stop {
    pub fn new(id: EntityId, code: String, name: String, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            code,
            name,
            latitude,
            longitude,
            location_type: None,
            parent_station: None,
        }
    }

    // Getters/Setters

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn location_type(&self) -> Option<u8> {
        self.location_type
    }

    pub fn set_location_type(&mut self, value: Option<u8>) {
        self.location_type = value;
    }

    pub fn parent_station(&self) -> Option<&str> {
        self.parent_station.as_deref()
    }

    pub fn set_parent_station(&mut self, value: Option<String>) {
        self.parent_station = value;
    }
}

// ------------------------------------------------------------------------------------------------
// --- StopTime
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StopTime {
    id: i32,
    trip_id: EntityId,
    stop_id: EntityId,
    arrival_time: Option<u32>, // Seconds since the start of the service day, may exceed 24h.
    departure_time: Option<u32>,
    stop_sequence: Option<u32>,
}

impl_Model!(StopTime, i32);

impl StopTime {
    pub fn new(
        id: i32,
        trip_id: EntityId,
        stop_id: EntityId,
        arrival_time: Option<u32>,
        departure_time: Option<u32>,
    ) -> Self {
        Self {
            id,
            trip_id,
            stop_id,
            arrival_time,
            departure_time,
            stop_sequence: None,
        }
    }

    // Getters/Setters

    pub fn trip_id(&self) -> &EntityId {
        &self.trip_id
    }

    pub fn stop_id(&self) -> &EntityId {
        &self.stop_id
    }

    pub fn arrival_time(&self) -> Option<u32> {
        self.arrival_time
    }

    pub fn departure_time(&self) -> Option<u32> {
        self.departure_time
    }

    pub fn stop_sequence(&self) -> Option<u32> {
        self.stop_sequence
    }

    pub fn set_stop_sequence(&mut self, value: u32) {
        self.stop_sequence = Some(value);
    }
}

// ------------------------------------------------------------------------------------------------
// --- Trip
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trip {
    id: EntityId,
    route_id: EntityId,
    service_id: EntityId,
    short_name: String,
    headsign: Option<String>,
    direction: Option<Direction>,
    block_id: Option<String>,
    shape_id: Option<EntityId>,
}

impl_Model!(Trip, EntityId);

impl Trip {
    pub fn new(id: EntityId, route_id: EntityId, service_id: EntityId, short_name: String) -> Self {
        Self {
            id,
            route_id,
            service_id,
            short_name,
            headsign: None,
            direction: None,
            block_id: None,
            shape_id: None,
        }
    }

    // Getters/Setters

    pub fn route_id(&self) -> &EntityId {
        &self.route_id
    }

    pub fn service_id(&self) -> &EntityId {
        &self.service_id
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn headsign(&self) -> Option<&str> {
        self.headsign.as_deref()
    }

    pub fn set_headsign(&mut self, value: Option<String>) {
        self.headsign = value;
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn set_direction(&mut self, value: Option<Direction>) {
        self.direction = value;
    }

    pub fn block_id(&self) -> Option<&str> {
        self.block_id.as_deref()
    }

    pub fn set_block_id(&mut self, value: Option<String>) {
        self.block_id = value;
    }

    pub fn shape_id(&self) -> Option<&EntityId> {
        self.shape_id.as_ref()
    }

    pub fn set_shape_id(&mut self, value: Option<EntityId>) {
        self.shape_id = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::tests::get_json_values;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn entity_id_is_displayed_with_its_agency() {
        let id = EntityId::new("40", "99903");
        assert_eq!(id.to_string(), "40_99903");
        assert_eq!(id.agency(), "40");
        assert_eq!(id.id(), "99903");
    }

    #[test]
    fn direction_tokens_and_ids() {
        assert_eq!(Direction::from_str("North").unwrap(), Direction::North);
        assert_eq!(Direction::from_str("South").unwrap(), Direction::South);
        assert!(Direction::from_str("north").is_err());
        assert!(Direction::from_str("East").is_err());

        assert_eq!(Direction::North.direction_id(), 1);
        assert_eq!(Direction::South.direction_id(), 0);
        assert_eq!(Direction::from_direction_id(1), Some(Direction::North));
        assert_eq!(Direction::from_direction_id(2), None);

        assert_eq!(Direction::South.stop_code_suffix(), "-T1");
        assert_eq!(Direction::North.stop_code_suffix(), "-T2");
    }

    #[test]
    fn calendar_day_flags() {
        let start = NaiveDate::from_ymd_opt(2021, 4, 21).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 11, 21).unwrap();
        let mut calendar = ServiceCalendar::new(EntityId::new("40", "LLRWeekday"), start, end);
        assert!(!calendar.has_active_day());

        calendar.set_weekdays();
        assert_eq!(calendar.days(), [1, 1, 1, 1, 1, 0, 0]);
        assert_eq!(calendar.thursday(), 1);

        calendar.set_days([0, 0, 0, 0, 0, 1, 1]);
        assert_eq!(calendar.thursday(), 0);
        assert_eq!(calendar.saturday(), 1);
        assert_eq!(calendar.sunday(), 1);
    }

    #[test]
    fn trip_serialization() {
        let mut trip = Trip::new(
            EntityId::new("40", "LLRWeekdayDecReduced1008"),
            EntityId::new("40", "100479"),
            EntityId::new("40", "LLRWeekdayDecReduced"),
            "1008".to_string(),
        );
        trip.set_direction(Some(Direction::North));
        trip.set_block_id(Some("1234".to_string()));

        let reference = r#"
            {
                "id": { "agency": "40", "id": "LLRWeekdayDecReduced1008" },
                "route_id": { "agency": "40", "id": "100479" },
                "service_id": { "agency": "40", "id": "LLRWeekdayDecReduced" },
                "short_name": "1008",
                "headsign": null,
                "direction": "North",
                "block_id": "1234",
                "shape_id": null
            }"#;
        let (trip, reference) = get_json_values(&trip, reference).unwrap();
        assert_eq!(trip, reference);
    }
}
