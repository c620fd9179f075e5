// Reads the base GTFS feed into a `DataStorage` and writes the reconciled store back as GTFS
// text files. Ids of the feed are scoped by the first agency of agency.txt, routes by their own
// agency_id when they have one.
use std::{
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use zip::{ZipArchive, result::ZipError};

use crate::{
    error::{RResult, ReconcileError},
    models::{
        Agency, Direction, EntityId, Model, Route, ServiceCalendar, ShapePoint, Stop, StopTime,
        Trip,
    },
    parsing::{error::ParsingError, helpers::parse_time},
    storage::{DataStorage, ScheduleStore},
    utils::format_seconds,
};

const GTFS_DATE_FORMAT: &str = "%Y%m%d";

// ------------------------------------------------------------------------------------------------
// --- FeedSource
// ------------------------------------------------------------------------------------------------

enum FeedSource {
    Directory(PathBuf),
    Zip(ZipArchive<File>),
}

impl FeedSource {
    fn open(path: &Path) -> RResult<Self> {
        if path.is_dir() {
            Ok(FeedSource::Directory(path.to_path_buf()))
        } else {
            Ok(FeedSource::Zip(ZipArchive::new(File::open(path)?)?))
        }
    }

    fn read(&mut self, name: &str) -> RResult<Option<Vec<u8>>> {
        match self {
            FeedSource::Directory(dir) => {
                let path = dir.join(name);
                if !path.exists() {
                    return Ok(None);
                }
                Ok(Some(fs::read(path)?))
            }
            FeedSource::Zip(archive) => match archive.by_name(name) {
                Ok(mut file) => {
                    let mut buffer = Vec::new();
                    file.read_to_end(&mut buffer)?;
                    Ok(Some(buffer))
                }
                Err(ZipError::FileNotFound) => Ok(None),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn read_records<R: DeserializeOwned>(&mut self, name: &str) -> RResult<Option<Vec<R>>> {
        let Some(bytes) = self.read(name)? else {
            return Ok(None);
        };
        let records = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes.as_slice())
            .deserialize()
            .collect::<Result<Vec<R>, csv::Error>>()?;
        Ok(Some(records))
    }

    fn required_records<R: DeserializeOwned>(&mut self, name: &str) -> RResult<Vec<R>> {
        self.read_records(name)?
            .ok_or_else(|| ReconcileError::MissingFeedFile(name.to_string()))
    }
}

// ------------------------------------------------------------------------------------------------
// --- Records
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct AgencyRecord {
    agency_id: Option<String>,
    agency_name: String,
    agency_url: String,
    agency_timezone: String,
    agency_lang: Option<String>,
    agency_phone: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct StopRecord {
    stop_id: String,
    stop_code: Option<String>,
    stop_name: String,
    stop_lat: f64,
    stop_lon: f64,
    location_type: Option<u8>,
    parent_station: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RouteRecord {
    route_id: String,
    agency_id: Option<String>,
    route_short_name: Option<String>,
    route_long_name: Option<String>,
    route_desc: Option<String>,
    route_type: i16,
}

#[derive(Serialize, Deserialize)]
struct CalendarRecord {
    service_id: String,
    monday: u8,
    tuesday: u8,
    wednesday: u8,
    thursday: u8,
    friday: u8,
    saturday: u8,
    sunday: u8,
    start_date: String,
    end_date: String,
}

#[derive(Serialize, Deserialize)]
struct TripRecord {
    route_id: String,
    service_id: String,
    trip_id: String,
    trip_short_name: Option<String>,
    trip_headsign: Option<String>,
    direction_id: Option<u8>,
    block_id: Option<String>,
    shape_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct StopTimeRecord {
    trip_id: String,
    arrival_time: Option<String>,
    departure_time: Option<String>,
    stop_id: String,
    stop_sequence: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct ShapeRecord {
    shape_id: String,
    shape_pt_lat: f64,
    shape_pt_lon: f64,
    shape_pt_sequence: u32,
    shape_dist_traveled: Option<f64>,
}

#[derive(Serialize, Deserialize)]
struct BlockRecord {
    block_id: i32,
    block_seq_num: i32,
    block_route_num: String,
    block_run_num: i32,
}

// ------------------------------------------------------------------------------------------------
// --- Loading
// ------------------------------------------------------------------------------------------------

/// Loads a feed from a directory or a `.zip` archive.
///
/// agency.txt, stops.txt and routes.txt are required, the other files are read when present.
pub fn load(path: &Path) -> RResult<DataStorage> {
    log::info!("Loading GTFS feed {}...", path.display());
    let now = Instant::now();
    let mut source = FeedSource::open(path)?;
    let mut store = DataStorage::new();

    let agency = load_agencies(&mut store, source.required_records("agency.txt")?)?;
    load_stops(&mut store, &agency, source.required_records("stops.txt")?);
    let route_agencies = load_routes(&mut store, &agency, source.required_records("routes.txt")?);
    if let Some(records) = source.read_records("calendar.txt")? {
        load_calendars(&mut store, &agency, records)?;
    }
    if let Some(records) = source.read_records("trips.txt")? {
        load_trips(&mut store, &agency, &route_agencies, records);
    }
    if let Some(records) = source.read_records("stop_times.txt")? {
        load_stop_times(&mut store, &agency, records)?;
    }
    if let Some(records) = source.read_records("shapes.txt")? {
        load_shapes(&mut store, &agency, records);
    }

    log::info!(
        "{} stops, {} routes and {} trips loaded in {:.2?}",
        store.stops().len(),
        store.routes().len(),
        store.trips().len(),
        now.elapsed()
    );
    Ok(store)
}

fn invalid_value(file: &str, index: usize, value: &str, error: ParsingError) -> ReconcileError {
    ReconcileError::Parsing {
        error,
        file: file.to_string(),
        line: value.to_string(),
        // The header is line 1.
        line_number: index + 2,
    }
}

fn parse_gtfs_date(file: &str, index: usize, value: &str) -> RResult<NaiveDate> {
    NaiveDate::parse_from_str(value, GTFS_DATE_FORMAT).map_err(|e| {
        invalid_value(file, index, value, ParsingError::Unknown(e.to_string()))
    })
}

fn parse_gtfs_time(file: &str, index: usize, value: Option<&str>) -> RResult<Option<u32>> {
    match value.filter(|value| !value.is_empty()) {
        Some(value) => parse_time(value)
            .map(Some)
            .map_err(|e| invalid_value(file, index, value, e)),
        None => Ok(None),
    }
}

/// Returns the default agency, the first one of the file.
fn load_agencies(store: &mut DataStorage, records: Vec<AgencyRecord>) -> RResult<String> {
    let mut default_agency = None;
    for record in records {
        // Single agency feeds may omit the id.
        let id = record
            .agency_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| record.agency_name.clone());
        let mut agency = Agency::new(
            id.clone(),
            record.agency_name,
            record.agency_url,
            record.agency_timezone,
        );
        agency.set_lang(record.agency_lang);
        agency.set_phone(record.agency_phone);
        store.add_agency(agency);
        default_agency.get_or_insert(id);
    }
    default_agency.ok_or(ReconcileError::MissingAgency)
}

fn load_stops(store: &mut DataStorage, agency: &str, records: Vec<StopRecord>) {
    for record in records {
        let mut stop = Stop::new(
            EntityId::new(agency, &record.stop_id),
            record.stop_code.unwrap_or_default(),
            record.stop_name,
            record.stop_lat,
            record.stop_lon,
        );
        stop.set_location_type(record.location_type);
        stop.set_parent_station(record.parent_station);
        store.add_stop(stop);
    }
}

/// Returns the agency of each route id.
fn load_routes(
    store: &mut DataStorage,
    agency: &str,
    records: Vec<RouteRecord>,
) -> FxHashMap<String, String> {
    let mut route_agencies = FxHashMap::default();
    for record in records {
        let route_agency = record
            .agency_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| agency.to_string());
        let mut route = Route::new(
            EntityId::new(&route_agency, &record.route_id),
            record.route_short_name.unwrap_or_default(),
            record.route_long_name.unwrap_or_default(),
            record.route_type,
        );
        route.set_description(record.route_desc);
        store.add_route(route);
        route_agencies.insert(record.route_id, route_agency);
    }
    route_agencies
}

fn load_calendars(
    store: &mut DataStorage,
    agency: &str,
    records: Vec<CalendarRecord>,
) -> RResult<()> {
    for (index, record) in records.into_iter().enumerate() {
        let mut calendar = ServiceCalendar::new(
            EntityId::new(agency, &record.service_id),
            parse_gtfs_date("calendar.txt", index, &record.start_date)?,
            parse_gtfs_date("calendar.txt", index, &record.end_date)?,
        );
        calendar.set_days([
            record.monday,
            record.tuesday,
            record.wednesday,
            record.thursday,
            record.friday,
            record.saturday,
            record.sunday,
        ]);
        store.save_calendar(calendar);
    }
    Ok(())
}

fn load_trips(
    store: &mut DataStorage,
    agency: &str,
    route_agencies: &FxHashMap<String, String>,
    records: Vec<TripRecord>,
) {
    for record in records {
        let route_agency = route_agencies
            .get(&record.route_id)
            .map_or(agency, String::as_str);
        let mut trip = Trip::new(
            EntityId::new(agency, &record.trip_id),
            EntityId::new(route_agency, &record.route_id),
            EntityId::new(agency, &record.service_id),
            record.trip_short_name.unwrap_or_default(),
        );
        trip.set_headsign(record.trip_headsign);
        trip.set_direction(record.direction_id.and_then(Direction::from_direction_id));
        trip.set_block_id(record.block_id.filter(|id| !id.is_empty()));
        trip.set_shape_id(
            record
                .shape_id
                .filter(|id| !id.is_empty())
                .map(|id| EntityId::new(agency, &id)),
        );
        store.save_trip(trip);
    }
}

fn load_stop_times(
    store: &mut DataStorage,
    agency: &str,
    records: Vec<StopTimeRecord>,
) -> RResult<()> {
    for (index, record) in records.into_iter().enumerate() {
        let id = store.next_stop_time_id();
        let mut stop_time = StopTime::new(
            id,
            EntityId::new(agency, &record.trip_id),
            EntityId::new(agency, &record.stop_id),
            parse_gtfs_time("stop_times.txt", index, record.arrival_time.as_deref())?,
            parse_gtfs_time("stop_times.txt", index, record.departure_time.as_deref())?,
        );
        if let Some(sequence) = record.stop_sequence {
            stop_time.set_stop_sequence(sequence);
        }
        store.save_stop_time(stop_time);
    }
    Ok(())
}

fn load_shapes(store: &mut DataStorage, agency: &str, records: Vec<ShapeRecord>) {
    for record in records {
        let id = store.next_shape_point_id();
        store.add_shape_point(ShapePoint::new(
            id,
            EntityId::new(agency, &record.shape_id),
            record.shape_pt_lat,
            record.shape_pt_lon,
            record.shape_pt_sequence,
            record.shape_dist_traveled,
        ));
    }
}

// ------------------------------------------------------------------------------------------------
// --- Writing
// ------------------------------------------------------------------------------------------------

fn write_records<R: Serialize>(dir: &Path, name: &str, records: Vec<R>) -> RResult<()> {
    let mut writer = csv::Writer::from_path(dir.join(name))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the store as GTFS text files, block.txt included.
pub fn write(store: &DataStorage, dir: &Path) -> RResult<()> {
    log::info!("Writing GTFS feed to {}...", dir.display());
    fs::create_dir_all(dir)?;

    let agencies = store
        .agencies()
        .into_iter()
        .map(|agency| AgencyRecord {
            agency_id: Some(agency.id()),
            agency_name: agency.name().to_string(),
            agency_url: agency.url().to_string(),
            agency_timezone: agency.timezone().to_string(),
            agency_lang: agency.lang().map(String::from),
            agency_phone: agency.phone().map(String::from),
        })
        .collect();
    write_records(dir, "agency.txt", agencies)?;

    let stops: Vec<StopRecord> = store
        .stops()
        .into_iter()
        .map(|stop| StopRecord {
            stop_id: stop.id().id().to_string(),
            stop_code: Some(stop.code().to_string()).filter(|code| !code.is_empty()),
            stop_name: stop.name().to_string(),
            stop_lat: stop.latitude(),
            stop_lon: stop.longitude(),
            location_type: stop.location_type(),
            parent_station: stop.parent_station().map(String::from),
        })
        .collect();
    write_records(dir, "stops.txt", stops)?;

    let routes: Vec<RouteRecord> = store
        .routes()
        .into_iter()
        .map(|route| RouteRecord {
            route_id: route.id().id().to_string(),
            agency_id: Some(route.id().agency().to_string()),
            route_short_name: Some(route.short_name().to_string()),
            route_long_name: Some(route.long_name().to_string()),
            route_desc: route.description().map(String::from),
            route_type: route.route_type(),
        })
        .collect();
    write_records(dir, "routes.txt", routes)?;

    let calendars: Vec<CalendarRecord> = store
        .calendars()
        .into_iter()
        .map(|calendar| {
            let [monday, tuesday, wednesday, thursday, friday, saturday, sunday] = calendar.days();
            CalendarRecord {
                service_id: calendar.service_id().id().to_string(),
                monday,
                tuesday,
                wednesday,
                thursday,
                friday,
                saturday,
                sunday,
                start_date: calendar.start_date().format(GTFS_DATE_FORMAT).to_string(),
                end_date: calendar.end_date().format(GTFS_DATE_FORMAT).to_string(),
            }
        })
        .collect();
    write_records(dir, "calendar.txt", calendars)?;

    let trips: Vec<TripRecord> = store
        .trips()
        .into_iter()
        .map(|trip| TripRecord {
            route_id: trip.route_id().id().to_string(),
            service_id: trip.service_id().id().to_string(),
            trip_id: trip.id().id().to_string(),
            trip_short_name: Some(trip.short_name().to_string()),
            trip_headsign: trip.headsign().map(String::from),
            direction_id: trip.direction().map(|direction| direction.direction_id()),
            block_id: trip.block_id().map(String::from),
            shape_id: trip.shape_id().map(|shape_id| shape_id.id().to_string()),
        })
        .collect();
    write_records(dir, "trips.txt", trips)?;

    let mut stop_times = store.stop_times();
    stop_times.sort_by(|a, b| {
        (a.trip_id(), a.stop_sequence()).cmp(&(b.trip_id(), b.stop_sequence()))
    });
    let stop_times: Vec<StopTimeRecord> = stop_times
        .into_iter()
        .map(|stop_time| StopTimeRecord {
            trip_id: stop_time.trip_id().id().to_string(),
            arrival_time: stop_time.arrival_time().map(format_seconds),
            departure_time: stop_time.departure_time().map(format_seconds),
            stop_id: stop_time.stop_id().id().to_string(),
            stop_sequence: stop_time.stop_sequence(),
        })
        .collect();
    write_records(dir, "stop_times.txt", stop_times)?;

    let shapes: Vec<ShapeRecord> = store
        .shape_points()
        .into_iter()
        .map(|shape_point| ShapeRecord {
            shape_id: shape_point.shape_id().id().to_string(),
            shape_pt_lat: shape_point.latitude(),
            shape_pt_lon: shape_point.longitude(),
            shape_pt_sequence: shape_point.sequence(),
            shape_dist_traveled: shape_point.dist_traveled(),
        })
        .collect();
    write_records(dir, "shapes.txt", shapes)?;

    let blocks: Vec<BlockRecord> = store
        .blocks()
        .into_iter()
        .map(|block| BlockRecord {
            block_id: block.id(),
            block_seq_num: block.sequence(),
            block_route_num: block.route().to_string(),
            block_run_num: block.run(),
        })
        .collect();
    write_records(dir, "block.txt", blocks)?;

    Ok(())
}
