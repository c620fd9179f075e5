use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::Path,
};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::RResult,
    models::{
        Agency, Block, EntityId, Model, Route, ServiceCalendar, ShapePoint, Stop, StopTime, Trip,
    },
    utils::AutoIncrement,
};

// ------------------------------------------------------------------------------------------------
// --- ScheduleStore
// ------------------------------------------------------------------------------------------------

/// Key-addressed access to the schedule the dispatch records are reconciled into.
///
/// Every create-if-absent sequence of the pipeline is a lookup followed by a save, which is only
/// sound because the pipeline is single-threaded.
pub trait ScheduleStore {
    fn agencies(&self) -> Vec<&Agency>;

    /// Stops in catalog order (ascending id).
    fn stops(&self) -> Vec<&Stop>;

    fn stop(&self, id: &EntityId) -> Option<&Stop>;

    fn route(&self, id: &EntityId) -> Option<&Route>;

    fn calendar_for_service_id(&self, service_id: &EntityId) -> Option<&ServiceCalendar>;

    fn block(&self, id: i32) -> Option<&Block>;

    fn trip(&self, id: &EntityId) -> Option<&Trip>;

    /// Stop times of a trip in insertion order.
    fn stop_times_for_trip(&self, trip_id: &EntityId) -> Vec<&StopTime>;

    /// Trips of a block in insertion order.
    fn trips_for_block_id(&self, block_id: &str) -> Vec<&Trip>;

    fn shape_points_for_shape_id(&self, shape_id: &EntityId) -> Vec<&ShapePoint>;

    fn next_stop_time_id(&self) -> i32;

    fn save_calendar(&mut self, calendar: ServiceCalendar);

    fn save_block(&mut self, block: Block);

    fn save_trip(&mut self, trip: Trip);

    fn save_stop_time(&mut self, stop_time: StopTime);

    fn update_trip(&mut self, trip: Trip);

    fn update_stop_time(&mut self, stop_time: StopTime);
}

// ------------------------------------------------------------------------------------------------
// --- ResourceStorage
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "M: Serialize", deserialize = "M: for<'a> Deserialize<'a>"))]
pub struct ResourceStorage<M: Model<M>> {
    data: FxHashMap<M::K, M>,
}

impl<M: Model<M>> Default for ResourceStorage<M> {
    fn default() -> Self {
        Self::new(FxHashMap::default())
    }
}

impl<M: Model<M>> ResourceStorage<M> {
    pub fn new(data: FxHashMap<M::K, M>) -> Self {
        Self { data }
    }

    // Getters/Setters

    pub fn data(&self) -> &FxHashMap<M::K, M> {
        &self.data
    }

    // Functions

    pub fn find(&self, k: &M::K) -> Option<&M> {
        self.data().get(k)
    }

    pub fn contains(&self, k: &M::K) -> bool {
        self.data.contains_key(k)
    }

    /// Inserts or replaces the entry with the same key, returning the previous one.
    pub fn insert(&mut self, value: M) -> Option<M> {
        self.data.insert(value.id(), value)
    }
}

// ------------------------------------------------------------------------------------------------
// --- DataStorage
// ------------------------------------------------------------------------------------------------

/// In-memory schedule store, filled from a base GTFS feed.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DataStorage {
    agencies: ResourceStorage<Agency>,
    blocks: ResourceStorage<Block>,
    calendars: ResourceStorage<ServiceCalendar>,
    routes: ResourceStorage<Route>,
    shape_points: ResourceStorage<ShapePoint>,
    stop_times: ResourceStorage<StopTime>,
    stops: ResourceStorage<Stop>,
    trips: ResourceStorage<Trip>,

    // Insertion order of the agencies, the first one is the default agency.
    agency_order: Vec<String>,
    // Indexes
    stop_times_by_trip: FxHashMap<EntityId, Vec<i32>>,
    trips_by_block: FxHashMap<String, Vec<EntityId>>,
    shape_points_by_shape: FxHashMap<EntityId, Vec<i32>>,

    auto_increment: AutoIncrement,
}

impl DataStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // Getters/Setters

    pub fn blocks(&self) -> Vec<&Block> {
        sorted_by_id(self.blocks.data().values())
    }

    pub fn calendars(&self) -> Vec<&ServiceCalendar> {
        sorted_by_id(self.calendars.data().values())
    }

    pub fn routes(&self) -> Vec<&Route> {
        sorted_by_id(self.routes.data().values())
    }

    pub fn shape_points(&self) -> Vec<&ShapePoint> {
        sorted_by_id(self.shape_points.data().values())
    }

    pub fn stop_times(&self) -> Vec<&StopTime> {
        sorted_by_id(self.stop_times.data().values())
    }

    pub fn trips(&self) -> Vec<&Trip> {
        sorted_by_id(self.trips.data().values())
    }

    // Functions

    pub fn add_agency(&mut self, agency: Agency) {
        if !self.agencies.contains(&agency.id()) {
            self.agency_order.push(agency.id());
        }
        self.agencies.insert(agency);
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.insert(route);
    }

    pub fn add_stop(&mut self, stop: Stop) {
        self.stops.insert(stop);
    }

    pub fn next_shape_point_id(&self) -> i32 {
        self.auto_increment.next()
    }

    pub fn add_shape_point(&mut self, shape_point: ShapePoint) {
        let id = shape_point.id();
        let shape_id = shape_point.shape_id().clone();
        if self.shape_points.insert(shape_point).is_none() {
            self.shape_points_by_shape
                .entry(shape_id)
                .or_default()
                .push(id);
        }
    }

    pub fn save_snapshot(&self, path: &Path) -> RResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())?;
        Ok(())
    }

    pub fn load_snapshot(path: &Path) -> RResult<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let data_storage =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;
        Ok(data_storage)
    }

    fn index_trip(&mut self, trip_id: &EntityId, block_id: Option<&str>) {
        if let Some(block_id) = block_id {
            let trips = self.trips_by_block.entry(block_id.to_string()).or_default();
            if !trips.contains(trip_id) {
                trips.push(trip_id.clone());
            }
        }
    }

    fn unindex_trip(&mut self, trip_id: &EntityId, block_id: Option<&str>) {
        if let Some(trips) = block_id.and_then(|block_id| self.trips_by_block.get_mut(block_id)) {
            trips.retain(|other| other != trip_id);
        }
    }
}

impl ScheduleStore for DataStorage {
    fn agencies(&self) -> Vec<&Agency> {
        self.agency_order
            .iter()
            .filter_map(|id| self.agencies.find(id))
            .collect()
    }

    fn stops(&self) -> Vec<&Stop> {
        sorted_by_id(self.stops.data().values())
    }

    fn stop(&self, id: &EntityId) -> Option<&Stop> {
        self.stops.find(id)
    }

    fn route(&self, id: &EntityId) -> Option<&Route> {
        self.routes.find(id)
    }

    fn calendar_for_service_id(&self, service_id: &EntityId) -> Option<&ServiceCalendar> {
        self.calendars.find(service_id)
    }

    fn block(&self, id: i32) -> Option<&Block> {
        self.blocks.find(&id)
    }

    fn trip(&self, id: &EntityId) -> Option<&Trip> {
        self.trips.find(id)
    }

    fn stop_times_for_trip(&self, trip_id: &EntityId) -> Vec<&StopTime> {
        self.stop_times_by_trip
            .get(trip_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.stop_times.find(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn trips_for_block_id(&self, block_id: &str) -> Vec<&Trip> {
        self.trips_by_block
            .get(block_id)
            .map(|ids| ids.iter().filter_map(|id| self.trips.find(id)).collect())
            .unwrap_or_default()
    }

    fn shape_points_for_shape_id(&self, shape_id: &EntityId) -> Vec<&ShapePoint> {
        self.shape_points_by_shape
            .get(shape_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.shape_points.find(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn next_stop_time_id(&self) -> i32 {
        self.auto_increment.next()
    }

    fn save_calendar(&mut self, calendar: ServiceCalendar) {
        self.calendars.insert(calendar);
    }

    fn save_block(&mut self, block: Block) {
        self.blocks.insert(block);
    }

    fn save_trip(&mut self, trip: Trip) {
        self.update_trip(trip);
    }

    fn save_stop_time(&mut self, stop_time: StopTime) {
        self.update_stop_time(stop_time);
    }

    fn update_trip(&mut self, trip: Trip) {
        let trip_id = trip.id();
        let previous_block_id = self
            .trips
            .find(&trip_id)
            .map(|previous| previous.block_id().map(String::from));
        match previous_block_id {
            Some(block_id) if block_id.as_deref() == trip.block_id() => {}
            Some(block_id) => {
                self.unindex_trip(&trip_id, block_id.as_deref());
                self.index_trip(&trip_id, trip.block_id());
            }
            None => self.index_trip(&trip_id, trip.block_id()),
        }
        self.trips.insert(trip);
    }

    fn update_stop_time(&mut self, stop_time: StopTime) {
        let id = stop_time.id();
        let trip_id = stop_time.trip_id().clone();
        if let Some(previous) = self.stop_times.insert(stop_time) {
            if *previous.trip_id() == trip_id {
                return;
            }
            if let Some(ids) = self.stop_times_by_trip.get_mut(previous.trip_id()) {
                ids.retain(|other| *other != id);
            }
        }
        self.stop_times_by_trip.entry(trip_id).or_default().push(id);
    }
}

fn sorted_by_id<'a, M, I>(values: I) -> Vec<&'a M>
where
    M: Model<M> + 'a,
    M::K: Ord,
    I: Iterator<Item = &'a M>,
{
    let mut values: Vec<&M> = values.collect();
    values.sort_by_key(|value| value.id());
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn trip(id: &str, block_id: Option<&str>) -> Trip {
        let mut trip = Trip::new(
            EntityId::new("40", id),
            EntityId::new("40", "100479"),
            EntityId::new("40", "LLRWeekday"),
            id.to_string(),
        );
        trip.set_block_id(block_id.map(String::from));
        trip
    }

    #[test]
    fn agencies_keep_their_insertion_order() {
        let mut data_storage = DataStorage::new();
        for id in ["40", "1", "29"] {
            data_storage.add_agency(Agency::new(
                id.to_string(),
                format!("Agency {id}"),
                "http://example.org".to_string(),
                "America/Los_Angeles".to_string(),
            ));
        }
        let ids: Vec<String> = data_storage
            .agencies()
            .iter()
            .map(|agency| agency.id())
            .collect();
        assert_eq!(ids, vec!["40", "1", "29"]);
    }

    #[test]
    fn trips_are_indexed_by_block() {
        let mut data_storage = DataStorage::new();
        data_storage.save_trip(trip("1", Some("100")));
        data_storage.save_trip(trip("2", Some("100")));
        data_storage.save_trip(trip("3", Some("200")));
        data_storage.save_trip(trip("4", None));

        assert_eq!(data_storage.trips_for_block_id("100").len(), 2);
        assert_eq!(data_storage.trips_for_block_id("200").len(), 1);
        assert!(data_storage.trips_for_block_id("300").is_empty());

        // Moving a trip to another block updates the index.
        data_storage.update_trip(trip("2", Some("200")));
        assert_eq!(data_storage.trips_for_block_id("100").len(), 1);
        let ids: Vec<String> = data_storage
            .trips_for_block_id("200")
            .iter()
            .map(|trip| trip.id().id().to_string())
            .collect();
        assert_eq!(ids, vec!["3", "2"]);
        assert_eq!(data_storage.trips().len(), 4);
    }

    #[test]
    fn stop_times_are_indexed_by_trip() {
        let mut data_storage = DataStorage::new();
        let trip_id = EntityId::new("40", "1");
        for (stop, time) in [("99903", 300), ("99121", 100)] {
            let id = data_storage.next_stop_time_id();
            data_storage.save_stop_time(StopTime::new(
                id,
                trip_id.clone(),
                EntityId::new("40", stop),
                Some(time),
                Some(time),
            ));
        }

        let stop_times = data_storage.stop_times_for_trip(&trip_id);
        assert_eq!(stop_times.len(), 2);
        assert_eq!(stop_times[0].arrival_time(), Some(300));

        let mut updated = stop_times[1].clone();
        updated.set_stop_sequence(0);
        data_storage.update_stop_time(updated);
        let stop_times = data_storage.stop_times_for_trip(&trip_id);
        assert_eq!(stop_times.len(), 2);
        assert_eq!(stop_times[1].stop_sequence(), Some(0));
    }

    #[test]
    fn snapshot_round_trip() {
        let mut data_storage = DataStorage::new();
        let start = NaiveDate::from_ymd_opt(2021, 4, 21).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 11, 21).unwrap();
        let mut calendar = ServiceCalendar::new(EntityId::new("40", "LLRWeekday"), start, end);
        calendar.set_weekdays();
        data_storage.save_calendar(calendar);
        data_storage.save_block(Block::new(7, 7, "599".to_string(), 3));
        data_storage.save_trip(trip("1", Some("7")));

        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("cache").join("store.bin");
        data_storage.save_snapshot(&path).unwrap();
        let restored = DataStorage::load_snapshot(&path).unwrap();

        assert_eq!(restored.blocks().len(), 1);
        assert_eq!(restored.trips_for_block_id("7").len(), 1);
        let calendar = restored
            .calendar_for_service_id(&EntityId::new("40", "LLRWeekday"))
            .unwrap();
        assert_eq!(calendar.thursday(), 1);
    }
}
