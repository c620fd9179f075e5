use chrono::NaiveDate;

use crate::{
    models::{Block, ServiceCalendar, Trip},
    parsing::DispatchRecord,
    storage::ScheduleStore,
};

/// Which entities a record created. Records of an already known trip create nothing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SynthesisOutcome {
    pub calendar_created: bool,
    pub block_created: bool,
    pub trip_created: bool,
}

/// Creates the calendar, block and trip a dispatch record belongs to, unless the store
/// already has them.
#[derive(Debug)]
pub struct IdentitySynthesizer {
    no_service_marker: String,
    window: (NaiveDate, NaiveDate),
}

impl IdentitySynthesizer {
    /// `window` is the validity of the calendars created for the current file.
    pub fn new(no_service_marker: String, window: (NaiveDate, NaiveDate)) -> Self {
        Self {
            no_service_marker,
            window,
        }
    }

    // Functions

    pub fn synthesize<S: ScheduleStore>(
        &self,
        store: &mut S,
        record: &DispatchRecord,
    ) -> SynthesisOutcome {
        if store.trip(record.trip_id()).is_some() {
            return SynthesisOutcome::default();
        }

        SynthesisOutcome {
            calendar_created: self.ensure_calendar(store, record),
            block_created: self.ensure_block(store, record),
            trip_created: self.ensure_trip(store, record),
        }
    }

    pub fn ensure_calendar<S: ScheduleStore>(&self, store: &mut S, record: &DispatchRecord) -> bool {
        if store.calendar_for_service_id(record.service_id()).is_some() {
            return false;
        }
        let calendar = self.calendar(record);
        log::debug!(
            "Creating calendar {} with days {:?}",
            calendar.service_id(),
            calendar.days()
        );
        store.save_calendar(calendar);
        true
    }

    pub fn ensure_block<S: ScheduleStore>(&self, store: &mut S, record: &DispatchRecord) -> bool {
        if store.block(record.block_id()).is_some() {
            return false;
        }
        store.save_block(Block::new(
            record.block_id(),
            record.block_id(),
            record.route().to_string(),
            record.run(),
        ));
        true
    }

    pub fn ensure_trip<S: ScheduleStore>(&self, store: &mut S, record: &DispatchRecord) -> bool {
        if store.trip(record.trip_id()).is_some() {
            return false;
        }
        if store.route(record.route_id()).is_none() {
            log::warn!(
                "Trip {} references the unknown route {}",
                record.trip_id(),
                record.route_id()
            );
        }

        let mut trip = Trip::new(
            record.trip_id().clone(),
            record.route_id().clone(),
            record.service_id().clone(),
            record.trip_number().to_string(),
        );
        trip.set_direction(Some(record.direction()));
        trip.set_block_id(Some(record.block_id().to_string()));
        store.save_trip(trip);
        true
    }

    /// The service label tells on which days the service runs, unless it is marked as a
    /// service without any regular day.
    fn calendar(&self, record: &DispatchRecord) -> ServiceCalendar {
        let (start_date, end_date) = self.window;
        let mut calendar = ServiceCalendar::new(record.service_id().clone(), start_date, end_date);
        let label = record.service_id().id();
        if label.contains(&self.no_service_marker) {
            return calendar;
        }

        if label.contains("Weekday") {
            calendar.set_weekdays();
        }
        if label.contains("Saturday") {
            calendar.set_saturday();
        }
        if label.contains("Sunday") {
            calendar.set_sunday();
        }
        calendar
    }
}
