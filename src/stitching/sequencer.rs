use crate::{
    models::{EntityId, StopTime},
    parsing::DispatchRecord,
    stitching::resolver::StopResolver,
    storage::ScheduleStore,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AppendOutcome {
    Appended(EntityId),
    Duplicate,
    UnresolvedStop,
}

/// Appends the stop visit of a record to its trip. The sequence is left unset, it is assigned
/// once every file has been read.
pub fn append_stop_time<S: ScheduleStore>(
    store: &mut S,
    resolver: &StopResolver,
    record: &DispatchRecord,
) -> AppendOutcome {
    let Some(stop_id) = resolver.resolve(record.stop(), record.direction()) else {
        log::info!(
            "Stop '{}' has no match, skipping its stop-time on trip {}",
            record.stop(),
            record.trip_id()
        );
        return AppendOutcome::UnresolvedStop;
    };

    let duplicate = store
        .stop_times_for_trip(record.trip_id())
        .iter()
        .any(|stop_time| {
            stop_time.stop_id() == &stop_id && stop_time.arrival_time() == Some(record.time())
        });
    if duplicate {
        return AppendOutcome::Duplicate;
    }

    let id = store.next_stop_time_id();
    store.save_stop_time(StopTime::new(
        id,
        record.trip_id().clone(),
        stop_id.clone(),
        Some(record.time()),
        Some(record.time()),
    ));
    AppendOutcome::Appended(stop_id)
}

/// Orders the stop-times of one trip by arrival and numbers them from 0. Stop-times with the
/// same arrival keep their relative order.
pub fn sequence_stop_times(mut stop_times: Vec<StopTime>) -> Vec<StopTime> {
    stop_times.sort_by_key(|stop_time| stop_time.arrival_time());
    stop_times
        .into_iter()
        .zip(0u32..)
        .map(|(mut stop_time, sequence)| {
            stop_time.set_stop_sequence(sequence);
            stop_time
        })
        .collect()
}

pub fn headsign(stop_name: &str, suffix: Option<&str>) -> String {
    let headsign = suffix
        .filter(|suffix| !suffix.is_empty())
        .and_then(|suffix| stop_name.strip_suffix(suffix))
        .unwrap_or(stop_name);
    headsign.trim().to_string()
}

/// Sequences the stop-times of a trip and names the trip after its last stop.
///
/// Returns the number of stop-times, `0` when the trip has none.
pub fn sequence_trip<S: ScheduleStore>(
    store: &mut S,
    trip_id: &EntityId,
    headsign_suffix: Option<&str>,
) -> usize {
    let stop_times: Vec<StopTime> = store
        .stop_times_for_trip(trip_id)
        .into_iter()
        .cloned()
        .collect();
    if stop_times.is_empty() {
        log::error!("Trip {trip_id} has no stop-time");
        return 0;
    }

    let stop_times = sequence_stop_times(stop_times);
    let count = stop_times.len();
    let last_stop_id = stop_times.last().map(|stop_time| stop_time.stop_id().clone());
    for stop_time in stop_times {
        store.update_stop_time(stop_time);
    }

    let stop_name = last_stop_id
        .as_ref()
        .and_then(|stop_id| store.stop(stop_id))
        .map(|stop| stop.name().to_string());
    if let (Some(mut trip), Some(stop_name)) = (store.trip(trip_id).cloned(), stop_name) {
        trip.set_headsign(Some(headsign(&stop_name, headsign_suffix)));
        store.update_trip(trip);
    }
    count
}
