// The stop-to-stop mapping translates the numeric stop codes of the dispatch files into stops
// of the base feed. No header:
//
// `30001,99604`
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::{
    error::RResult,
    models::EntityId,
    parsing::{LineListener, read_file},
    storage::ScheduleStore,
};

pub struct StopMappingListener<'a, S: ScheduleStore> {
    store: &'a S,
    agency: &'a str,
    mappings: FxHashMap<String, EntityId>,
}

impl<'a, S: ScheduleStore> StopMappingListener<'a, S> {
    pub fn new(store: &'a S, agency: &'a str) -> Self {
        Self {
            store,
            agency,
            mappings: FxHashMap::default(),
        }
    }

    pub fn into_mappings(self) -> FxHashMap<String, EntityId> {
        self.mappings
    }
}

impl<S: ScheduleStore> LineListener for StopMappingListener<'_, S> {
    fn name(&self) -> &'static str {
        "StopMappingListener"
    }

    fn handle_line(&mut self, line_number: usize, tokens: Vec<String>) {
        let (Some(code), Some(stop_code)) = (tokens.first(), tokens.get(1)) else {
            log::trace!("Line {line_number} skipped: not a mapping");
            return;
        };
        let (code, stop_code) = (code.trim(), stop_code.trim());
        if code.is_empty() {
            return;
        }

        let stop_id = EntityId::new(self.agency, stop_code);
        if self.store.stop(&stop_id).is_none() {
            log::info!(
                "Unable to match stop {code} to the unknown stop {stop_id}. Its stop-times will be dropped"
            );
            return;
        }
        if let Some(previous) = self.mappings.insert(code.to_string(), stop_id) {
            log::warn!("Stop {code} was already mapped to {previous}");
        }
    }
}

/// Numeric dispatch stop code to base feed stop. Codes whose stop is unknown are left out.
pub fn parse<S: ScheduleStore>(
    path: &Path,
    store: &S,
    agency: &str,
) -> RResult<FxHashMap<String, EntityId>> {
    let mut listener = StopMappingListener::new(store, agency);
    read_file(path, &mut listener)?;
    Ok(listener.into_mappings())
}
