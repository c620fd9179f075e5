use rustc_hash::FxHashSet;

use crate::{
    models::EntityId,
    parsing::{DispatchContext, LineListener, LineOutcome, dispatch_parser::parse_record},
    stitching::{
        identity::IdentitySynthesizer,
        resolver::StopResolver,
        sequencer::{AppendOutcome, append_stop_time},
    },
    storage::ScheduleStore,
};

/// Counters of one dispatch file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IngestStats {
    pub lines: usize,
    pub records: usize,
    pub skipped: usize,
    pub errors: usize,
    pub calendars_created: usize,
    pub blocks_created: usize,
    pub trips_created: usize,
    pub stop_times_created: usize,
    pub duplicate_stop_times: usize,
    pub unresolved_stops: usize,
}

/// Turns the lines of one dispatch file into trips and stop-times.
pub struct DispatchListener<'a, S: ScheduleStore> {
    store: &'a mut S,
    resolver: &'a StopResolver,
    synthesizer: IdentitySynthesizer,
    context: DispatchContext,
    stats: IngestStats,
    trip_ids: Vec<EntityId>,
    seen_trip_ids: FxHashSet<EntityId>,
}

impl<'a, S: ScheduleStore> DispatchListener<'a, S> {
    pub fn new(
        store: &'a mut S,
        resolver: &'a StopResolver,
        synthesizer: IdentitySynthesizer,
        context: DispatchContext,
    ) -> Self {
        Self {
            store,
            resolver,
            synthesizer,
            context,
            stats: IngestStats::default(),
            trip_ids: Vec::new(),
            seen_trip_ids: FxHashSet::default(),
        }
    }

    /// Trips referenced by the file, in order of first appearance.
    pub fn into_trip_ids(self) -> (IngestStats, Vec<EntityId>) {
        (self.stats, self.trip_ids)
    }
}

impl<S: ScheduleStore> LineListener for DispatchListener<'_, S> {
    fn name(&self) -> &'static str {
        "DispatchListener"
    }

    fn handle_line(&mut self, line_number: usize, tokens: Vec<String>) {
        self.stats.lines += 1;
        let record = match parse_record(tokens, &self.context) {
            LineOutcome::Parsed(record) => record,
            LineOutcome::Skip(reason) => {
                log::trace!("Line {line_number} skipped: {reason:?}");
                self.stats.skipped += 1;
                return;
            }
            LineOutcome::Error(e) => {
                log::error!("{}: line {line_number} discarded. {e}", self.name());
                self.stats.errors += 1;
                return;
            }
        };
        self.stats.records += 1;

        let outcome = self.synthesizer.synthesize(self.store, &record);
        self.stats.calendars_created += usize::from(outcome.calendar_created);
        self.stats.blocks_created += usize::from(outcome.block_created);
        self.stats.trips_created += usize::from(outcome.trip_created);
        if self.seen_trip_ids.insert(record.trip_id().clone()) {
            self.trip_ids.push(record.trip_id().clone());
        }

        match append_stop_time(self.store, self.resolver, &record) {
            AppendOutcome::Appended(_) => self.stats.stop_times_created += 1,
            AppendOutcome::Duplicate => self.stats.duplicate_stop_times += 1,
            AppendOutcome::UnresolvedStop => self.stats.unresolved_stops += 1,
        }
    }
}
