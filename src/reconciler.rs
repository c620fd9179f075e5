use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::{
    config::ReconcileConfig,
    error::{RResult, ReconcileError},
    models::{EntityId, Model},
    parsing::{
        DispatchContext, ManifestEntry, load_shape_catalog, load_stop_mappings, parse_manifest,
        read_file,
    },
    stitching::{
        DispatchListener, IdentitySynthesizer, IngestStats, ShapeCatalog, StopOrderPattern,
        StopResolver, sequence_trip,
    },
    storage::ScheduleStore,
};

// ------------------------------------------------------------------------------------------------
// --- ReconcileReport
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default, Serialize)]
pub struct ReconcileReport {
    pub files_read: usize,
    pub files_failed: usize,
    pub lines_read: usize,
    pub records_parsed: usize,
    pub records_skipped: usize,
    pub record_errors: usize,
    pub calendars_created: usize,
    pub blocks_created: usize,
    pub trips_created: usize,
    pub stop_times_created: usize,
    pub duplicate_stop_times: usize,
    pub unresolved_stops: usize,
    pub trips_sequenced: usize,
    pub empty_trips: usize,
    pub shapes_matched: usize,
    /// Stop orders without a known shape, in order of first appearance.
    pub unmatched_patterns: Vec<StopOrderPattern>,
}

impl ReconcileReport {
    fn add(&mut self, stats: &IngestStats) {
        self.lines_read += stats.lines;
        self.records_parsed += stats.records;
        self.records_skipped += stats.skipped;
        self.record_errors += stats.errors;
        self.calendars_created += stats.calendars_created;
        self.blocks_created += stats.blocks_created;
        self.trips_created += stats.trips_created;
        self.stop_times_created += stats.stop_times_created;
        self.duplicate_stop_times += stats.duplicate_stop_times;
        self.unresolved_stops += stats.unresolved_stops;
    }
}

// ------------------------------------------------------------------------------------------------
// --- Reconciler
// ------------------------------------------------------------------------------------------------

/// Reconciles the dispatch files of a manifest into a schedule store.
///
/// A run resolves the stops, builds the shape catalog, ingests every file, then sequences the
/// trips it touched and assigns their shapes. Failures of a single file or line are logged and
/// counted, only an unusable setup stops the run.
#[derive(Debug)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    // Getters/Setters

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    // Functions

    pub fn run<S: ScheduleStore>(&self, store: &mut S) -> RResult<ReconcileReport> {
        let now = Instant::now();
        let agency = self.default_agency(store)?;
        let entries = parse_manifest(self.config.hastus_files(), self.config.base_dir());

        let resolver = StopResolver::new(store.stops(), self.stop_mappings(store, &agency));
        let catalog = self.shape_catalog(store, &agency);

        let route_id = EntityId::new(&agency, self.config.gtfs_route_id_input());
        if store.route(&route_id).is_none() {
            log::warn!("The route {route_id} is not in the base feed");
        }

        let mut report = ReconcileReport::default();
        let mut trip_ids = Vec::new();
        for entry in &entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::error!("Manifest entry discarded. {e}");
                    report.files_failed += 1;
                    continue;
                }
            };
            let (stats, entry_trip_ids, result) =
                self.ingest(store, &resolver, &agency, &route_id, entry);
            report.add(&stats);
            trip_ids.extend(entry_trip_ids);
            match result {
                Ok(_) => report.files_read += 1,
                Err(e) => {
                    log::error!(
                        "DispatchListener: unable to read {}. {e}",
                        entry.path().display()
                    );
                    report.files_failed += 1;
                }
            }
        }

        // A trip may appear in several files.
        let mut seen = FxHashSet::default();
        trip_ids.retain(|trip_id: &EntityId| seen.insert(trip_id.clone()));

        self.post_pass(store, &catalog, &trip_ids, &mut report);

        for pattern in &report.unmatched_patterns {
            log::warn!("No shape visits the stops {pattern}");
        }
        log::info!(
            "{} trips, {} stop-times and {} blocks created from {} files in {:.2?}",
            report.trips_created,
            report.stop_times_created,
            report.blocks_created,
            report.files_read,
            now.elapsed()
        );
        Ok(report)
    }

    fn default_agency<S: ScheduleStore>(&self, store: &S) -> RResult<String> {
        if let Some(agency) = self.config.agency() {
            return Ok(agency.to_string());
        }
        store
            .agencies()
            .first()
            .map(|agency| agency.id())
            .ok_or(ReconcileError::MissingAgency)
    }

    fn stop_mappings<S: ScheduleStore>(
        &self,
        store: &S,
        agency: &str,
    ) -> FxHashMap<String, EntityId> {
        let Some(path) = self.config.stop_to_stop_csv() else {
            return FxHashMap::default();
        };
        load_stop_mappings(&path, store, agency).unwrap_or_else(|e| {
            log::error!("StopMappingListener: unable to read {}. {e}", path.display());
            FxHashMap::default()
        })
    }

    fn shape_catalog<S: ScheduleStore>(&self, store: &S, agency: &str) -> ShapeCatalog {
        let Some(path) = self.config.stop_order_to_shapes_csv() else {
            return ShapeCatalog::new();
        };
        load_shape_catalog(&path, store, agency).unwrap_or_else(|e| {
            log::error!("StopOrderShapeListener: unable to read {}. {e}", path.display());
            ShapeCatalog::new()
        })
    }

    fn ingest<S: ScheduleStore>(
        &self,
        store: &mut S,
        resolver: &StopResolver,
        agency: &str,
        route_id: &EntityId,
        entry: &ManifestEntry,
    ) -> (IngestStats, Vec<EntityId>, RResult<usize>) {
        let window = entry.window().unwrap_or(self.config.service_window());
        let context = DispatchContext::new(
            agency.to_string(),
            route_id.clone(),
            self.config.service_label_prefix().to_string(),
            entry.window(),
            self.config.run_prefix().to_string(),
        );
        let synthesizer =
            IdentitySynthesizer::new(self.config.no_service_marker().to_string(), window);

        // Lines read before a failure are kept.
        let mut listener = DispatchListener::new(store, resolver, synthesizer, context);
        let result = read_file(entry.path(), &mut listener);
        let (stats, trip_ids) = listener.into_trip_ids();
        log::info!(
            "{}: {} records, {} skipped, {} errors",
            entry.path().display(),
            stats.records,
            stats.skipped,
            stats.errors
        );
        (stats, trip_ids, result)
    }

    fn post_pass<S: ScheduleStore>(
        &self,
        store: &mut S,
        catalog: &ShapeCatalog,
        trip_ids: &[EntityId],
        report: &mut ReconcileReport,
    ) {
        for trip_id in trip_ids {
            if sequence_trip(store, trip_id, self.config.headsign_suffix()) == 0 {
                report.empty_trips += 1;
                continue;
            }
            report.trips_sequenced += 1;

            let pattern = StopOrderPattern::from_stop_times(&store.stop_times_for_trip(trip_id));
            let Some(shape_id) = catalog.find(&pattern) else {
                if !report.unmatched_patterns.contains(&pattern) {
                    report.unmatched_patterns.push(pattern);
                }
                continue;
            };
            if let Some(mut trip) = store.trip(trip_id).cloned() {
                trip.set_shape_id(Some(shape_id.clone()));
                store.update_trip(trip);
                report.shapes_matched += 1;
            }
        }
    }
}
