// The stop-order-to-shape file lists, for each known shape, the stops it visits in order. No
// header, blank cells are ignored:
//
// `10599038,99903,99121,99604`
use std::path::Path;

use crate::{
    error::RResult,
    models::EntityId,
    parsing::{LineListener, read_file},
    stitching::{ShapeCatalog, StopOrderPattern},
    storage::ScheduleStore,
};

pub struct StopOrderShapeListener<'a, S: ScheduleStore> {
    store: &'a S,
    agency: &'a str,
    catalog: ShapeCatalog,
}

impl<'a, S: ScheduleStore> StopOrderShapeListener<'a, S> {
    pub fn new(store: &'a S, agency: &'a str) -> Self {
        Self {
            store,
            agency,
            catalog: ShapeCatalog::new(),
        }
    }

    pub fn into_catalog(self) -> ShapeCatalog {
        self.catalog
    }
}

impl<S: ScheduleStore> LineListener for StopOrderShapeListener<'_, S> {
    fn name(&self) -> &'static str {
        "StopOrderShapeListener"
    }

    fn handle_line(&mut self, line_number: usize, tokens: Vec<String>) {
        let tokens: Vec<&str> = tokens
            .iter()
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .collect();
        let Some((shape, stop_codes)) = tokens.split_first() else {
            return;
        };
        if stop_codes.is_empty() {
            log::warn!("Line {line_number}: shape {shape} has no stop");
            return;
        }

        let mut stop_ids = Vec::with_capacity(stop_codes.len());
        for stop_code in stop_codes {
            let stop_id = EntityId::new(self.agency, stop_code);
            if self.store.stop(&stop_id).is_none() {
                log::error!(
                    "{}: line {line_number} discarded, shape {shape} references the unknown stop {stop_id}",
                    self.name()
                );
                return;
            }
            stop_ids.push(stop_id);
        }

        let shape_id = EntityId::new(self.agency, shape);
        if self.store.shape_points_for_shape_id(&shape_id).is_empty() {
            log::warn!("Shape {shape_id} has no shape point in the base feed");
        }
        if let Some(previous) = self
            .catalog
            .insert(StopOrderPattern::new(stop_ids), shape_id.clone())
        {
            log::warn!("Shape {shape_id} replaces {previous}, both visit the same stops");
        }
    }
}

/// Builds the catalog of known stop orders.
pub fn parse<S: ScheduleStore>(path: &Path, store: &S, agency: &str) -> RResult<ShapeCatalog> {
    let mut listener = StopOrderShapeListener::new(store, agency);
    read_file(path, &mut listener)?;
    let catalog = listener.into_catalog();
    log::info!("{} stop orders in the shape catalog", catalog.len());
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{ShapePoint, Stop},
        storage::DataStorage,
    };
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn stop(id: &str) -> EntityId {
        EntityId::new("40", id)
    }

    fn store() -> DataStorage {
        let mut store = DataStorage::new();
        for id in ["99903", "99121", "99604"] {
            store.add_stop(Stop::new(
                stop(id),
                id.to_string(),
                format!("Stop {id}"),
                47.5,
                -122.3,
            ));
        }
        let id = store.next_shape_point_id();
        store.add_shape_point(ShapePoint::new(id, stop("10599038"), 47.4, -122.3, 1, None));
        store
    }

    #[test]
    fn catalog_rows() {
        let store = store();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "10599038,99903,99121,99604\n10599039,99604,99121,99903,,\n10599040,99604,12345\n\n10599041\n"
        )
        .unwrap();

        let catalog = parse(file.path(), &store, "40").unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.find(&StopOrderPattern::new(vec![
                stop("99903"),
                stop("99121"),
                stop("99604")
            ])),
            Some(&stop("10599038"))
        );
        assert_eq!(
            catalog.find(&StopOrderPattern::new(vec![
                stop("99604"),
                stop("99121"),
                stop("99903")
            ])),
            Some(&stop("10599039"))
        );
    }
}
