use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::models::{EntityId, StopTime};

// ------------------------------------------------------------------------------------------------
// --- StopOrderPattern
// ------------------------------------------------------------------------------------------------

/// The ordered stops of a trip. Two patterns are equal only if they visit the same stops in
/// the same order.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct StopOrderPattern {
    stop_ids: Vec<EntityId>,
}

impl StopOrderPattern {
    pub fn new(stop_ids: Vec<EntityId>) -> Self {
        Self { stop_ids }
    }

    /// Stop-times without a sequence are ordered last.
    pub fn from_stop_times(stop_times: &[&StopTime]) -> Self {
        let mut stop_times = stop_times.to_vec();
        stop_times.sort_by_key(|stop_time| stop_time.stop_sequence().unwrap_or(u32::MAX));
        Self::new(
            stop_times
                .into_iter()
                .map(|stop_time| stop_time.stop_id().clone())
                .collect(),
        )
    }

    // Getters/Setters

    pub fn stop_ids(&self) -> &[EntityId] {
        &self.stop_ids
    }

    pub fn len(&self) -> usize {
        self.stop_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_ids.is_empty()
    }
}

impl fmt::Display for StopOrderPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stop_ids: Vec<String> = self.stop_ids.iter().map(|id| id.to_string()).collect();
        write!(f, "[{}]", stop_ids.join(", "))
    }
}

// ------------------------------------------------------------------------------------------------
// --- ShapeCatalog
// ------------------------------------------------------------------------------------------------

/// Known paths, keyed by the order in which they visit their stops.
#[derive(Debug, Default)]
pub struct ShapeCatalog {
    shapes: FxHashMap<StopOrderPattern, EntityId>,
}

impl ShapeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    // Functions

    /// Returns the shape previously registered for the pattern, if any.
    pub fn insert(&mut self, pattern: StopOrderPattern, shape_id: EntityId) -> Option<EntityId> {
        self.shapes.insert(pattern, shape_id)
    }

    pub fn find(&self, pattern: &StopOrderPattern) -> Option<&EntityId> {
        self.shapes.get(pattern)
    }
}
