use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;

use crate::models::{Direction, EntityId, Model, Stop};

static NUMERIC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("Invalid numeric token regex"));

#[derive(Debug)]
struct StopCandidate {
    id: EntityId,
    code: String,
}

/// Maps the stop references of the dispatch files to stops of the base feed.
///
/// Dispatch files reference a stop either by a numeric external code, translated through
/// the stop-to-stop mapping, or by its display name.
#[derive(Debug, Default)]
pub struct StopResolver {
    by_code: FxHashMap<String, EntityId>,
    by_name: FxHashMap<String, Vec<StopCandidate>>,
}

impl StopResolver {
    /// `stops` are expected in catalog order, name candidates keep that order.
    pub fn new(stops: Vec<&Stop>, by_code: FxHashMap<String, EntityId>) -> Self {
        let by_name = stops.into_iter().fold(
            FxHashMap::<String, Vec<StopCandidate>>::default(),
            |mut acc, stop| {
                acc.entry(stop.name().to_string())
                    .or_default()
                    .push(StopCandidate {
                        id: stop.id(),
                        code: stop.code().to_string(),
                    });
                acc
            },
        );
        log::info!(
            "Stop resolver built with {} numeric codes and {} stop names",
            by_code.len(),
            by_name.len()
        );
        Self { by_code, by_name }
    }

    // Getters/Setters

    pub fn code_count(&self) -> usize {
        self.by_code.len()
    }

    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }

    // Functions

    pub fn is_numeric(token: &str) -> bool {
        NUMERIC_TOKEN.is_match(token)
    }

    pub fn resolve_by_code(&self, code: &str) -> Option<EntityId> {
        self.by_code.get(code).cloned()
    }

    /// Prefers the platform of the travel direction, identified by the suffix of its stop
    /// code. Falls back to the first candidate in catalog order.
    pub fn resolve_by_name(&self, name: &str, direction: Direction) -> Option<EntityId> {
        let candidates = self.by_name.get(name)?;
        let suffix = direction.stop_code_suffix();
        if let Some(candidate) = candidates
            .iter()
            .find(|candidate| candidate.code.contains(suffix))
        {
            return Some(candidate.id.clone());
        }

        let candidate = candidates.first()?;
        if candidates.len() > 1 {
            log::debug!(
                "{} stops are named '{name}', none with the suffix {suffix}. Using {}",
                candidates.len(),
                candidate.id
            );
        }
        Some(candidate.id.clone())
    }

    pub fn resolve(&self, token: &str, direction: Direction) -> Option<EntityId> {
        if Self::is_numeric(token) {
            self.resolve_by_code(token)
        } else {
            self.resolve_by_name(token, direction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stop(id: &str, code: &str, name: &str) -> Stop {
        Stop::new(
            EntityId::new("40", id),
            code.to_string(),
            name.to_string(),
            47.5,
            -122.3,
        )
    }

    fn resolver() -> StopResolver {
        let stops = vec![
            stop("99121", "99121", "Beacon Hill Stn Tun & Beacon Av S/S Lander St"),
            stop("99600", "99600-T1", "UW / Husky Stadium Link Station"),
            stop("99601", "99601", "Tukwila Int'l Blvd Station"),
            stop("99602", "99602", "Tukwila Int'l Blvd Station"),
            stop("99604", "99604-T2", "UW / Husky Stadium Link Station"),
        ];
        let mut by_code = FxHashMap::default();
        by_code.insert("30001".to_string(), EntityId::new("40", "99604"));
        by_code.insert("30002".to_string(), EntityId::new("40", "99121"));
        StopResolver::new(stops.iter().collect(), by_code)
    }

    #[test]
    fn numeric_tokens() {
        assert!(StopResolver::is_numeric("30001"));
        assert!(StopResolver::is_numeric("-12"));
        assert!(!StopResolver::is_numeric("30001a"));
        assert!(!StopResolver::is_numeric("UW / Husky Stadium Link Station"));
        assert!(!StopResolver::is_numeric(""));
    }

    #[test]
    fn by_code() {
        let resolver = resolver();
        assert_eq!(resolver.code_count(), 2);
        assert_eq!(
            resolver.resolve("30001", Direction::North),
            Some(EntityId::new("40", "99604"))
        );
        assert_eq!(resolver.resolve("30009", Direction::North), None);
    }

    #[test]
    fn by_name_prefers_the_direction_platform() {
        let resolver = resolver();
        assert_eq!(resolver.name_count(), 3);
        assert_eq!(
            resolver.resolve("UW / Husky Stadium Link Station", Direction::North),
            Some(EntityId::new("40", "99604"))
        );
        assert_eq!(
            resolver.resolve("UW / Husky Stadium Link Station", Direction::South),
            Some(EntityId::new("40", "99600"))
        );
    }

    #[test]
    fn by_name_without_platform() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve("Tukwila Int'l Blvd Station", Direction::South),
            Some(EntityId::new("40", "99601"))
        );
        assert_eq!(
            resolver.resolve(
                "Beacon Hill Stn Tun & Beacon Av S/S Lander St",
                Direction::North
            ),
            Some(EntityId::new("40", "99121"))
        );
        assert_eq!(resolver.resolve("Nowhere", Direction::North), None);
    }
}
