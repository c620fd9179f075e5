use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RResult;

/// Settings of a reconciliation run, read from JSON with camelCase keys:
///
/// ```json
/// {
///     "hastusFiles": "misordered_hastus_sample_A.ssv",
///     "stopToStopCsv": "stop_to_stop_mapping.csv",
///     "stopOrderToShapesCsv": "stoptimes_to_shape.csv",
///     "gtfsRouteIdInput": "100479"
/// }
/// ```
///
/// Relative paths are resolved against the directory of the configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcileConfig {
    hastus_files: String,
    stop_to_stop_csv: Option<PathBuf>,
    stop_order_to_shapes_csv: Option<PathBuf>,
    agency: Option<String>,
    gtfs_route_id_input: String,
    no_service_marker: String,
    service_start_date: NaiveDate,
    service_end_date: NaiveDate,
    service_label_prefix: String,
    run_prefix: String,
    headsign_suffix: Option<String>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            hastus_files: String::new(),
            stop_to_stop_csv: None,
            stop_order_to_shapes_csv: None,
            agency: None,
            gtfs_route_id_input: "100479".to_string(),
            no_service_marker: "Extended".to_string(),
            service_start_date: NaiveDate::from_ymd_opt(2021, 4, 21).unwrap_or_default(),
            service_end_date: NaiveDate::from_ymd_opt(2021, 11, 21).unwrap_or_default(),
            service_label_prefix: "LLR".to_string(),
            run_prefix: "599 -".to_string(),
            headsign_suffix: None,
            base_dir: PathBuf::new(),
        }
    }
}

impl ReconcileConfig {
    pub fn from_json_str(value: &str) -> RResult<Self> {
        Ok(serde_json::from_str(value)?)
    }

    pub fn from_json_file(path: &Path) -> RResult<Self> {
        log::info!("Reading configuration {}...", path.display());
        let mut config = Self::from_json_str(&fs::read_to_string(path)?)?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    // Getters/Setters

    pub fn hastus_files(&self) -> &str {
        &self.hastus_files
    }

    pub fn stop_to_stop_csv(&self) -> Option<PathBuf> {
        self.stop_to_stop_csv
            .as_ref()
            .map(|path| self.resolve_path(path))
    }

    pub fn stop_order_to_shapes_csv(&self) -> Option<PathBuf> {
        self.stop_order_to_shapes_csv
            .as_ref()
            .map(|path| self.resolve_path(path))
    }

    pub fn agency(&self) -> Option<&str> {
        self.agency.as_deref()
    }

    pub fn gtfs_route_id_input(&self) -> &str {
        &self.gtfs_route_id_input
    }

    pub fn no_service_marker(&self) -> &str {
        &self.no_service_marker
    }

    /// Validity of the calendars created for manifest entries without a window.
    pub fn service_window(&self) -> (NaiveDate, NaiveDate) {
        (self.service_start_date, self.service_end_date)
    }

    pub fn service_label_prefix(&self) -> &str {
        &self.service_label_prefix
    }

    pub fn run_prefix(&self) -> &str {
        &self.run_prefix
    }

    pub fn headsign_suffix(&self) -> Option<&str> {
        self.headsign_suffix.as_deref()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn with_hastus_files(mut self, value: &str) -> Self {
        self.hastus_files = value.to_string();
        self
    }

    pub fn with_stop_to_stop_csv(mut self, value: PathBuf) -> Self {
        self.stop_to_stop_csv = Some(value);
        self
    }

    pub fn with_stop_order_to_shapes_csv(mut self, value: PathBuf) -> Self {
        self.stop_order_to_shapes_csv = Some(value);
        self
    }

    pub fn with_agency(mut self, value: &str) -> Self {
        self.agency = Some(value.to_string());
        self
    }

    pub fn with_headsign_suffix(mut self, value: &str) -> Self {
        self.headsign_suffix = Some(value.to_string());
        self
    }

    pub fn with_base_dir(mut self, value: PathBuf) -> Self {
        self.base_dir = value;
        self
    }

    // Functions

    fn resolve_path(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::tests::get_json_values;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ReconcileConfig::from_json_str(r#"{ "hastusFiles": "a.ssv" }"#).unwrap();
        assert_eq!(config.hastus_files(), "a.ssv");
        assert_eq!(config.gtfs_route_id_input(), "100479");
        assert_eq!(config.no_service_marker(), "Extended");
        assert_eq!(config.service_label_prefix(), "LLR");
        assert_eq!(config.run_prefix(), "599 -");
        assert_eq!(
            config.service_window(),
            (
                NaiveDate::from_ymd_opt(2021, 4, 21).unwrap(),
                NaiveDate::from_ymd_opt(2021, 11, 21).unwrap()
            )
        );
        assert_eq!(config.agency(), None);
        assert_eq!(config.stop_to_stop_csv(), None);
        assert_eq!(config.headsign_suffix(), None);
    }

    #[test]
    fn all_keys() {
        let reference = r#"
            {
                "hastusFiles": "2021-12-01,2022-03-01,winter.ssv",
                "stopToStopCsv": "stop_to_stop_mapping.csv",
                "stopOrderToShapesCsv": "stoptimes_to_shape.csv",
                "agency": "40",
                "gtfsRouteIdInput": "100340",
                "noServiceMarker": "Holiday",
                "serviceStartDate": "2021-12-01",
                "serviceEndDate": "2022-03-01",
                "serviceLabelPrefix": "LINK",
                "runPrefix": "100 -",
                "headsignSuffix": " Station"
            }"#;
        let config = ReconcileConfig::from_json_str(reference).unwrap();
        assert_eq!(config.agency(), Some("40"));
        assert_eq!(config.no_service_marker(), "Holiday");
        assert_eq!(config.headsign_suffix(), Some(" Station"));
        assert_eq!(
            config.stop_to_stop_csv(),
            Some(PathBuf::from("stop_to_stop_mapping.csv"))
        );

        let (config, reference) = get_json_values(&config, reference).unwrap();
        assert_eq!(config, reference);
    }

    #[test]
    fn paths_are_relative_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{ "hastusFiles": "a.ssv", "stopOrderToShapesCsv": "shapes/order.csv" }}"#
        )
        .unwrap();

        let config = ReconcileConfig::from_json_file(&path).unwrap();
        assert_eq!(config.base_dir(), dir.path());
        assert_eq!(
            config.stop_order_to_shapes_csv(),
            Some(dir.path().join("shapes/order.csv"))
        );
    }

    #[test]
    fn invalid_json() {
        assert!(ReconcileConfig::from_json_str(r#"{ "serviceStartDate": "April" }"#).is_err());
    }
}
