#![doc = include_str!("../README.md")]
mod config;
mod error;
pub mod gtfs;
mod models;
mod parsing;
mod reconciler;
mod stitching;
mod storage;
mod utils;

pub use config::ReconcileConfig;
pub use error::{RResult, ReconcileError};
pub use models::*;
pub use parsing::{
    DispatchContext, DispatchRecord, LineListener, LineOutcome, ManifestEntry, SkipReason,
    dispatch_parser::parse_record, error::ParsingError, load_shape_catalog, load_stop_mappings,
    parse_manifest, read_file,
};
pub use reconciler::{ReconcileReport, Reconciler};
pub use stitching::*;
pub use storage::{DataStorage, ScheduleStore};
pub use utils::block_id;
