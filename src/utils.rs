// ------------------------------------------------------------------------------------------------
// --- AutoIncrement
// ------------------------------------------------------------------------------------------------

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::EntityId;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AutoIncrement {
    value: RefCell<i32>,
}

impl AutoIncrement {
    pub fn new() -> Self {
        Self {
            value: RefCell::new(0),
        }
    }

    pub fn next(&self) -> i32 {
        *self.value.borrow_mut() += 1;
        *self.value.borrow()
    }
}

/// Stable block id of a vehicle run within a service.
///
/// The first four bytes of `SHA-256("{service_id}|{run}")`, read as a big-endian `u32`, with
/// the top bit cleared so the id is a non-negative `i32`. `service_id` is written in its
/// `agency_id` form.
pub fn block_id(service_id: &EntityId, run: i32) -> i32 {
    let digest = Sha256::digest(format!("{service_id}|{run}").as_bytes());
    let value = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) & 0x7FFF_FFFF;
    value as i32
}

pub fn seconds_from_hms(hours: u32, minutes: u32, seconds: u32) -> u32 {
    hours * 3600 + minutes * 60 + seconds
}

/// `HH:MM:SS`, hours past midnight are kept (e.g. `25:10:00`).
pub fn format_seconds(value: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        value / 3600,
        (value % 3600) / 60,
        value % 60
    )
}
