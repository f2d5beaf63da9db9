// src/shared_data.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque handle for a street connected to an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreetId(pub u32);

/// Opaque handle for a vehicle requesting passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

/// Identifier for an intersection using (row, col) grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntersectionId(pub u8, pub u8);

impl fmt::Display for StreetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Street #{}", self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Vehicle #{}", self.0)
    }
}

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Intersection {}{}", self.0, self.1)
    }
}

/// One vehicle crossing one intersection, as logged by the monitoring system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyRecord {
    pub timestamp: u64,
    pub vehicle_id: u64,
    pub intersection: String,
    pub queue_wait_ms: u64,
    pub green_wait_ms: u64,
    pub entered_on_red: bool,
}

/// Periodic view of one intersection's admission queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub timestamp: u64,
    pub intersection: String,
    pub waiting_vehicles: usize,
    pub is_blocked: bool,
    pub is_green: bool,
}

/// Seconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
