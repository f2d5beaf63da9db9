use crate::error::JunctionResult;
use crate::shared_data::{current_timestamp, JourneyRecord, QueueSnapshot};
use crate::simulation_engine::streets::TrafficGrid;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Writes all records to a fresh CSV file, replacing any previous contents.
pub fn write_csv<T: Serialize, P: AsRef<Path>>(filename: P, records: &[T]) -> JunctionResult<()> {
    let mut wtr = csv::Writer::from_writer(File::create(filename)?);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads back every record of a CSV file written by this module.
pub fn read_csv<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(
    filename: P,
) -> JunctionResult<Vec<T>> {
    let mut rdr = csv::Reader::from_path(filename)?;
    let mut records = Vec::new();
    for record in rdr.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

/// Samples every intersection's queue length, occupancy and light.
pub fn snapshot_queues(grid: &TrafficGrid) -> Vec<QueueSnapshot> {
    let timestamp = current_timestamp();
    grid.intersections
        .values()
        .map(|intersection| QueueSnapshot {
            timestamp,
            intersection: intersection.name().to_string(),
            waiting_vehicles: intersection.queue_len(),
            is_blocked: intersection.is_blocked(),
            is_green: intersection.traffic_light_is_green(),
        })
        .collect()
}

/// Aggregate view over all crossings of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub vehicles: usize,
    pub crossings: usize,
    pub entered_on_red: usize,
    pub avg_queue_wait_ms: f64,
    pub max_queue_wait_ms: u64,
    pub avg_green_wait_ms: f64,
    pub max_waiting_vehicles: usize,
}

pub fn summarize(records: &[JourneyRecord], snapshots: &[QueueSnapshot]) -> SimulationSummary {
    let mut vehicles: Vec<u64> = records.iter().map(|r| r.vehicle_id).collect();
    vehicles.sort_unstable();
    vehicles.dedup();

    let crossings = records.len();
    let average = |total: u64| {
        if crossings == 0 {
            0.0
        } else {
            total as f64 / crossings as f64
        }
    };

    SimulationSummary {
        vehicles: vehicles.len(),
        crossings,
        entered_on_red: records.iter().filter(|r| r.entered_on_red).count(),
        avg_queue_wait_ms: average(records.iter().map(|r| r.queue_wait_ms).sum()),
        max_queue_wait_ms: records.iter().map(|r| r.queue_wait_ms).max().unwrap_or(0),
        avg_green_wait_ms: average(records.iter().map(|r| r.green_wait_ms).sum()),
        max_waiting_vehicles: snapshots
            .iter()
            .map(|s| s.waiting_vehicles)
            .max()
            .unwrap_or(0),
    }
}

/// Human-readable report for the end of a run.
pub fn generate_report(summary: &SimulationSummary) -> String {
    format!(
        "=== Simulation Report ===\n\
         Vehicles:                 {}\n\
         Crossings:                {}\n\
         Granted on red:           {}\n\
         Avg queue wait (ms):      {:.1}\n\
         Max queue wait (ms):      {}\n\
         Avg wait for green (ms):  {:.1}\n\
         Longest queue observed:   {}",
        summary.vehicles,
        summary.crossings,
        summary.entered_on_red,
        summary.avg_queue_wait_ms,
        summary.max_queue_wait_ms,
        summary.avg_green_wait_ms,
        summary.max_waiting_vehicles
    )
}
