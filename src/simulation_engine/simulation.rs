// simulation.rs
use crate::config::SimulationConfig;
use crate::error::JunctionResult;
use crate::monitoring::traffic_monitoring_system::{
    snapshot_queues, summarize, write_csv, SimulationSummary,
};
use crate::shared_data::{JourneyRecord, QueueSnapshot, VehicleId};
use crate::simulation_engine::streets::TrafficGrid;
use crate::simulation_engine::vehicles::{Vehicle, VehicleType};

use rand::Rng;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task;
use tokio::time::{interval, Duration};

/// Places `config.vehicles` vehicles on random streets, heading to a random end.
pub fn spawn_vehicles(grid: &TrafficGrid, config: &SimulationConfig) -> Vec<Vehicle> {
    let streets: Vec<_> = grid.streets.values().collect();
    if streets.is_empty() {
        return Vec::new();
    }

    let mut rng = rand::rng();
    (0..config.vehicles)
        .map(|n| {
            let street = streets[rng.random_range(0..streets.len())];
            let heading_to = if rng.random_bool(0.5) {
                street.from
            } else {
                street.to
            };
            let speed = rng.random_range(config.min_speed_mps..=config.max_speed_mps);
            Vehicle::new(
                VehicleId(n as u64 + 1),
                VehicleType::random(&mut rng),
                speed,
                street.id,
                heading_to,
            )
        })
        .collect()
}

/// Samples queue lengths until `stop` flips to true.
async fn monitor_queues(
    grid: Arc<TrafficGrid>,
    every: Duration,
    mut stop: watch::Receiver<bool>,
) -> Vec<QueueSnapshot> {
    let mut ticker = interval(every);
    let mut snapshots = Vec::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let batch = snapshot_queues(&grid);
                for snapshot in batch.iter().filter(|s| s.waiting_vehicles > 0) {
                    log::info!(
                        "{}: {} waiting (green: {}, blocked: {})",
                        snapshot.intersection,
                        snapshot.waiting_vehicles,
                        snapshot.is_green,
                        snapshot.is_blocked
                    );
                }
                snapshots.extend(batch);
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }
    snapshots
}

/// Runs one full simulation: every vehicle drives on its own blocking thread
/// until it has made its crossings, then the grid is shut down and the run
/// is written out and summarised.
pub async fn run_simulation(config: SimulationConfig) -> JunctionResult<SimulationSummary> {
    config.validate()?;

    let grid = Arc::new(TrafficGrid::new(
        config.grid_rows,
        config.grid_cols,
        config.street_length_m,
        config.signal,
    )?);
    grid.simulate();
    log::info!(
        "Started {} intersections and {} streets",
        grid.intersections.len(),
        grid.streets.len()
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let monitor = tokio::spawn(monitor_queues(
        Arc::clone(&grid),
        Duration::from_millis(config.monitor_interval_ms),
        stop_rx,
    ));

    let (record_tx, record_rx) = crossbeam_channel::unbounded::<JourneyRecord>();
    let crossings = config.crossings_per_vehicle;
    let mut journeys = Vec::with_capacity(config.vehicles);
    for vehicle in spawn_vehicles(&grid, &config) {
        log::info!(
            "Spawned {} {:?} at {:.1} m/s heading to {}",
            vehicle.id,
            vehicle.vehicle_type,
            vehicle.speed,
            vehicle.heading_to
        );
        let grid = Arc::clone(&grid);
        let records = record_tx.clone();
        journeys.push(task::spawn_blocking(move || {
            let id = vehicle.id;
            (id, vehicle.drive(&grid, crossings, &records))
        }));
    }
    drop(record_tx);

    for journey in journeys {
        match journey.await {
            Ok((id, Ok(done))) => log::info!("{} finished after {} crossings", id, done),
            Ok((id, Err(e))) => log::warn!("{} did not finish: {}", id, e),
            Err(e) => log::error!("Vehicle task failed: {}", e),
        }
    }

    let _ = stop_tx.send(true);
    let snapshots = match monitor.await {
        Ok(snapshots) => snapshots,
        Err(e) => {
            log::error!("Queue monitor failed: {}", e);
            Vec::new()
        }
    };

    let shutdown_grid = Arc::clone(&grid);
    if let Err(e) = task::spawn_blocking(move || shutdown_grid.shutdown()).await {
        log::error!("Grid shutdown failed: {}", e);
    }

    let records: Vec<JourneyRecord> = record_rx.try_iter().collect();
    if !config.journey_report.is_empty() {
        write_csv(&config.journey_report, &records)?;
    }
    if !config.queue_report.is_empty() {
        write_csv(&config.queue_report, &snapshots)?;
    }

    Ok(summarize(&records, &snapshots))
}
