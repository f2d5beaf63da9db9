use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use rand::Rng;

use crate::error::{JunctionError, JunctionResult};
use crate::shared_data::{current_timestamp, IntersectionId, JourneyRecord, StreetId, VehicleId};
use crate::simulation_engine::streets::TrafficGrid;

/// Meters a vehicle travels to clear an intersection, on top of its own length.
const INTERSECTION_WIDTH_M: f64 = 8.0;

/// Different types of vehicles in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleType {
    Car,
    Bus,
    Truck,
}

impl VehicleType {
    /// Car: 60%, Bus: 25%, Truck: 15%.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let roll: f64 = rng.random_range(0.0..1.0);
        if roll < 0.60 {
            VehicleType::Car
        } else if roll < 0.85 {
            VehicleType::Bus
        } else {
            VehicleType::Truck
        }
    }

    /// Vehicle length in meters.
    pub fn length(self) -> f64 {
        match self {
            VehicleType::Car => 4.5,
            VehicleType::Bus => 12.0,
            VehicleType::Truck => 16.0,
        }
    }
}

/// A vehicle driving through the grid on its own thread.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub vehicle_type: VehicleType,
    /// Cruising speed in meters per second.
    pub speed: f64,
    pub street: StreetId,
    /// The intersection at the end of the current street.
    pub heading_to: IntersectionId,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        vehicle_type: VehicleType,
        speed: f64,
        street: StreetId,
        heading_to: IntersectionId,
    ) -> Self {
        Self {
            id,
            vehicle_type,
            speed,
            street,
            heading_to,
        }
    }

    fn travel_time(&self, meters: f64) -> Duration {
        Duration::from_secs_f64(meters / self.speed)
    }

    /// Drives until `crossings` intersections have been crossed, sending one
    /// record per crossing. Blocks the calling thread throughout.
    ///
    /// Returns the number of crossings completed. Stops early with `Closed`
    /// if an intersection shuts down underneath the vehicle.
    pub fn drive(
        mut self,
        grid: &TrafficGrid,
        crossings: usize,
        records: &Sender<JourneyRecord>,
    ) -> JunctionResult<usize> {
        let mut rng = rand::rng();

        for completed in 0..crossings {
            let street = grid
                .street(self.street)
                .ok_or(JunctionError::UnknownStreet(self.street))?;
            thread::sleep(self.travel_time(street.length_m));

            let intersection = grid
                .intersection(self.heading_to)
                .ok_or(JunctionError::UnknownIntersection(self.heading_to))?;
            let report = match intersection.add_vehicle_to_queue(self.id) {
                Ok(report) => report,
                Err(e) => {
                    log::warn!("{} stopped before {}: {}", self.id, intersection.name(), e);
                    return Err(e);
                }
            };

            // Pick the next street; drive back the same way at a dead end.
            let options = intersection.query_streets(self.street);
            let next_street = if options.is_empty() {
                self.street
            } else {
                options[rng.random_range(0..options.len())]
            };

            thread::sleep(self.travel_time(INTERSECTION_WIDTH_M + self.vehicle_type.length()));
            intersection.vehicle_has_left(self.id);

            let record = JourneyRecord {
                timestamp: current_timestamp(),
                vehicle_id: self.id.0,
                intersection: intersection.name().to_string(),
                queue_wait_ms: report.queue_wait.as_millis() as u64,
                green_wait_ms: report.green_wait.as_millis() as u64,
                entered_on_red: report.entered_on_red,
            };
            if records.send(record).is_err() {
                log::debug!("{}: journey records no longer collected", self.id);
            }

            let next = grid
                .street(next_street)
                .ok_or(JunctionError::UnknownStreet(next_street))?;
            log::info!(
                "{} {:?} crossed {} onto street {} ({}/{})",
                self.id,
                self.vehicle_type,
                intersection.name(),
                next.name,
                completed + 1,
                crossings
            );
            self.heading_to = next.other_end(self.heading_to);
            self.street = next_street;
        }

        Ok(crossings)
    }
}
