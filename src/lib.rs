//! Concurrent traffic junction: vehicles on their own threads queue for an
//! intersection that admits one of them at a time, in arrival order, and only
//! while its light is green.

pub mod config;
pub mod control_system;
pub mod error;
pub mod global_variables;
pub mod monitoring;
pub mod shared_data;
pub mod simulation_engine;

pub use config::{SignalTiming, SimulationConfig};
pub use control_system::traffic_light::{PhaseChange, TrafficLight, TrafficLightPhase};
pub use error::{JunctionError, JunctionResult};
pub use shared_data::{IntersectionId, StreetId, VehicleId};
pub use simulation_engine::intersections::{EntryReport, Intersection};
pub use simulation_engine::waiting_vehicles::{EntryPermit, GrantOutcome, WaitingVehicles};
