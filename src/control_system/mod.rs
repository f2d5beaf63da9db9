// control_system/mod.rs
pub mod traffic_light;

pub use traffic_light::{PhaseChange, TrafficLight, TrafficLightPhase};
