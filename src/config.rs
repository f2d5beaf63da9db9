// config.rs

use crate::error::{JunctionError, JunctionResult};
use crate::global_variables::{
    DEFAULT_CROSSINGS_PER_VEHICLE, DEFAULT_GRID_COLS, DEFAULT_GRID_ROWS, DEFAULT_STREET_LENGTH_M,
    DEFAULT_VEHICLES, JOURNEY_REPORT_CSV, MAX_CYCLE_MS, MIN_CYCLE_MS, MONITOR_INTERVAL_MS,
    POLL_INTERVAL_MS, QUEUE_REPORT_CSV,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Timing of a traffic light cycle and of the background polling loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTiming {
    pub min_cycle_ms: u64,
    pub max_cycle_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for SignalTiming {
    fn default() -> Self {
        Self {
            min_cycle_ms: MIN_CYCLE_MS,
            max_cycle_ms: MAX_CYCLE_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
        }
    }
}

impl SignalTiming {
    /// Timing with the given cycle bounds and the default poll interval.
    pub fn with_cycle(min_cycle_ms: u64, max_cycle_ms: u64) -> Self {
        Self {
            min_cycle_ms,
            max_cycle_ms,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> JunctionResult<()> {
        if self.min_cycle_ms > self.max_cycle_ms {
            return Err(JunctionError::InvalidConfig(format!(
                "min_cycle_ms ({}) exceeds max_cycle_ms ({})",
                self.min_cycle_ms, self.max_cycle_ms
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(JunctionError::InvalidConfig(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for the demo simulation driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub grid_rows: u8,
    pub grid_cols: u8,
    pub vehicles: usize,
    pub crossings_per_vehicle: usize,
    pub street_length_m: f64,
    /// Vehicle speed range in metres per second.
    pub min_speed_mps: f64,
    pub max_speed_mps: f64,
    pub monitor_interval_ms: u64,
    pub signal: SignalTiming,
    pub journey_report: String,
    pub queue_report: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_rows: DEFAULT_GRID_ROWS,
            grid_cols: DEFAULT_GRID_COLS,
            vehicles: DEFAULT_VEHICLES,
            crossings_per_vehicle: DEFAULT_CROSSINGS_PER_VEHICLE,
            street_length_m: DEFAULT_STREET_LENGTH_M,
            min_speed_mps: 10.0,
            max_speed_mps: 20.0,
            monitor_interval_ms: MONITOR_INTERVAL_MS,
            signal: SignalTiming::default(),
            journey_report: JOURNEY_REPORT_CSV.to_string(),
            queue_report: QUEUE_REPORT_CSV.to_string(),
        }
    }
}

impl SimulationConfig {
    /// Reads a JSON config file. Missing fields fall back to the defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> JunctionResult<Self> {
        let raw = fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> JunctionResult<()> {
        self.signal.validate()?;
        if (self.grid_rows as usize) * (self.grid_cols as usize) < 2 {
            return Err(JunctionError::InvalidConfig(
                "grid needs at least two intersections".to_string(),
            ));
        }
        if !(self.min_speed_mps > 0.0 && self.min_speed_mps <= self.max_speed_mps) {
            return Err(JunctionError::InvalidConfig(format!(
                "speed range {}..{} is not valid",
                self.min_speed_mps, self.max_speed_mps
            )));
        }
        if self.monitor_interval_ms == 0 {
            return Err(JunctionError::InvalidConfig(
                "monitor_interval_ms must be positive".to_string(),
            ));
        }
        if self.street_length_m <= 0.0 {
            return Err(JunctionError::InvalidConfig(
                "street_length_m must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_timing_matches_four_to_six_seconds() {
        let timing = SignalTiming::default();
        assert_eq!(timing.min_cycle_ms, 4000);
        assert_eq!(timing.max_cycle_ms, 6000);
        assert_eq!(timing.poll_interval(), Duration::from_millis(1));
        assert!(timing.validate().is_ok());
    }

    #[test]
    fn inverted_cycle_is_rejected() {
        let timing = SignalTiming::with_cycle(60, 40);
        assert!(matches!(
            timing.validate(),
            Err(JunctionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "vehicles": 3, "signal": {{ "min_cycle_ms": 40, "max_cycle_ms": 60 }} }}"#
        )
        .unwrap();

        let config = SimulationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.vehicles, 3);
        assert_eq!(config.signal.min_cycle_ms, 40);
        assert_eq!(config.signal.poll_interval_ms, POLL_INTERVAL_MS);
        assert_eq!(config.grid_rows, DEFAULT_GRID_ROWS);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            SimulationConfig::from_json_file(file.path()),
            Err(JunctionError::Json(_))
        ));
    }
}
