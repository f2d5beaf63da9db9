// Traffic light cycle bounds (milliseconds)
pub const MIN_CYCLE_MS: u64 = 4000;
pub const MAX_CYCLE_MS: u64 = 6000;

// Sleep between polls of the admission loop and the light cycle (milliseconds)
pub const POLL_INTERVAL_MS: u64 = 1;

// Demo driver defaults
pub const DEFAULT_GRID_ROWS: u8 = 2;
pub const DEFAULT_GRID_COLS: u8 = 2;
pub const DEFAULT_VEHICLES: usize = 6;
pub const DEFAULT_CROSSINGS_PER_VEHICLE: usize = 4;
pub const DEFAULT_STREET_LENGTH_M: f64 = 40.0;
pub const MONITOR_INTERVAL_MS: u64 = 500;

// Report files
pub const JOURNEY_REPORT_CSV: &str = "journeys.csv";
pub const QUEUE_REPORT_CSV: &str = "queue_snapshots.csv";
