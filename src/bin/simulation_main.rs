// simulation_main.rs
use traffic_junction::monitoring::traffic_monitoring_system::generate_report;
use traffic_junction::simulation_engine::simulation::run_simulation;
use traffic_junction::SimulationConfig;

use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // Optional path to a JSON config; defaults otherwise.
    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_json_file(&path)?,
        None => SimulationConfig::default(),
    };

    println!("Starting traffic simulation...");
    let summary = run_simulation(config.clone()).await?;
    println!("{}", generate_report(&summary));
    if !config.journey_report.is_empty() {
        println!("Journeys written to {}", config.journey_report);
    }
    Ok(())
}
