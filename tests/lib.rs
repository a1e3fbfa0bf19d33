mod consistency;
mod fusion;
mod simulation;

use kinematic_filters::prelude::*;

/// Bundles of a constant velocity trajectory, with position and speed measured at every step.
pub fn speed_bundles(count: usize, seed: u64) -> (SpeedSimulatorConfig, Vec<Measurements>) {
    let config = SpeedSimulatorConfig::builder().count(count).build();
    let bundles = SpeedSimulator::new(&config, seed).unwrap().generate();
    (config, bundles)
}

/// Tracker configuration matching the speed simulator.
pub fn matched_config(sim: &SpeedSimulatorConfig) -> TrackerConfig {
    TrackerConfig::builder()
        .queue_size(3)
        .reset_dt(10.seconds())
        .process_noise(sim.process_noise())
        .standing_detection(false)
        .build()
}
