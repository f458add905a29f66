//! Ninja Sim entry point
//!
//! Runs a replay: `ninja-sim <map> <inputs> [config.json]`. The outcome is
//! printed as JSON on stdout.

use std::process::ExitCode;

use ninja_sim::sim::run_replay;
use ninja_sim::{SimConfig, Simulation};

fn run(args: &[String]) -> Result<String, Box<dyn std::error::Error>> {
    let [map_path, inputs_path, rest @ ..] = args else {
        return Err("usage: ninja-sim <map> <inputs> [config.json]".into());
    };
    let config = match rest.first() {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    let map = std::fs::read(map_path)?;
    let inputs = std::fs::read(inputs_path)?;
    log::info!("Map {map_path} ({} bytes), {} input frames", map.len(), inputs.len());

    let mut sim = Simulation::new(config);
    sim.load(&map)?;
    let outcome = run_replay(&mut sim, &inputs);
    Ok(serde_json::to_string_pretty(&outcome)?)
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Ninja Sim starting...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
