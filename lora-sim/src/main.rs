use clap::Parser;
use log::warn;
use std::fs;

mod adr;
mod config;
mod device;
mod error;
mod simulation;
mod stats;

use config::{Config, SelectionMode};
use simulation::{Simulation, SimulationSummary};

#[derive(Parser, Debug)]
#[command(name = "lora-sim")]
#[command(about = "LoRa end devices selecting their transmission parameters with a genetic optimizer")]
struct Args {
    /// Path to the simulation TOML file, defaults are used without it
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Parameter selection (overrides config file)
    #[arg(long, value_enum)]
    mode: Option<SelectionMode>,

    /// Random seed (overrides config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Write the JSON summary, including population reports, to this path
    #[arg(long)]
    report: Option<String>,
}

fn print_summary(summary: &SimulationSummary) {
    println!("=== LoRa Simulation Summary ===");
    println!(
        "Frames: {} sent, {} delivered ({:.1}%)",
        summary.frames_sent,
        summary.frames_delivered,
        percentage(summary.frames_delivered, summary.frames_sent)
    );
    println!("Transmissions: {}", summary.transmissions_sent);
    println!("Energy: {:.3} dBm*s", summary.total_energy);
    println!();

    for device in &summary.devices {
        let modulation = device
            .modulation
            .map(|modulation| modulation.to_string())
            .unwrap_or_else(|| "-".into());

        println!(
            "device {:>3} {:>7.0} m {:?} {} PER={:.3} recent={} energy={:.3} delivered={}/{}",
            device.id,
            device.distance,
            device.mode,
            modulation,
            device.packet_error_rate,
            device
                .success_rate
                .map(|rate| format!("{:.2}", rate))
                .unwrap_or_else(|| "-".into()),
            device.stats.total_energy,
            device.stats.frames_delivered,
            device.stats.frames_sent
        );

        if let Some(population) = &device.population {
            if let Some(most_fit) = &population.most_fit {
                println!("           most fit {}", most_fit);
            } else {
                warn!("SIM: device {} still optimizing at generation {}", device.id, population.generation);
            }
        }
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / total as f64
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::SimpleLogger::new().env().init().ok();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    if let Some(mode) = args.mode {
        cfg.simulation.mode = mode;
    }

    if let Some(seed) = args.seed {
        cfg.simulation.seed = Some(seed);
    }

    log::info!("LoRa Simulator: v{}", env!("CARGO_PKG_VERSION"));

    let mut simulation = Simulation::new(cfg)?;
    let summary = simulation.run()?;

    print_summary(&summary);

    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        log::info!("SIM: report written to {}", path);
    }

    Ok(())
}
