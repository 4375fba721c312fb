use std::f64::consts::PI;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use lora_genetic::{GeneticOptimizer, PopulationReport};
use lora_radio::{
    channel::Position,
    platform::SimulatedRadio,
    LoraModulation,
};

use crate::{
    adr::DataRateAdaptation,
    config::{Config, SelectionMode},
    device::{EndDevice, ParameterSelection},
    error::SimError,
    stats::DeviceStats,
};

pub type SimulatedDevice = EndDevice<SimulatedRadio<StdRng>>;

/// Uniformly distributed positions inside a disc centered on the gateway
pub fn place_devices<R: Rng>(count: usize, radius: f64, rng: &mut R) -> Vec<Position> {
    (0..count)
        .map(|_| {
            let r = radius * rng.gen::<f64>().sqrt();
            let theta = rng.gen_range(0.0..2.0 * PI);
            Position::new(r * theta.cos(), r * theta.sin())
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub id: usize,
    pub distance: f64,
    pub mode: SelectionMode,
    pub modulation: Option<LoraModulation>,
    /// Data rate index reached by data rate adaptation
    pub data_rate: Option<u8>,
    pub packet_error_rate: f64,
    pub success_rate: Option<f64>,
    pub stats: DeviceStats,
    pub population: Option<PopulationReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub transmissions_sent: u64,
    pub frames_sent: u64,
    pub frames_delivered: u64,
    pub total_energy: f64,
    pub devices: Vec<DeviceSummary>,
}

pub struct Simulation {
    config: Config,
    devices: Vec<SimulatedDevice>,
}

impl Simulation {
    pub fn new(config: Config) -> Result<Self, SimError> {
        config.validate()?;

        let mut rng = match config.simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let gateway = Position::new(0.0, 0.0);
        let positions = place_devices(config.simulation.devices, config.simulation.radius, &mut rng);

        let mut devices = Vec::with_capacity(positions.len());

        for (id, position) in positions.iter().enumerate() {
            let distance = position.distance(&gateway);
            let radio = SimulatedRadio::new(
                config.channel,
                distance,
                StdRng::seed_from_u64(rng.gen()),
            );

            let selection = match config.simulation.mode {
                SelectionMode::Genetic => {
                    let optimizer_seed = match config.optimizer.rng_seed {
                        Some(seed) => seed.wrapping_add(id as u64),
                        None => rng.gen(),
                    };
                    let optimizer_config = config.optimizer.clone().with_rng_seed(optimizer_seed);

                    ParameterSelection::Genetic(Box::new(GeneticOptimizer::new(optimizer_config)?))
                }
                SelectionMode::DataRateAdaptation => ParameterSelection::DataRateAdaptation(
                    DataRateAdaptation::new(
                        config.simulation.initial_data_rate,
                        config.simulation.max_transmissions,
                    )?,
                ),
            };

            log::debug!("SIM: device {} at {:.0} m ({:?})", id, distance, config.simulation.mode);

            devices.push(EndDevice::new(
                id,
                radio,
                selection,
                config.simulation.max_transmissions,
            ));
        }

        Ok(Self { config, devices })
    }

    /// Sends every device's frames, interleaving devices frame by frame.
    pub fn run(&mut self) -> Result<SimulationSummary, SimError> {
        let payload = vec![0u8; self.config.simulation.payload_size];
        let frames = self.config.simulation.frames_per_device;

        log::info!(
            "SIM: {} devices, {} frames of {} bytes each",
            self.devices.len(),
            frames,
            payload.len()
        );

        for frame in 0..frames {
            for device in self.devices.iter_mut() {
                device.send_frame(&payload)?;
            }

            if (frame + 1) % 500 == 0 {
                log::info!("SIM: {}/{} frames sent", frame + 1, frames);
            }
        }

        Ok(self.summary())
    }

    pub fn summary(&self) -> SimulationSummary {
        let devices: Vec<DeviceSummary> = self
            .devices
            .iter()
            .map(|device| {
                let stats = device.stats().clone();
                DeviceSummary {
                    id: device.id(),
                    distance: device.radio().distance(),
                    mode: device.mode(),
                    modulation: device.current_modulation().ok(),
                    data_rate: device.data_rate(),
                    packet_error_rate: stats.packet_error_rate(),
                    success_rate: stats.success_rate(),
                    stats,
                    population: device.report(),
                }
            })
            .collect();

        SimulationSummary {
            transmissions_sent: devices.iter().map(|d| d.stats.transmissions_sent).sum(),
            frames_sent: devices.iter().map(|d| d.stats.frames_sent).sum(),
            frames_delivered: devices.iter().map(|d| d.stats.frames_delivered).sum(),
            total_energy: devices.iter().map(|d| d.stats.total_energy).sum(),
            devices,
        }
    }
}
