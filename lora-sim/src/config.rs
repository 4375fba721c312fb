use std::error::Error;
use std::fs;

use serde::{Deserialize, Serialize};

use lora_genetic::OptimizerConfig;
use lora_radio::{
    channel::LogDistanceChannel,
    modulation::{MAX_DATA_RATE, MAX_PAYLOAD_SIZE},
};

use crate::error::SimError;

/// How an end device picks the parameters of its next transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum SelectionMode {
    #[serde(rename = "genetic")]
    #[value(name = "genetic")]
    Genetic,
    /// LoRaWAN end device data rate adaptation on missing acknowledgements
    #[serde(rename = "adr")]
    #[value(name = "adr")]
    DataRateAdaptation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub devices: usize,
    pub frames_per_device: u32,
    pub payload_size: usize,
    /// Devices are placed uniformly in a disc of this radius around the gateway (m)
    pub radius: f64,
    pub mode: SelectionMode,
    /// Attempts per confirmed frame
    pub max_transmissions: u8,
    /// Starting data rate of devices in data rate adaptation mode
    pub initial_data_rate: u8,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            devices: 1,
            frames_per_device: 2000,
            payload_size: 23,
            radius: 3000.0,
            mode: SelectionMode::Genetic,
            max_transmissions: 8,
            initial_data_rate: 5,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub channel: LogDistanceChannel,
    pub optimizer: OptimizerConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), SimError> {
        let simulation = &self.simulation;

        if simulation.devices == 0 {
            return Err(SimError::InvalidConfig("at least one device is required".into()));
        }

        if simulation.max_transmissions == 0 {
            return Err(SimError::InvalidConfig(
                "max_transmissions must be at least 1".into(),
            ));
        }

        if simulation.payload_size > MAX_PAYLOAD_SIZE {
            return Err(SimError::InvalidConfig(format!(
                "payload of {} bytes exceeds {} bytes",
                simulation.payload_size, MAX_PAYLOAD_SIZE
            )));
        }

        if simulation.initial_data_rate > MAX_DATA_RATE {
            return Err(SimError::InvalidConfig(format!(
                "initial data rate DR{} is above DR{}",
                simulation.initial_data_rate, MAX_DATA_RATE
            )));
        }

        if !(simulation.radius.is_finite() && simulation.radius > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "radius {} must be positive",
                simulation.radius
            )));
        }

        self.optimizer.validate()?;

        Ok(())
    }
}

/// Loads the simulation configuration from the given TOML file path.
/// Missing sections and keys keep their defaults.
pub fn load_config(path: &str) -> Result<Config, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}

pub fn parse_config(s: &str) -> Result<Config, Box<dyn Error>> {
    let config: Config = toml::from_str(s)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").expect("config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_sections() {
        let config = parse_config(
            r#"
            [simulation]
            devices = 4
            frames_per_device = 100
            mode = "adr"
            seed = 9

            [channel]
            path_loss_exponent = 3.0

            [optimizer]
            population_size = 8
            elite_count = 2
            "#,
        )
        .expect("config");

        assert_eq!(config.simulation.devices, 4);
        assert_eq!(config.simulation.frames_per_device, 100);
        assert_eq!(config.simulation.mode, SelectionMode::DataRateAdaptation);
        assert_eq!(config.simulation.seed, Some(9));
        assert_eq!(config.simulation.payload_size, 23);
        assert_eq!(config.channel.path_loss_exponent, 3.0);
        assert_eq!(config.channel.reference_loss, 7.7);
        assert_eq!(config.optimizer.population_size, 8);
        assert_eq!(config.optimizer.max_generations, 10);
    }

    #[test]
    fn test_parse_explicit_seeds() {
        let config = parse_config(
            r#"
            [optimizer]
            population_size = 2
            elite_count = 1
            seeds = [
                { spreading_factor = 7, power = 2, bandwidth = 125000, coding_rate = 1 },
                { spreading_factor = 12, power = 14, bandwidth = 250000, coding_rate = 4 },
            ]
            "#,
        )
        .expect("config");

        assert_eq!(config.optimizer.seeds.len(), 2);
        assert_eq!(config.optimizer.seeds[1].spreading_factor, 12);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(parse_config("[simulation]\ndevices = 0").is_err());
        assert!(parse_config("[simulation]\npayload_size = 300").is_err());
        assert!(parse_config("[simulation]\nmode = \"fastest\"").is_err());
        assert!(parse_config("[optimizer]\nelite_count = 16").is_err());
    }
}
