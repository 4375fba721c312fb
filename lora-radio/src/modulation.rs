use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LoraError;

pub type Bandwidth = u32;

pub const BANDWIDTH_125KHZ: Bandwidth = 125_000;
pub const BANDWIDTH_250KHZ: Bandwidth = 250_000;
pub const BANDWIDTH_500KHZ: Bandwidth = 500_000;

pub const MIN_SPREADING_FACTOR: u8 = 7;
pub const MAX_SPREADING_FACTOR: u8 = 12;

/// Largest PHY payload accepted by [`LoraModulation::time_on_air`].
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Preamble length used by LoRaWAN uplinks (symbols).
pub const PREAMBLE_SYMBOLS: u32 = 8;

/// Highest EU868 data rate index that maps to a LoRa modulation.
pub const MAX_DATA_RATE: u8 = 6;

/// Symbol duration above which low data rate optimization is mandatory.
const LOW_DATA_RATE_SYMBOL_TIME: f64 = 0.016;

/// LoRa modulation parameters applied to a single transmission
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct LoraModulation {
    pub spreading_factor: u8,
    pub bandwidth_hz: Bandwidth,
    /// 1 (4/5) .. 4 (4/8)
    pub coding_rate: u8,
    /// Transmit power in dBm
    pub tx_power: i8,
}

impl fmt::Display for LoraModulation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[LoRa sf:{} bw:{} cr:4/{} pwr:{}]",
            self.spreading_factor,
            self.bandwidth_hz,
            self.coding_rate + 4,
            self.tx_power
        )
    }
}

impl LoraModulation {
    pub fn new(spreading_factor: u8, bandwidth_hz: Bandwidth, coding_rate: u8, tx_power: i8) -> Self {
        Self {
            spreading_factor,
            bandwidth_hz,
            coding_rate,
            tx_power,
        }
    }

    pub fn validate(&self) -> Result<(), LoraError> {
        let sf_ok = (MIN_SPREADING_FACTOR..=MAX_SPREADING_FACTOR).contains(&self.spreading_factor);
        let bw_ok = matches!(
            self.bandwidth_hz,
            BANDWIDTH_125KHZ | BANDWIDTH_250KHZ | BANDWIDTH_500KHZ
        );
        let cr_ok = (1..=4).contains(&self.coding_rate);

        if sf_ok && bw_ok && cr_ok {
            Ok(())
        } else {
            Err(LoraError::IncorrectSettings)
        }
    }

    /// EU868 data rate table: DR0..DR5 are SF12..SF7 at 125 kHz, DR6 is SF7 at 250 kHz.
    pub fn from_data_rate(data_rate: u8, tx_power: i8) -> Result<Self, LoraError> {
        let (spreading_factor, bandwidth_hz) = match data_rate {
            0..=5 => (MAX_SPREADING_FACTOR - data_rate, BANDWIDTH_125KHZ),
            6 => (MIN_SPREADING_FACTOR, BANDWIDTH_250KHZ),
            _ => return Err(LoraError::UnsupportedDataRate(data_rate)),
        };

        Ok(Self {
            spreading_factor,
            bandwidth_hz,
            coding_rate: 1,
            tx_power,
        })
    }

    /// Closest EU868 data rate index. Combinations outside the table (e.g. SF9 at
    /// 250 kHz) fall back to the index of their spreading factor.
    pub fn data_rate_index(&self) -> u8 {
        let sf = self
            .spreading_factor
            .clamp(MIN_SPREADING_FACTOR, MAX_SPREADING_FACTOR);

        if sf == MIN_SPREADING_FACTOR && self.bandwidth_hz == BANDWIDTH_250KHZ {
            MAX_DATA_RATE
        } else {
            MAX_SPREADING_FACTOR - sf
        }
    }

    /// Raw PHY bit rate in bit/s: `sf * bw / 2^sf * 4 / (4 + cr)`
    pub fn bit_rate(&self) -> f64 {
        let chips = (1u32 << self.spreading_factor) as f64;
        self.spreading_factor as f64 * (self.bandwidth_hz as f64 / chips) * 4.0
            / (4.0 + self.coding_rate as f64)
    }

    pub fn symbol_time(&self) -> Duration {
        Duration::from_secs_f64(self.symbol_time_secs())
    }

    fn symbol_time_secs(&self) -> f64 {
        if self.bandwidth_hz == 0 {
            return 0.0;
        }
        (1u64 << self.spreading_factor) as f64 / self.bandwidth_hz as f64
    }

    pub fn low_data_rate_optimization(&self) -> bool {
        self.symbol_time_secs() > LOW_DATA_RATE_SYMBOL_TIME
    }

    /// Time on air of an uplink with explicit header and CRC enabled.
    pub fn time_on_air(&self, payload_len: usize) -> Result<Duration, LoraError> {
        self.validate()?;

        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(LoraError::PayloadTooLarge(payload_len));
        }

        let t_sym = self.symbol_time_secs();
        let sf = self.spreading_factor as f64;
        let de = if self.low_data_rate_optimization() { 1.0 } else { 0.0 };

        // Explicit header (H = 0) and CRC on
        let numerator = 8.0 * payload_len as f64 - 4.0 * sf + 28.0 + 16.0;
        let denominator = 4.0 * (sf - 2.0 * de);
        let payload_symbols =
            8.0 + ((numerator / denominator).ceil() * (self.coding_rate as f64 + 4.0)).max(0.0);

        let preamble = (PREAMBLE_SYMBOLS as f64 + 4.25) * t_sym;

        Ok(Duration::from_secs_f64(preamble + payload_symbols * t_sym))
    }
}
