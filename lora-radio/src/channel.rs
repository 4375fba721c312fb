use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::modulation::{
    LoraModulation, BANDWIDTH_125KHZ, BANDWIDTH_250KHZ, MAX_SPREADING_FACTOR,
    MIN_SPREADING_FACTOR,
};

/// Gateway sensitivity at 125 kHz for SF7..SF12 (dBm)
const GATEWAY_SENSITIVITY_125KHZ: [f64; 6] = [-130.0, -132.5, -135.0, -137.5, -140.0, -142.5];

/// Sensitivity penalty for each doubling of the bandwidth (dB)
const BANDWIDTH_DOUBLING_PENALTY: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Log-distance path loss with an additional uniformly distributed loss term
///
/// `L(d) = L0 + 10 * n * log10(d / d0) + U(0, max_random_loss)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogDistanceChannel {
    pub path_loss_exponent: f64,
    pub reference_distance: f64,
    pub reference_loss: f64,
    pub max_random_loss: f64,
}

impl Default for LogDistanceChannel {
    fn default() -> Self {
        Self {
            path_loss_exponent: 3.76,
            reference_distance: 1.0,
            reference_loss: 7.7,
            max_random_loss: 10.0,
        }
    }
}

impl LogDistanceChannel {
    /// Deterministic part of the path loss in dB
    pub fn mean_path_loss(&self, distance: f64) -> f64 {
        if distance <= self.reference_distance {
            return self.reference_loss;
        }

        self.reference_loss
            + 10.0 * self.path_loss_exponent * (distance / self.reference_distance).log10()
    }

    pub fn path_loss<R: Rng>(&self, distance: f64, rng: &mut R) -> f64 {
        let random_loss = if self.max_random_loss > 0.0 {
            rng.gen_range(0.0..=self.max_random_loss)
        } else {
            0.0
        };

        self.mean_path_loss(distance) + random_loss
    }

    pub fn received_power<R: Rng>(&self, tx_power: f64, distance: f64, rng: &mut R) -> f64 {
        tx_power - self.path_loss(distance, rng)
    }
}

/// Minimum received power the gateway demodulates for the given modulation (dBm)
pub fn gateway_sensitivity(modulation: &LoraModulation) -> f64 {
    let sf = modulation
        .spreading_factor
        .clamp(MIN_SPREADING_FACTOR, MAX_SPREADING_FACTOR);

    let base = GATEWAY_SENSITIVITY_125KHZ[(sf - MIN_SPREADING_FACTOR) as usize];

    let penalty = match modulation.bandwidth_hz {
        BANDWIDTH_125KHZ => 0.0,
        BANDWIDTH_250KHZ => BANDWIDTH_DOUBLING_PENALTY,
        _ => 2.0 * BANDWIDTH_DOUBLING_PENALTY,
    };

    base + penalty
}
