use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use lora_radio::modulation::{
    LoraModulation, BANDWIDTH_125KHZ, BANDWIDTH_250KHZ, MAX_SPREADING_FACTOR,
    MIN_SPREADING_FACTOR,
};

use crate::{error::OptimizerError, fitness};

pub const MIN_POWER: i8 = 2;
pub const MAX_POWER: i8 = 14;
pub const POWER_STEP: i8 = 2;

pub const MIN_CODING_RATE: u8 = 1;
pub const MAX_CODING_RATE: u8 = 4;

pub const BANDWIDTHS: [u32; 2] = [BANDWIDTH_125KHZ, BANDWIDTH_250KHZ];

/// Number of distinct gene combinations
pub const DOMAIN_SIZE: usize = (MAX_SPREADING_FACTOR - MIN_SPREADING_FACTOR + 1) as usize
    * ((MAX_POWER - MIN_POWER) / POWER_STEP + 1) as usize
    * BANDWIDTHS.len()
    * (MAX_CODING_RATE - MIN_CODING_RATE + 1) as usize;

/// Genes in chromosome order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gene {
    SpreadingFactor = 0,
    Power = 1,
    Bandwidth = 2,
    CodingRate = 3,
}

impl Gene {
    /// Valid crossover pivots. Pivoting on the first gene would clone parent B.
    pub const PIVOTS: [Gene; 3] = [Gene::Power, Gene::Bandwidth, Gene::CodingRate];

    pub fn position(self) -> usize {
        self as usize
    }

    pub fn random_pivot<R: Rng>(rng: &mut R) -> Gene {
        Self::PIVOTS[rng.gen_range(0..Self::PIVOTS.len())]
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Gene::SpreadingFactor => "spreading factor",
            Gene::Power => "power",
            Gene::Bandwidth => "bandwidth",
            Gene::CodingRate => "coding rate",
        };
        write!(f, "{}", name)
    }
}

/// Plain gene values, as found in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneValues {
    pub spreading_factor: u8,
    pub power: i8,
    pub bandwidth: u32,
    pub coding_rate: u8,
}

impl GeneValues {
    pub const fn new(spreading_factor: u8, power: i8, bandwidth: u32, coding_rate: u8) -> Self {
        Self {
            spreading_factor,
            power,
            bandwidth,
            coding_rate,
        }
    }
}

/// One candidate transmission configuration and the outcomes observed with it.
///
/// The four genes are fixed once the individual has been bred; only the outcome
/// counters change afterwards.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    spreading_factor: u8,
    power: i8,
    bandwidth: u32,
    coding_rate: u8,

    success_count: u32,
    failure_count: u32,
}

impl ParameterSet {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            spreading_factor: rng.gen_range(MIN_SPREADING_FACTOR..=MAX_SPREADING_FACTOR),
            power: rng.gen_range(MIN_POWER / POWER_STEP..=MAX_POWER / POWER_STEP) * POWER_STEP,
            bandwidth: BANDWIDTHS[rng.gen_range(0..BANDWIDTHS.len())],
            coding_rate: rng.gen_range(MIN_CODING_RATE..=MAX_CODING_RATE),
            success_count: 0,
            failure_count: 0,
        }
    }

    /// Builds a parameter set from explicit genes. Out of domain values are rejected.
    pub fn from_values(
        spreading_factor: u8,
        power: i8,
        bandwidth: u32,
        coding_rate: u8,
    ) -> Result<Self, OptimizerError> {
        if !(MIN_SPREADING_FACTOR..=MAX_SPREADING_FACTOR).contains(&spreading_factor) {
            return Err(OptimizerError::OutOfDomain {
                gene: Gene::SpreadingFactor,
                value: spreading_factor as i64,
            });
        }

        if !(MIN_POWER..=MAX_POWER).contains(&power) || power % POWER_STEP != 0 {
            return Err(OptimizerError::OutOfDomain {
                gene: Gene::Power,
                value: power as i64,
            });
        }

        if !BANDWIDTHS.contains(&bandwidth) {
            return Err(OptimizerError::OutOfDomain {
                gene: Gene::Bandwidth,
                value: bandwidth as i64,
            });
        }

        if !(MIN_CODING_RATE..=MAX_CODING_RATE).contains(&coding_rate) {
            return Err(OptimizerError::OutOfDomain {
                gene: Gene::CodingRate,
                value: coding_rate as i64,
            });
        }

        Ok(Self {
            spreading_factor,
            power,
            bandwidth,
            coding_rate,
            success_count: 0,
            failure_count: 0,
        })
    }

    pub fn from_gene_values(values: &GeneValues) -> Result<Self, OptimizerError> {
        Self::from_values(
            values.spreading_factor,
            values.power,
            values.bandwidth,
            values.coding_rate,
        )
    }

    /// Single pivot crossover.
    ///
    /// With probability `crossover_rate` the child is a copy of `parent_a`.
    /// Otherwise genes before `pivot` come from `parent_a` and genes from
    /// `pivot` onwards come from `parent_b`. The child starts without outcomes.
    ///
    /// `crossover_rate` is clamped to `[0, 1]`, NaN counts as 0.
    pub fn crossover<R: Rng>(
        parent_a: &ParameterSet,
        parent_b: &ParameterSet,
        pivot: Gene,
        crossover_rate: f64,
        rng: &mut R,
    ) -> Self {
        if rng.gen_bool(probability(crossover_rate)) {
            return parent_a.genes();
        }

        let parent_for = |gene: Gene| {
            if gene.position() < pivot.position() {
                parent_a
            } else {
                parent_b
            }
        };

        Self {
            spreading_factor: parent_for(Gene::SpreadingFactor).spreading_factor,
            power: parent_for(Gene::Power).power,
            bandwidth: parent_for(Gene::Bandwidth).bandwidth,
            coding_rate: parent_for(Gene::CodingRate).coding_rate,
            success_count: 0,
            failure_count: 0,
        }
    }

    /// Perturbs each gene independently with probability `mutation_rate`,
    /// clamped to `[0, 1]` with NaN counting as 0.
    pub fn mutate<R: Rng>(&mut self, mutation_rate: f64, rng: &mut R) {
        let mutation_rate = probability(mutation_rate);

        if rng.gen_bool(mutation_rate) {
            self.spreading_factor = step_within(
                self.spreading_factor as i64,
                1,
                MIN_SPREADING_FACTOR as i64,
                MAX_SPREADING_FACTOR as i64,
                rng,
            ) as u8;
        }

        if rng.gen_bool(mutation_rate) {
            self.power = step_within(
                self.power as i64,
                POWER_STEP as i64,
                MIN_POWER as i64,
                MAX_POWER as i64,
                rng,
            ) as i8;
        }

        if rng.gen_bool(mutation_rate) {
            self.bandwidth = if self.bandwidth == BANDWIDTH_125KHZ {
                BANDWIDTH_250KHZ
            } else {
                BANDWIDTH_125KHZ
            };
        }

        if rng.gen_bool(mutation_rate) {
            self.coding_rate = step_within(
                self.coding_rate as i64,
                1,
                MIN_CODING_RATE as i64,
                MAX_CODING_RATE as i64,
                rng,
            ) as u8;
        }
    }

    pub fn record_outcome(&mut self, success: bool) {
        if success {
            self.success_count = self.success_count.saturating_add(1);
        } else {
            self.failure_count = self.failure_count.saturating_add(1);
        }
    }

    /// Gene-wise equality, outcome counters are ignored.
    pub fn is_equal(&self, other: &ParameterSet) -> bool {
        self.spreading_factor == other.spreading_factor
            && self.power == other.power
            && self.bandwidth == other.bandwidth
            && self.coding_rate == other.coding_rate
    }

    /// Copy of the genes without any outcome.
    pub fn genes(&self) -> Self {
        Self {
            success_count: 0,
            failure_count: 0,
            ..self.clone()
        }
    }

    pub fn gene_values(&self) -> GeneValues {
        GeneValues::new(
            self.spreading_factor,
            self.power,
            self.bandwidth,
            self.coding_rate,
        )
    }

    pub fn to_modulation(&self) -> LoraModulation {
        LoraModulation::new(
            self.spreading_factor,
            self.bandwidth,
            self.coding_rate,
            self.power,
        )
    }

    /// PHY bit rate in bit/s
    pub fn data_rate(&self) -> f64 {
        self.to_modulation().bit_rate()
    }

    pub fn power_consumption(&self) -> f64 {
        fitness::normalized_power_consumption(&self.to_modulation())
    }

    pub fn trials(&self) -> u32 {
        self.success_count.saturating_add(self.failure_count)
    }

    /// Fraction of failed trials, 0 when nothing has been tried yet.
    pub fn packet_error_rate(&self) -> f64 {
        let trials = self.success_count as f64 + self.failure_count as f64;
        if trials == 0.0 {
            return 0.0;
        }

        self.failure_count as f64 / trials
    }

    pub fn fitness(&self) -> f64 {
        fitness::fitness(self.power_consumption(), self.packet_error_rate())
    }

    pub fn spreading_factor(&self) -> u8 {
        self.spreading_factor
    }

    pub fn power(&self) -> i8 {
        self.power
    }

    pub fn bandwidth(&self) -> u32 {
        self.bandwidth
    }

    pub fn coding_rate(&self) -> u8 {
        self.coding_rate
    }

    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }
}

impl PartialEq for ParameterSet {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl Eq for ParameterSet {}

impl From<&ParameterSet> for LoraModulation {
    fn from(value: &ParameterSet) -> Self {
        value.to_modulation()
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SF={} PW={} BW={} CR=4/{} FITNESS={:.6} PER={:.3} OK={} FAIL={}",
            self.spreading_factor,
            self.power,
            self.bandwidth,
            self.coding_rate + 4,
            self.fitness(),
            self.packet_error_rate(),
            self.success_count,
            self.failure_count
        )
    }
}

/// `rate` as a probability accepted by [`Rng::gen_bool`]
fn probability(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

/// Moves `value` by `delta` towards the inside of `[min, max]`: always up from
/// the minimum, always down from the maximum, otherwise on a coin flip.
fn step_within<R: Rng>(value: i64, delta: i64, min: i64, max: i64, rng: &mut R) -> i64 {
    let stepped = if value <= min {
        value + delta
    } else if value >= max {
        value - delta
    } else if rng.gen_bool(0.5) {
        value + delta
    } else {
        value - delta
    };

    stepped.clamp(min, max)
}
