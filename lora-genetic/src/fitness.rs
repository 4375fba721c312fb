//! Power and fitness model. Lower fitness is better.

use core::cmp::Ordering;

use lora_radio::modulation::{LoraModulation, BANDWIDTH_125KHZ, BANDWIDTH_250KHZ};

use crate::parameter_set::ParameterSet;

/// Fitness of a parameter set that never got through.
pub const WORST_FITNESS: f64 = f64::MAX;

/// Amount of data the energy figure is computed for (bits).
const REFERENCE_PAYLOAD_BITS: f64 = 1000.0;

/// Cheapest configuration of the search domain: SF7, 250 kHz, CR 4/5, 2 dBm.
pub fn reference_min_power_consumption() -> f64 {
    raw_power_consumption(&LoraModulation::new(7, BANDWIDTH_250KHZ, 1, 2))
}

/// Most expensive configuration of the search domain: SF12, 125 kHz, CR 4/8, 14 dBm.
pub fn reference_max_power_consumption() -> f64 {
    raw_power_consumption(&LoraModulation::new(12, BANDWIDTH_125KHZ, 4, 14))
}

/// Energy-proportional cost of sending [`REFERENCE_PAYLOAD_BITS`]: airtime times power.
pub fn raw_power_consumption(modulation: &LoraModulation) -> f64 {
    let data_rate = modulation.bit_rate();
    if data_rate <= 0.0 || !data_rate.is_finite() {
        return f64::INFINITY;
    }

    (REFERENCE_PAYLOAD_BITS / data_rate) * modulation.tx_power as f64
}

/// Power consumption scaled by the reference maximum.
///
/// Bounded by [`power_consumption_floor`] and 1, modulations outside the search
/// domain are clamped to these bounds.
pub fn normalized_power_consumption(modulation: &LoraModulation) -> f64 {
    let raw = raw_power_consumption(modulation);
    if !raw.is_finite() {
        return 1.0;
    }

    (raw / reference_max_power_consumption()).clamp(power_consumption_floor(), 1.0)
}

/// Normalized power consumption of the cheapest configuration of the search domain.
pub fn power_consumption_floor() -> f64 {
    reference_min_power_consumption() / reference_max_power_consumption()
}

/// Mean number of retransmissions before success when every attempt fails with
/// probability `packet_error_rate`.
pub fn expected_retransmissions(packet_error_rate: f64) -> f64 {
    let per = packet_error_rate.clamp(0.0, 1.0);
    if per >= 1.0 {
        return WORST_FITNESS;
    }

    per / (1.0 - per)
}

pub fn fitness(power_consumption: f64, packet_error_rate: f64) -> f64 {
    if packet_error_rate >= 1.0 || !power_consumption.is_finite() {
        return WORST_FITNESS;
    }

    let score = power_consumption * (1.0 + expected_retransmissions(packet_error_rate));
    if score.is_finite() {
        score
    } else {
        WORST_FITNESS
    }
}

/// Ascending fitness order, used with stable sorts.
pub fn compare_fitness(a: &ParameterSet, b: &ParameterSet) -> Ordering {
    a.fitness()
        .partial_cmp(&b.fitness())
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lora_radio::modulation::BANDWIDTH_500KHZ;

    #[test]
    fn test_reference_bounds() {
        let min = reference_min_power_consumption();
        let max = reference_max_power_consumption();
        assert!(min > 0.0);
        assert!(min < max);

        let cheapest = LoraModulation::new(7, BANDWIDTH_250KHZ, 1, 2);
        let dearest = LoraModulation::new(12, BANDWIDTH_125KHZ, 4, 14);
        assert_eq!(normalized_power_consumption(&dearest), 1.0);
        assert_eq!(normalized_power_consumption(&cheapest), power_consumption_floor());
        assert!(power_consumption_floor() > 0.0);
        assert!(power_consumption_floor() < 0.01);
    }

    #[test]
    fn test_out_of_domain_modulation_is_clamped() {
        let wider = LoraModulation::new(7, BANDWIDTH_500KHZ, 1, 2);
        assert!(raw_power_consumption(&wider) < reference_min_power_consumption());
        assert_eq!(normalized_power_consumption(&wider), power_consumption_floor());

        let louder = LoraModulation::new(12, BANDWIDTH_125KHZ, 4, 20);
        assert_eq!(normalized_power_consumption(&louder), 1.0);
    }

    #[test]
    fn test_expected_retransmissions() {
        assert_eq!(expected_retransmissions(0.0), 0.0);
        assert!((expected_retransmissions(0.5) - 1.0).abs() < 1e-12);
        assert!(expected_retransmissions(0.9) > expected_retransmissions(0.5));
        assert_eq!(expected_retransmissions(1.0), WORST_FITNESS);
    }

    #[test]
    fn test_fitness_monotonic_in_error_rate() {
        let power = 0.25;
        let mut previous = fitness(power, 0.0);
        assert_eq!(previous, power);

        for step in 1..=100 {
            let per = step as f64 / 100.0;
            let score = fitness(power, per);
            assert!(score.is_finite());
            assert!(score >= previous);
            previous = score;
        }

        assert_eq!(fitness(power, 1.0), WORST_FITNESS);
        assert_eq!(fitness(f64::INFINITY, 0.0), WORST_FITNESS);
    }
}
