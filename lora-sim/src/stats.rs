use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

/// Number of recent attempts the sliding success rate is computed over
pub const SUCCESS_WINDOW: usize = 32;

/// Per device transmission counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceStats {
    pub transmissions_sent: u64,
    pub unacknowledged_transmissions: u64,
    pub frames_sent: u64,
    pub frames_delivered: u64,
    /// Sum of airtime (s) times transmit power (dBm) over all transmissions
    pub total_energy: f64,
    /// Fitness of the parameter set used for the latest transmission
    pub last_fitness: Option<f64>,
    #[serde(skip)]
    recent: VecDeque<bool>,
}

impl DeviceStats {
    pub fn record_transmission(&mut self, airtime: Duration, tx_power: i8) {
        self.transmissions_sent += 1;
        self.total_energy += airtime.as_secs_f64() * tx_power as f64;
    }

    pub fn record_attempt(&mut self, success: bool) {
        if self.recent.len() == SUCCESS_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(success);
    }

    pub fn record_unacknowledged(&mut self) {
        self.unacknowledged_transmissions += 1;
    }

    pub fn record_frame(&mut self, delivered: bool) {
        self.frames_sent += 1;
        if delivered {
            self.frames_delivered += 1;
        }
    }

    pub fn packet_error_rate(&self) -> f64 {
        if self.transmissions_sent == 0 {
            return 0.0;
        }

        self.unacknowledged_transmissions as f64 / self.transmissions_sent as f64
    }

    /// Success rate over the last [`SUCCESS_WINDOW`] attempts
    pub fn success_rate(&self) -> Option<f64> {
        if self.recent.is_empty() {
            return None;
        }

        let successes = self.recent.iter().filter(|&&success| success).count();
        Some(successes as f64 / self.recent.len() as f64)
    }
}
