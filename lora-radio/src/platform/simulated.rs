use rand::Rng;

use crate::{
    channel::{gateway_sensitivity, LogDistanceChannel},
    error::LoraError,
    modulation::{LoraModulation, BANDWIDTH_125KHZ},
    radio::{Radio, TransmitResult},
};

/// Transmit power used by the gateway for acknowledgements (dBm)
pub const GATEWAY_TX_POWER: f64 = 14.0;

/// End device radio linked to a single gateway over a [`LogDistanceChannel`]
pub struct SimulatedRadio<R: Rng> {
    modulation: LoraModulation,
    channel: LogDistanceChannel,
    distance: f64,
    rng: R,
}

impl<R: Rng> SimulatedRadio<R> {
    pub fn new(channel: LogDistanceChannel, distance: f64, rng: R) -> Self {
        Self {
            modulation: LoraModulation::new(12, BANDWIDTH_125KHZ, 1, 14),
            channel,
            distance,
            rng,
        }
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }
}

impl<R: Rng> Radio for SimulatedRadio<R> {
    fn set_modulation(&mut self, modulation: &LoraModulation) -> Result<(), LoraError> {
        modulation.validate()?;
        self.modulation = *modulation;
        Ok(())
    }

    fn modulation(&self) -> LoraModulation {
        self.modulation
    }

    fn transmit(&mut self, payload: &[u8], confirmed: bool) -> Result<TransmitResult, LoraError> {
        let airtime = self.modulation.time_on_air(payload.len())?;
        let sensitivity = gateway_sensitivity(&self.modulation);

        let rssi = self.channel.received_power(
            self.modulation.tx_power as f64,
            self.distance,
            &mut self.rng,
        );
        let delivered = rssi >= sensitivity;

        // The acknowledgement crosses the same channel with an independent fading draw
        let acknowledged = confirmed
            && delivered
            && self
                .channel
                .received_power(GATEWAY_TX_POWER, self.distance, &mut self.rng)
                >= sensitivity;

        log::trace!(
            "SIM: TX {} {} bytes rssi:{:.1} dBm sens:{:.1} dBm delivered:{} ack:{}",
            self.modulation,
            payload.len(),
            rssi,
            sensitivity,
            delivered,
            acknowledged
        );

        Ok(TransmitResult {
            airtime,
            rssi,
            delivered,
            acknowledged,
        })
    }
}
