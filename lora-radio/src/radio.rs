use core::time::Duration;

use crate::{error::LoraError, modulation::LoraModulation};

pub struct TransmitResult {
    /// Time the uplink occupied the channel
    pub airtime: Duration,
    /// Received power at the gateway in dBm
    pub rssi: f64,
    /// Uplink reached the gateway
    pub delivered: bool,
    /// Downlink acknowledgement reached the device. Always `false` for unconfirmed frames.
    pub acknowledged: bool,
}

pub trait Radio {
    fn set_modulation(&mut self, modulation: &LoraModulation) -> Result<(), LoraError>;

    fn modulation(&self) -> LoraModulation;

    fn transmit(&mut self, payload: &[u8], confirmed: bool) -> Result<TransmitResult, LoraError>;
}
