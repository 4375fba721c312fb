use lora_radio::{modulation::MAX_DATA_RATE, LoraError, LoraModulation};

/// Transmit power restored whenever the data rate is lowered (dBm)
pub const DEFAULT_TX_POWER: i8 = 14;

/// LoRaWAN 1.0.2 end device data rate adaptation.
///
/// While a confirmed frame stays unacknowledged, every second retransmission
/// lowers the data rate by one step and restores full transmit power.
#[derive(Debug, Clone)]
pub struct DataRateAdaptation {
    data_rate: u8,
    tx_power: i8,
    coding_rate: u8,
    max_transmissions: u8,
}

impl DataRateAdaptation {
    pub fn new(data_rate: u8, max_transmissions: u8) -> Result<Self, LoraError> {
        if data_rate > MAX_DATA_RATE {
            return Err(LoraError::UnsupportedDataRate(data_rate));
        }

        Ok(Self {
            data_rate,
            tx_power: DEFAULT_TX_POWER,
            coding_rate: 1,
            max_transmissions,
        })
    }

    #[cfg(test)]
    pub fn with_tx_power(mut self, tx_power: i8) -> Self {
        self.tx_power = tx_power;
        self
    }

    /// Applies the adaptation rule ahead of a transmission with `retx_left`
    /// attempts remaining, the first attempt of a frame having `max_transmissions`.
    ///
    /// Returns `true` when the data rate was lowered.
    pub fn before_transmission(&mut self, retx_left: u8) -> bool {
        if self.data_rate > 0 && retx_left < self.max_transmissions && retx_left % 2 == 0 {
            self.tx_power = DEFAULT_TX_POWER;
            self.data_rate -= 1;
            return true;
        }

        false
    }

    pub fn modulation(&self) -> Result<LoraModulation, LoraError> {
        let mut modulation = LoraModulation::from_data_rate(self.data_rate, self.tx_power)?;
        modulation.coding_rate = self.coding_rate;
        Ok(modulation)
    }

    pub fn data_rate(&self) -> u8 {
        self.data_rate
    }

    pub fn tx_power(&self) -> i8 {
        self.tx_power
    }
}
