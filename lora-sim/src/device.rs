use lora_genetic::{GeneticOptimizer, PopulationReport};
use lora_radio::{radio::Radio, LoraModulation};

use crate::{adr::DataRateAdaptation, config::SelectionMode, error::SimError, stats::DeviceStats};

pub enum ParameterSelection {
    Genetic(Box<GeneticOptimizer>),
    DataRateAdaptation(DataRateAdaptation),
}

impl ParameterSelection {
    pub fn mode(&self) -> SelectionMode {
        match self {
            ParameterSelection::Genetic(_) => SelectionMode::Genetic,
            ParameterSelection::DataRateAdaptation(_) => SelectionMode::DataRateAdaptation,
        }
    }
}

/// Class A end device sending uplinks to a single gateway.
///
/// In genetic mode frames are confirmed while the optimizer is still searching
/// so that every attempt yields an outcome, and unconfirmed once it converged.
/// In data rate adaptation mode every frame is confirmed.
pub struct EndDevice<R: Radio> {
    id: usize,
    radio: R,
    selection: ParameterSelection,
    max_transmissions: u8,
    stats: DeviceStats,
}

impl<R: Radio> EndDevice<R> {
    pub fn new(id: usize, radio: R, selection: ParameterSelection, max_transmissions: u8) -> Self {
        Self {
            id,
            radio,
            selection,
            max_transmissions: max_transmissions.max(1),
            stats: DeviceStats::default(),
        }
    }

    fn is_confirmed(&self) -> bool {
        match &self.selection {
            ParameterSelection::Genetic(optimizer) => optimizer.is_optimizing(),
            ParameterSelection::DataRateAdaptation(_) => true,
        }
    }

    /// Parameters of the next attempt. For genetic selection the parameter set
    /// is checked out and has to be reported once the attempt completed.
    fn select_modulation(&mut self, retx_left: u8) -> Result<(LoraModulation, bool), SimError> {
        match &mut self.selection {
            ParameterSelection::Genetic(optimizer) => {
                let reportable = optimizer.is_optimizing();
                let parameter_set = optimizer.checkout();
                self.stats.last_fitness = Some(parameter_set.fitness());
                Ok((parameter_set.to_modulation(), reportable))
            }
            ParameterSelection::DataRateAdaptation(adr) => {
                if adr.before_transmission(retx_left) {
                    log::debug!(
                        "MAC: device {} with {} attempts left, lowered to DR{} at {} dBm",
                        self.id,
                        retx_left,
                        adr.data_rate(),
                        adr.tx_power()
                    );
                }
                Ok((adr.modulation()?, false))
            }
        }
    }

    /// Sends one frame, retransmitting a confirmed frame until it is
    /// acknowledged or `max_transmissions` attempts were made.
    ///
    /// Returns whether the frame reached the gateway.
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<bool, SimError> {
        let confirmed = self.is_confirmed();
        let mut retx_left = self.max_transmissions;
        let mut delivered = false;

        while retx_left > 0 {
            let (modulation, reportable) = self.select_modulation(retx_left)?;
            self.radio.set_modulation(&modulation)?;

            let result = self.radio.transmit(payload, confirmed)?;
            self.stats
                .record_transmission(result.airtime, modulation.tx_power);
            retx_left -= 1;

            if reportable {
                if let ParameterSelection::Genetic(optimizer) = &mut self.selection {
                    optimizer.report_outcome(result.acknowledged)?;
                }
            }

            if !confirmed {
                self.stats.record_attempt(result.delivered);
                delivered = result.delivered;
                break;
            }

            self.stats.record_attempt(result.acknowledged);

            if result.acknowledged {
                delivered = true;
                break;
            }

            self.stats.record_unacknowledged();
            delivered |= result.delivered;
        }

        if !delivered {
            log::debug!(
                "MAC: device {} gave up after {} attempts",
                self.id,
                self.max_transmissions - retx_left
            );
        }

        self.stats.record_frame(delivered);

        Ok(delivered)
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn mode(&self) -> SelectionMode {
        self.selection.mode()
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn stats(&self) -> &DeviceStats {
        &self.stats
    }

    pub fn optimizer(&self) -> Option<&GeneticOptimizer> {
        match &self.selection {
            ParameterSelection::Genetic(optimizer) => Some(optimizer),
            ParameterSelection::DataRateAdaptation(_) => None,
        }
    }

    /// Current data rate index of a data rate adaptation device
    pub fn data_rate(&self) -> Option<u8> {
        match &self.selection {
            ParameterSelection::Genetic(_) => None,
            ParameterSelection::DataRateAdaptation(adr) => Some(adr.data_rate()),
        }
    }

    pub fn report(&self) -> Option<PopulationReport> {
        self.optimizer().map(GeneticOptimizer::report)
    }

    /// Parameters the next frame would start with
    pub fn current_modulation(&self) -> Result<LoraModulation, SimError> {
        match &self.selection {
            ParameterSelection::Genetic(optimizer) => {
                Ok(optimizer.current_parameter_set().to_modulation())
            }
            ParameterSelection::DataRateAdaptation(adr) => Ok(adr.modulation()?),
        }
    }
}
