use core::fmt;

use lora_genetic::OptimizerError;
use lora_radio::LoraError;

#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    Radio(LoraError),
    Optimizer(OptimizerError),
    InvalidConfig(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::Radio(err) => write!(f, "radio error: {}", err),
            SimError::Optimizer(err) => write!(f, "optimizer error: {}", err),
            SimError::InvalidConfig(reason) => write!(f, "invalid simulation configuration: {}", reason),
        }
    }
}

impl std::error::Error for SimError {}

impl From<LoraError> for SimError {
    fn from(value: LoraError) -> Self {
        SimError::Radio(value)
    }
}

impl From<OptimizerError> for SimError {
    fn from(value: OptimizerError) -> Self {
        SimError::Optimizer(value)
    }
}
