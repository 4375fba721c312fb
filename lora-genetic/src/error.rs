use core::fmt;

use crate::parameter_set::Gene;

#[derive(Debug, Clone, PartialEq)]
pub enum OptimizerError {
    /// Rejected optimizer configuration
    InvalidConfig(String),
    /// Gene value outside of its domain
    OutOfDomain { gene: Gene, value: i64 },
    /// Outcome reported without a checked out parameter set
    NoPendingTrial,
}

impl fmt::Display for OptimizerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptimizerError::InvalidConfig(reason) => {
                write!(f, "invalid optimizer configuration: {}", reason)
            }
            OptimizerError::OutOfDomain { gene, value } => {
                write!(f, "{} value {} is out of domain", gene, value)
            }
            OptimizerError::NoPendingTrial => {
                write!(f, "outcome reported without a pending parameter set")
            }
        }
    }
}

impl std::error::Error for OptimizerError {}
