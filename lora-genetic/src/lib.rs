pub mod config;
pub mod error;
pub mod fitness;
pub mod optimizer;
pub mod parameter_set;
pub mod report;
pub mod selection;

pub use config::{OptimizerConfig, DEFAULT_SEEDS};
pub use error::OptimizerError;
pub use optimizer::{GeneticOptimizer, OptimizerState};
pub use parameter_set::{Gene, GeneValues, ParameterSet};
pub use report::{PopulationReport, ReportEntry};
