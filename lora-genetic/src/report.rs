use core::fmt;

use serde::Serialize;

use crate::{
    optimizer::OptimizerState,
    parameter_set::{GeneValues, ParameterSet},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    /// Generation the parameter set was first created in
    pub generation: u32,
    pub master_index: usize,
    pub genes: GeneValues,
    pub fitness: f64,
    pub packet_error_rate: f64,
    pub success_count: u32,
    pub failure_count: u32,
}

impl ReportEntry {
    pub fn new(generation: u32, master_index: usize, parameter_set: &ParameterSet) -> Self {
        Self {
            generation,
            master_index,
            genes: parameter_set.gene_values(),
            fitness: parameter_set.fitness(),
            packet_error_rate: parameter_set.packet_error_rate(),
            success_count: parameter_set.success_count(),
            failure_count: parameter_set.failure_count(),
        }
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<4} gen:{:<3} SF={} PW={} BW={} CR=4/{} FITNESS={:.6} PER={:.3} OK={} FAIL={}",
            self.master_index,
            self.generation,
            self.genes.spreading_factor,
            self.genes.power,
            self.genes.bandwidth,
            self.genes.coding_rate + 4,
            self.fitness,
            self.packet_error_rate,
            self.success_count,
            self.failure_count
        )
    }
}

/// Snapshot of the optimizer, either of the current generation or of the whole master list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationReport {
    pub generation: u32,
    pub state: OptimizerState,
    pub most_fit: Option<ReportEntry>,
    pub entries: Vec<ReportEntry>,
}

impl fmt::Display for PopulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "generation {} ({:?}), {} entries",
            self.generation,
            self.state,
            self.entries.len()
        )?;

        if let Some(most_fit) = &self.most_fit {
            writeln!(f, "most fit {}", most_fit)?;
        }

        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }

        Ok(())
    }
}
