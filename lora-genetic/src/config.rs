use serde::{Deserialize, Serialize};

use crate::{
    error::OptimizerError,
    parameter_set::{GeneValues, ParameterSet, DOMAIN_SIZE},
};

/// Hand picked starting population spanning the SF / power / bandwidth / coding rate space
pub const DEFAULT_SEEDS: [GeneValues; 16] = [
    GeneValues::new(7, 2, 125_000, 1),
    GeneValues::new(7, 14, 250_000, 1),
    GeneValues::new(8, 4, 125_000, 1),
    GeneValues::new(8, 12, 250_000, 2),
    GeneValues::new(9, 2, 125_000, 1),
    GeneValues::new(9, 10, 250_000, 3),
    GeneValues::new(10, 6, 125_000, 2),
    GeneValues::new(10, 14, 250_000, 1),
    GeneValues::new(11, 8, 125_000, 2),
    GeneValues::new(11, 2, 250_000, 1),
    GeneValues::new(12, 14, 125_000, 2),
    GeneValues::new(12, 2, 250_000, 1),
    GeneValues::new(7, 12, 125_000, 4),
    GeneValues::new(8, 4, 250_000, 3),
    GeneValues::new(9, 12, 125_000, 4),
    GeneValues::new(8, 8, 250_000, 3),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub population_size: usize,
    pub max_generations: u32,
    /// Fittest individuals carried unchanged into the next generation
    pub elite_count: usize,
    /// Per gene mutation probability
    pub mutation_rate: f64,
    /// Probability that a child is a plain copy of its first parent
    pub crossover_rate: f64,
    /// Seed of the optimizer's random generator, entropy when absent
    pub rng_seed: Option<u64>,
    /// Starting population, fillers are bred when it holds fewer distinct entries
    /// than `population_size`
    pub seeds: Vec<GeneValues>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            population_size: 16,
            max_generations: 10,
            elite_count: 4,
            mutation_rate: 0.15,
            crossover_rate: 0.2,
            rng_seed: None,
            seeds: DEFAULT_SEEDS.to_vec(),
        }
    }
}

impl OptimizerConfig {
    pub fn with_population_size(mut self, population_size: usize) -> Self {
        self.population_size = population_size;
        self
    }

    pub fn with_max_generations(mut self, max_generations: u32) -> Self {
        self.max_generations = max_generations;
        self
    }

    pub fn with_elite_count(mut self, elite_count: usize) -> Self {
        self.elite_count = elite_count;
        self
    }

    pub fn with_mutation_rate(mut self, mutation_rate: f64) -> Self {
        self.mutation_rate = mutation_rate;
        self
    }

    pub fn with_crossover_rate(mut self, crossover_rate: f64) -> Self {
        self.crossover_rate = crossover_rate;
        self
    }

    pub fn with_rng_seed(mut self, rng_seed: u64) -> Self {
        self.rng_seed = Some(rng_seed);
        self
    }

    pub fn with_seeds(mut self, seeds: Vec<GeneValues>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn validate(&self) -> Result<(), OptimizerError> {
        if self.population_size < 2 {
            return Err(OptimizerError::InvalidConfig(format!(
                "population size {} is below 2",
                self.population_size
            )));
        }

        if self.population_size > DOMAIN_SIZE {
            return Err(OptimizerError::InvalidConfig(format!(
                "population size {} exceeds the {} distinct parameter sets",
                self.population_size, DOMAIN_SIZE
            )));
        }

        if self.elite_count >= self.population_size {
            return Err(OptimizerError::InvalidConfig(format!(
                "elite count {} leaves no room for offspring in a population of {}",
                self.elite_count, self.population_size
            )));
        }

        if self.max_generations == 0 {
            return Err(OptimizerError::InvalidConfig(
                "at least one generation is required".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(OptimizerError::InvalidConfig(format!(
                "mutation rate {} is outside [0, 1]",
                self.mutation_rate
            )));
        }

        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(OptimizerError::InvalidConfig(format!(
                "crossover rate {} is outside [0, 1]",
                self.crossover_rate
            )));
        }

        self.seed_parameter_sets().map(|_| ())
    }

    pub fn seed_parameter_sets(&self) -> Result<Vec<ParameterSet>, OptimizerError> {
        self.seeds.iter().map(ParameterSet::from_gene_values).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = OptimizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seed_parameter_sets().expect("seeds").len(), 16);
    }

    #[test]
    fn test_rejects_inconsistent_config() {
        let base = OptimizerConfig::default();

        assert!(base.clone().with_population_size(1).validate().is_err());
        assert!(base.clone().with_population_size(DOMAIN_SIZE + 1).validate().is_err());
        assert!(base
            .clone()
            .with_population_size(4)
            .with_elite_count(4)
            .validate()
            .is_err());
        assert!(base.clone().with_max_generations(0).validate().is_err());
        assert!(base.clone().with_mutation_rate(1.5).validate().is_err());
        assert!(base.clone().with_crossover_rate(-0.1).validate().is_err());
        assert!(base.clone().with_mutation_rate(f64::NAN).validate().is_err());

        let bad_seed = base.with_seeds(vec![GeneValues::new(13, 2, 125_000, 1)]);
        assert!(matches!(
            bad_seed.validate(),
            Err(OptimizerError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn test_deserialize_partial_toml_like_json() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{ "population_size": 8, "elite_count": 2 }"#)
                .expect("parsed config");

        assert_eq!(config.population_size, 8);
        assert_eq!(config.elite_count, 2);
        assert_eq!(config.max_generations, 10);
        assert_eq!(config.seeds.len(), DEFAULT_SEEDS.len());
    }
}
