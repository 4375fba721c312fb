use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use crate::{
    config::OptimizerConfig,
    error::OptimizerError,
    fitness::compare_fitness,
    parameter_set::{Gene, ParameterSet},
    report::{PopulationReport, ReportEntry},
    selection::RouletteWheel,
};

/// Breeding attempts for a seed filler before falling back to a random individual
const FILLER_RETRY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptimizerState {
    Seeding,
    Optimizing,
    Converged,
}

/// Generational genetic search over LoRa transmission parameters.
///
/// Every individual of a generation is tried in turn: the caller checks out the
/// current parameter set, transmits with it and reports whether the transmission
/// was acknowledged. Once the whole generation has been tried the next one is
/// bred from it. After `max_generations` the fittest individual is frozen and
/// returned forever after.
///
/// All individuals live in an append-only master list; a generation is a list of
/// indices into it. Equal gene combinations share one master list entry so their
/// outcomes accumulate.
pub struct GeneticOptimizer {
    config: OptimizerConfig,
    state: OptimizerState,

    master_list: Vec<ParameterSet>,
    /// Generation in which each master list entry first appeared
    introduced_in: Vec<u32>,
    current_population: Vec<usize>,

    current_index: usize,
    current_generation: u32,
    most_fit: Option<ParameterSet>,

    trial_pending: bool,
    rng: StdRng,
}

impl GeneticOptimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        config.validate()?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let seeds = config.seed_parameter_sets()?;

        let mut optimizer = Self {
            state: OptimizerState::Seeding,
            master_list: Vec::new(),
            introduced_in: Vec::new(),
            current_population: Vec::with_capacity(config.population_size),
            current_index: 0,
            current_generation: 0,
            most_fit: None,
            trial_pending: false,
            rng,
            config,
        };

        optimizer.initialize(seeds);

        Ok(optimizer)
    }

    fn initialize(&mut self, seeds: Vec<ParameterSet>) {
        let population_size = self.config.population_size;

        for seed in seeds {
            if self.current_population.len() == population_size {
                break;
            }

            let (index, is_new) = self.add_to_master_list(seed);
            if is_new {
                self.current_population.push(index);
            }
        }

        let seeded = self.current_population.len();

        while self.current_population.len() < population_size {
            let filler = self.breed_filler();
            let (index, is_new) = self.add_to_master_list(filler);
            if is_new {
                self.current_population.push(index);
            }
        }

        self.current_index = 0;
        self.current_generation = 0;
        self.state = OptimizerState::Optimizing;

        log::info!(
            "GA: Initial population of {} ({} seeded, {} bred), {} generations, {} elites",
            population_size,
            seeded,
            population_size - seeded,
            self.config.max_generations,
            self.config.elite_count
        );
    }

    /// Child of two seeds that is not in the master list yet, or a random individual.
    fn breed_filler(&mut self) -> ParameterSet {
        if self.current_population.is_empty() {
            return ParameterSet::random(&mut self.rng);
        }

        for _ in 0..FILLER_RETRY_LIMIT {
            let count = self.current_population.len();
            let parent_a = self.current_population[self.rng.gen_range(0..count)];
            let parent_b = self.current_population[self.rng.gen_range(0..count)];
            let pivot = Gene::random_pivot(&mut self.rng);

            let mut child = ParameterSet::crossover(
                &self.master_list[parent_a],
                &self.master_list[parent_b],
                pivot,
                self.config.crossover_rate,
                &mut self.rng,
            );
            child.mutate(self.config.mutation_rate, &mut self.rng);

            if self.find(&child).is_none() {
                return child;
            }
        }

        ParameterSet::random(&mut self.rng)
    }

    fn find(&self, candidate: &ParameterSet) -> Option<usize> {
        self.master_list
            .iter()
            .position(|entry| entry.is_equal(candidate))
    }

    /// Index of `candidate` in the master list and whether it was appended.
    ///
    /// An equal entry is reused as is: the candidate is dropped and the entry's
    /// outcome counters stay untouched.
    pub fn add_to_master_list(&mut self, candidate: ParameterSet) -> (usize, bool) {
        if let Some(index) = self.find(&candidate) {
            return (index, false);
        }

        self.master_list.push(candidate);
        self.introduced_in.push(self.current_generation);

        (self.master_list.len() - 1, true)
    }

    /// Parameter set to use for the next transmission. No side effects.
    pub fn current_parameter_set(&self) -> ParameterSet {
        match (self.state, &self.most_fit) {
            (OptimizerState::Converged, Some(most_fit)) => most_fit.clone(),
            _ => self.master_list[self.current_population[self.current_index]].clone(),
        }
    }

    /// Same as [`Self::current_parameter_set`], and marks the returned set as in
    /// use so that exactly one outcome can be reported for it.
    pub fn checkout(&mut self) -> ParameterSet {
        if self.state == OptimizerState::Optimizing {
            self.trial_pending = true;
        }

        self.current_parameter_set()
    }

    /// Records the outcome of the checked out parameter set and moves on to the
    /// next individual, breeding a new generation when this one is exhausted.
    ///
    /// Does nothing once converged. Fails with [`OptimizerError::NoPendingTrial`]
    /// when no parameter set has been checked out since the last report.
    pub fn report_outcome(&mut self, success: bool) -> Result<(), OptimizerError> {
        if self.state == OptimizerState::Converged {
            return Ok(());
        }

        if !self.trial_pending {
            log::warn!("GA: Outcome reported without a checked out parameter set");
            return Err(OptimizerError::NoPendingTrial);
        }
        self.trial_pending = false;

        let index = self.current_population[self.current_index];
        let individual = &mut self.master_list[index];
        individual.record_outcome(success);

        log::debug!(
            "GA: gen {} [{}/{}] {} -> {}",
            self.current_generation,
            self.current_index + 1,
            self.config.population_size,
            individual,
            if success { "ack" } else { "no ack" }
        );

        self.advance();

        Ok(())
    }

    fn advance(&mut self) {
        if self.current_index + 1 < self.config.population_size {
            self.current_index += 1;
            return;
        }

        self.current_generation += 1;

        if self.current_generation >= self.config.max_generations {
            self.converge();
        } else {
            self.next_generation();
            self.current_index = 0;
        }
    }

    fn converge(&mut self) {
        let ranking = self.ranked_population();
        let most_fit = self.master_list[ranking[0]].clone();

        log::info!(
            "GA: Converged after {} generations on {}",
            self.current_generation,
            most_fit
        );

        self.most_fit = Some(most_fit);
        self.current_index = 0;
        self.state = OptimizerState::Converged;
    }

    /// Master list indices of the current generation, fittest first.
    /// Equal fitness keeps the population order.
    pub fn ranked_population(&self) -> Vec<usize> {
        let mut ranking = self.current_population.clone();
        ranking.sort_by(|&a, &b| compare_fitness(&self.master_list[a], &self.master_list[b]));
        ranking
    }

    /// [`Self::ranked_population`] with repeated slots collapsed onto their first rank.
    pub fn distinct_ranking(&self) -> Vec<usize> {
        let mut distinct = Vec::with_capacity(self.current_population.len());
        for index in self.ranked_population() {
            if !distinct.contains(&index) {
                distinct.push(index);
            }
        }
        distinct
    }

    fn next_generation(&mut self) {
        let population_size = self.config.population_size;
        let ranking = self.distinct_ranking();

        let mut next = Vec::with_capacity(population_size);

        for &elite in ranking.iter().take(self.config.elite_count) {
            let (index, _) = self.add_to_master_list(self.master_list[elite].clone());
            next.push(index);
        }
        let elites = next.len();

        let wheel = RouletteWheel::from_ranking(&ranking);
        let mut bred = 0;

        while next.len() < population_size {
            let (parent_a, parent_b) = wheel.draw_parents(&mut self.rng);
            let pivot = Gene::random_pivot(&mut self.rng);

            let mut child = ParameterSet::crossover(
                &self.master_list[parent_a],
                &self.master_list[parent_b],
                pivot,
                self.config.crossover_rate,
                &mut self.rng,
            );
            child.mutate(self.config.mutation_rate, &mut self.rng);

            let (index, is_new) = self.add_to_master_list(child);
            if is_new {
                bred += 1;
            }

            next.push(index);
        }

        self.current_population = next;

        log::info!(
            "GA: Generation {} ready: {} elites, {} new individuals, master list holds {}",
            self.current_generation,
            elites,
            bred,
            self.master_list.len()
        );
    }

    pub fn is_optimizing(&self) -> bool {
        self.state == OptimizerState::Optimizing
    }

    pub fn state(&self) -> OptimizerState {
        self.state
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn population_size(&self) -> usize {
        self.config.population_size
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_generation(&self) -> u32 {
        self.current_generation
    }

    pub fn master_list(&self) -> &[ParameterSet] {
        &self.master_list
    }

    pub fn current_population(&self) -> &[usize] {
        &self.current_population
    }

    pub fn most_fit(&self) -> Option<&ParameterSet> {
        self.most_fit.as_ref()
    }

    pub fn has_pending_trial(&self) -> bool {
        self.trial_pending
    }

    fn entry(&self, index: usize) -> ReportEntry {
        ReportEntry::new(self.introduced_in[index], index, &self.master_list[index])
    }

    /// Current generation, one entry per population slot.
    pub fn report(&self) -> PopulationReport {
        let most_fit = self.most_fit.as_ref().map(|most_fit| {
            let index = self.find(most_fit).unwrap_or_default();
            self.entry(index)
        });

        PopulationReport {
            generation: self.current_generation,
            state: self.state,
            most_fit,
            entries: self
                .current_population
                .iter()
                .map(|&index| self.entry(index))
                .collect(),
        }
    }

    /// Every parameter set created so far.
    pub fn master_report(&self) -> PopulationReport {
        PopulationReport {
            entries: (0..self.master_list.len()).map(|index| self.entry(index)).collect(),
            ..self.report()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DEFAULT_SEEDS, parameter_set::GeneValues};

    fn config() -> OptimizerConfig {
        OptimizerConfig::default()
            .with_population_size(8)
            .with_elite_count(2)
            .with_max_generations(3)
            .with_rng_seed(42)
            .with_seeds(DEFAULT_SEEDS[..8].to_vec())
    }

    fn try_once(optimizer: &mut GeneticOptimizer, success: bool) {
        optimizer.checkout();
        optimizer.report_outcome(success).expect("reported outcome");
    }

    #[test]
    fn test_initial_population() {
        let optimizer = GeneticOptimizer::new(config()).expect("optimizer");

        assert!(optimizer.is_optimizing());
        assert_eq!(optimizer.state(), OptimizerState::Optimizing);
        assert_eq!(optimizer.current_index(), 0);
        assert_eq!(optimizer.current_generation(), 0);
        assert_eq!(optimizer.current_population(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(optimizer.master_list().len(), 8);
        assert_eq!(
            optimizer.current_parameter_set().gene_values(),
            GeneValues::new(7, 2, 125_000, 1)
        );
    }

    #[test]
    fn test_fillers_complete_small_seed_list() {
        let config = config()
            .with_population_size(12)
            .with_seeds(vec![
                GeneValues::new(7, 2, 125_000, 1),
                GeneValues::new(7, 2, 125_000, 1),
                GeneValues::new(12, 14, 250_000, 4),
            ]);
        let optimizer = GeneticOptimizer::new(config).expect("optimizer");

        let population = optimizer.current_population();
        assert_eq!(population.len(), 12);

        for (i, a) in population.iter().enumerate() {
            for b in population.iter().skip(i + 1) {
                assert!(!optimizer.master_list()[*a].is_equal(&optimizer.master_list()[*b]));
            }
        }
    }

    #[test]
    fn test_empty_seed_list_uses_random_individuals() {
        let optimizer =
            GeneticOptimizer::new(config().with_seeds(Vec::new())).expect("optimizer");
        assert_eq!(optimizer.current_population().len(), 8);
        assert_eq!(optimizer.master_list().len(), 8);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(matches!(
            GeneticOptimizer::new(config().with_elite_count(8)),
            Err(OptimizerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_current_parameter_set_has_no_side_effects() {
        let optimizer = GeneticOptimizer::new(config()).expect("optimizer");
        let first = optimizer.current_parameter_set();
        let second = optimizer.current_parameter_set();

        assert!(first.is_equal(&second));
        assert_eq!(optimizer.current_index(), 0);
        assert!(!optimizer.has_pending_trial());
    }

    #[test]
    fn test_cursor_advances_within_generation() {
        let mut optimizer = GeneticOptimizer::new(config()).expect("optimizer");

        for step in 1..optimizer.population_size() {
            try_once(&mut optimizer, step % 2 == 0);
            assert_eq!(optimizer.current_index(), step);
            assert_eq!(optimizer.current_generation(), 0);
        }

        let index = optimizer.current_population()[optimizer.current_index()];
        assert!(optimizer.current_parameter_set().is_equal(&optimizer.master_list()[index]));
    }

    #[test]
    fn test_report_without_checkout_is_rejected() {
        let mut optimizer = GeneticOptimizer::new(config()).expect("optimizer");

        assert_eq!(
            optimizer.report_outcome(true),
            Err(OptimizerError::NoPendingTrial)
        );
        assert_eq!(optimizer.current_index(), 0);
        assert_eq!(optimizer.master_list()[0].trials(), 0);

        optimizer.checkout();
        optimizer.report_outcome(true).expect("first report");
        assert_eq!(
            optimizer.report_outcome(true),
            Err(OptimizerError::NoPendingTrial)
        );
        assert_eq!(optimizer.current_index(), 1);
        assert_eq!(optimizer.master_list()[0].trials(), 1);
        assert_eq!(optimizer.master_list()[1].trials(), 0);
    }

    #[test]
    fn test_dedup_keeps_counters() {
        let mut optimizer = GeneticOptimizer::new(config()).expect("optimizer");
        try_once(&mut optimizer, false);

        let length = optimizer.master_list().len();
        let duplicate = ParameterSet::from_values(7, 2, 125_000, 1).expect("duplicate");
        let (index, is_new) = optimizer.add_to_master_list(duplicate);

        assert_eq!(index, 0);
        assert!(!is_new);
        assert_eq!(optimizer.master_list().len(), length);
        assert_eq!(optimizer.master_list()[0].failure_count(), 1);

        let fresh = ParameterSet::from_values(12, 14, 125_000, 4).expect("fresh");
        let (index, is_new) = optimizer.add_to_master_list(fresh);
        assert_eq!(index, length);
        assert!(is_new);
    }

    #[test]
    fn test_master_list_never_holds_duplicates() {
        let mut optimizer = GeneticOptimizer::new(
            config().with_max_generations(20).with_mutation_rate(0.5),
        )
        .expect("optimizer");

        let mut step = 0u32;
        while optimizer.is_optimizing() {
            try_once(&mut optimizer, step % 3 != 0);
            step += 1;
        }

        let master_list = optimizer.master_list();
        for (i, a) in master_list.iter().enumerate() {
            for b in master_list.iter().skip(i + 1) {
                assert!(!a.is_equal(b));
            }
        }
    }

    #[test]
    fn test_generation_turnover_keeps_elites() {
        let mut optimizer = GeneticOptimizer::new(config()).expect("optimizer");

        for step in 0..optimizer.population_size() {
            try_once(&mut optimizer, step % 3 == 0);
        }

        assert_eq!(optimizer.current_index(), 0);
        assert_eq!(optimizer.current_generation(), 1);
        assert!(optimizer.is_optimizing());

        // Only successful seeds (0, 3, 6) have a finite fitness
        let population = optimizer.current_population();
        assert_eq!(population.len(), 8);
        for elite in &population[..2] {
            assert!([0, 3, 6].contains(elite));
            assert_eq!(optimizer.master_list()[*elite].success_count(), 1);
            assert_eq!(optimizer.master_list()[*elite].failure_count(), 0);
        }
    }

    #[test]
    fn test_elites_are_distinct_individuals() {
        // Every child is a clone of a parent, so generations fill with repeats
        let mut optimizer = GeneticOptimizer::new(
            config()
                .with_max_generations(6)
                .with_crossover_rate(1.0)
                .with_mutation_rate(0.0),
        )
        .expect("optimizer");

        let mut saw_repeats = false;
        let mut step = 0u32;

        while optimizer.is_optimizing() {
            let previous = optimizer.current_population().to_vec();
            let generation = optimizer.current_generation();

            for _ in 0..previous.len() {
                try_once(&mut optimizer, step % 3 != 0);
                step += 1;
            }

            if !optimizer.is_optimizing() {
                break;
            }
            assert_eq!(optimizer.current_generation(), generation + 1);

            let master_list = optimizer.master_list();
            let mut ranking = previous.clone();
            ranking.sort_by(|&a, &b| compare_fitness(&master_list[a], &master_list[b]));

            let mut expected: Vec<usize> = Vec::new();
            for index in ranking {
                if !expected.contains(&index) {
                    expected.push(index);
                }
            }
            expected.truncate(2);

            let population = optimizer.current_population();
            assert_eq!(&population[..expected.len()], expected.as_slice());
            for &elite in &expected {
                assert!(master_list[elite].trials() > 0);
            }

            let mut distinct = population.to_vec();
            distinct.sort_unstable();
            distinct.dedup();
            saw_repeats |= distinct.len() < population.len();
        }

        assert!(saw_repeats);
        assert_eq!(optimizer.master_list().len(), 8);
    }

    #[test]
    fn test_distinct_ranking_collapses_repeats() {
        let mut optimizer = GeneticOptimizer::new(config()).expect("optimizer");
        optimizer.current_population = vec![3, 1, 3, 0, 1, 2, 3, 4];
        optimizer.master_list[1].record_outcome(true);
        optimizer.master_list[3].record_outcome(false);

        let distinct = optimizer.distinct_ranking();
        assert_eq!(distinct.len(), 5);
        assert_eq!(distinct.last(), Some(&3));

        let wheel = RouletteWheel::from_ranking(&distinct);
        assert_eq!(wheel.weight(distinct[0]), 5);
        assert_eq!(wheel.weight(3), 1);
    }

    #[test]
    fn test_convergence_freezes_most_fit() {
        let mut optimizer = GeneticOptimizer::new(config()).expect("optimizer");

        let mut step = 0u32;
        while optimizer.is_optimizing() {
            try_once(&mut optimizer, step % 2 == 0);
            step += 1;
        }

        assert_eq!(step, 3 * 8);
        assert_eq!(optimizer.state(), OptimizerState::Converged);
        assert_eq!(optimizer.current_generation(), 3);

        let frozen = optimizer.most_fit().cloned().expect("most fit");
        let trials = frozen.trials();

        for _ in 0..10 {
            let current = optimizer.checkout();
            assert!(current.is_equal(&frozen));
            optimizer.report_outcome(false).expect("ignored outcome");
            assert!(!optimizer.has_pending_trial());
        }

        assert!(!optimizer.is_optimizing());
        assert_eq!(optimizer.most_fit().expect("most fit").trials(), trials);
        assert!(optimizer.current_parameter_set().is_equal(&frozen));
    }

    #[test]
    fn test_reports() {
        let mut optimizer = GeneticOptimizer::new(config()).expect("optimizer");
        try_once(&mut optimizer, true);
        try_once(&mut optimizer, false);

        let report = optimizer.report();
        assert_eq!(report.generation, 0);
        assert_eq!(report.entries.len(), 8);
        assert!(report.most_fit.is_none());
        assert_eq!(report.entries[0].success_count, 1);
        assert_eq!(report.entries[1].failure_count, 1);
        assert_eq!(report.entries[1].packet_error_rate, 1.0);

        let text = report.to_string();
        assert!(text.contains("generation 0"));
        assert_eq!(text.lines().count(), 1 + 8);

        assert_eq!(optimizer.master_report().entries.len(), optimizer.master_list().len());
    }
}
