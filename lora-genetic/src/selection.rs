use rand::Rng;

/// Attempts at drawing a second parent distinct from the first before a
/// duplicate pair is accepted.
pub const PARENT_RETRY_LIMIT: usize = 10_000;

/// Rank proportional roulette wheel over master list indices.
///
/// For a ranking of `n` individuals (fittest first) the individual at rank `i`
/// occupies `n - i` slots of the wheel.
pub struct RouletteWheel {
    slots: Vec<usize>,
}

impl RouletteWheel {
    pub fn from_ranking(ranking: &[usize]) -> Self {
        let count = ranking.len();
        let mut slots = Vec::with_capacity(count * (count + 1) / 2);

        for (rank, &index) in ranking.iter().enumerate() {
            slots.extend(std::iter::repeat(index).take(count - rank));
        }

        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots held by `index`
    pub fn weight(&self, index: usize) -> usize {
        self.slots.iter().filter(|&&slot| slot == index).count()
    }

    /// Draws one master list index. The wheel must not be empty.
    pub fn spin<R: Rng>(&self, rng: &mut R) -> usize {
        self.slots[rng.gen_range(0..self.slots.len())]
    }

    /// Draws two parents, preferring distinct ones.
    pub fn draw_parents<R: Rng>(&self, rng: &mut R) -> (usize, usize) {
        let parent_a = self.spin(rng);
        let mut parent_b = self.spin(rng);

        let mut attempts = 0;
        while parent_b == parent_a && attempts < PARENT_RETRY_LIMIT {
            parent_b = self.spin(rng);
            attempts += 1;
        }

        if parent_a == parent_b {
            log::trace!("GA: no distinct parent found, breeding {} with itself", parent_a);
        }

        (parent_a, parent_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_rank_weights() {
        let wheel = RouletteWheel::from_ranking(&[5, 2, 9, 0]);

        assert_eq!(wheel.len(), 4 + 3 + 2 + 1);
        assert_eq!(wheel.weight(5), 4);
        assert_eq!(wheel.weight(2), 3);
        assert_eq!(wheel.weight(9), 2);
        assert_eq!(wheel.weight(0), 1);
        assert_eq!(wheel.weight(7), 0);
    }

    #[test]
    fn test_fitter_drawn_more_often() {
        let wheel = RouletteWheel::from_ranking(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let mut rng = StdRng::seed_from_u64(21);

        let mut counts = [0usize; 8];
        for _ in 0..36_000 {
            counts[wheel.spin(&mut rng)] += 1;
        }

        assert!(counts[0] > counts[7] * 4);
        assert!(counts.iter().all(|&count| count > 0));
    }

    #[test]
    fn test_distinct_parents() {
        let wheel = RouletteWheel::from_ranking(&[3, 8]);
        let mut rng = StdRng::seed_from_u64(2);

        for _ in 0..100 {
            let (a, b) = wheel.draw_parents(&mut rng);
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_degenerate_wheel_terminates() {
        // Every slot holds the same individual
        let wheel = RouletteWheel::from_ranking(&[4, 4, 4]);
        let mut rng = StdRng::seed_from_u64(2);

        assert_eq!(wheel.draw_parents(&mut rng), (4, 4));
    }
}
