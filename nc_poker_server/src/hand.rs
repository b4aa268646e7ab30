// Hand generation.
//
// A hand is the fixed set of distinct numbers a player may play over the
// whole game, drawn uniformly without replacement from an inclusive range.
// Draws are independent per player. The RNG is a parameter so tests can seed
// it; the server uses an entropy-seeded `StdRng`.

use rand::Rng;
use rand::seq::index;

use crate::error::ConfigError;

/// An immutable set of distinct numbers, kept sorted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hand {
    numbers: Vec<u32>,
}

impl Hand {
    /// Draw `count` distinct numbers from `lower..=upper`.
    ///
    /// Fails if the range holds fewer than `count` numbers.
    pub fn generate<R: Rng + ?Sized>(
        rng: &mut R,
        count: usize,
        lower: u32,
        upper: u32,
    ) -> Result<Self, ConfigError> {
        if upper < lower || u64::from(upper - lower) + 1 < count as u64 {
            return Err(ConfigError::RangeTooSmall {
                count,
                lower,
                upper,
            });
        }
        let span = (upper - lower) as usize + 1;

        let mut numbers: Vec<u32> = index::sample(rng, span, count)
            .into_iter()
            // Offsets are below `span`, which came from a u32 difference.
            .map(|offset| lower + offset as u32)
            .collect();
        numbers.sort_unstable();
        Ok(Self { numbers })
    }

    /// Build a hand from explicit numbers. Duplicates are collapsed.
    pub fn from_numbers(numbers: impl IntoIterator<Item = u32>) -> Self {
        let mut numbers: Vec<u32> = numbers.into_iter().collect();
        numbers.sort_unstable();
        numbers.dedup();
        Self { numbers }
    }

    pub fn contains(&self, n: u32) -> bool {
        self.numbers.binary_search(&n).is_ok()
    }

    pub fn numbers(&self) -> &[u32] {
        &self.numbers
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn default_range_yields_three_distinct_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let hand = Hand::generate(&mut rng, 3, 1, 15).unwrap();
            assert_eq!(hand.len(), 3);
            let n = hand.numbers();
            assert!(n[0] < n[1] && n[1] < n[2], "not distinct/sorted: {n:?}");
            assert!(n.iter().all(|x| (1..=15).contains(x)));
        }
    }

    #[test]
    fn exact_range_yields_every_number() {
        let mut rng = StdRng::seed_from_u64(1);
        let hand = Hand::generate(&mut rng, 3, 40, 42).unwrap();
        assert_eq!(hand.numbers(), &[40, 41, 42]);
    }

    #[test]
    fn range_too_small_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = Hand::generate(&mut rng, 3, 1, 2).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RangeTooSmall {
                count: 3,
                lower: 1,
                upper: 2
            }
        ));
    }

    #[test]
    fn inverted_range_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(Hand::generate(&mut rng, 1, 9, 3).is_err());
    }

    #[test]
    fn every_number_in_range_eventually_drawn() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut seen = [false; 16];
        for _ in 0..500 {
            for &n in Hand::generate(&mut rng, 3, 1, 15).unwrap().numbers() {
                seen[n as usize] = true;
            }
        }
        assert!(seen[1..].iter().all(|s| *s));
    }

    #[test]
    fn from_numbers_sorts_and_dedups() {
        let hand = Hand::from_numbers([12, 3, 7, 3]);
        assert_eq!(hand.numbers(), &[3, 7, 12]);
        assert!(hand.contains(7));
        assert!(!hand.contains(8));
    }
}
