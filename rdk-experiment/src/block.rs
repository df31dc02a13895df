//! Counterbalanced block construction.

use rand::Rng;
use rand::seq::SliceRandom;
use rdk_core::{Direction, TrialDef};

use crate::errors::{ExperimentError, Result};

/// Builds the full coherence × direction × repetition cross and returns it
/// in a uniformly random order.
///
/// Every condition appears exactly `repeat` times.
pub fn generate_block<R>(
    coherences: &[f64],
    directions: &[Direction],
    repeat: usize,
    rng: &mut R,
) -> Result<Vec<TrialDef>>
where
    R: Rng + ?Sized,
{
    check_conditions(coherences, directions, repeat)?;

    let mut block = Vec::with_capacity(coherences.len() * directions.len() * repeat);
    for &coherence in coherences {
        for &direction in directions {
            for _ in 0..repeat {
                block.push(TrialDef::new(coherence, direction));
            }
        }
    }

    block.shuffle(rng);
    log::debug!("Generated block of {} trials", block.len());
    Ok(block)
}

pub(crate) fn check_conditions(
    coherences: &[f64],
    directions: &[Direction],
    repeat: usize,
) -> Result<()> {
    if coherences.is_empty() {
        return Err(ExperimentError::EmptyConditions("coherence"));
    }
    if let Some(&bad) = coherences
        .iter()
        .find(|c| !(c.is_finite() && **c > 0.0 && **c <= 1.0))
    {
        return Err(ExperimentError::InvalidCoherence(bad));
    }
    if directions.is_empty() {
        return Err(ExperimentError::EmptyConditions("direction"));
    }
    if repeat == 0 {
        return Err(ExperimentError::EmptyConditions("trial per condition"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn count(block: &[TrialDef], coherence: f64, direction: Direction) -> usize {
        block
            .iter()
            .filter(|t| t.coherence == coherence && t.direction == direction)
            .count()
    }

    #[test]
    fn every_condition_appears_exactly_repeat_times() {
        let mut rng = SmallRng::seed_from_u64(1);
        let block = generate_block(&[0.1, 0.5], &Direction::ALL, 2, &mut rng).unwrap();

        assert_eq!(block.len(), 8);
        for c in [0.1, 0.5] {
            for d in Direction::ALL {
                assert_eq!(count(&block, c, d), 2);
            }
        }
    }

    #[test]
    fn same_seed_same_order() {
        let coherences = [0.05, 0.1, 0.2, 0.4, 0.5, 1.0];
        let a = generate_block(&coherences, &Direction::ALL, 3, &mut SmallRng::seed_from_u64(9));
        let b = generate_block(&coherences, &Direction::ALL, 3, &mut SmallRng::seed_from_u64(9));
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[test]
    fn order_is_actually_permuted() {
        // 36 trials: the chance that 20 independent shuffles all
        // reproduce the generation order is negligible.
        let coherences = [0.05, 0.1, 0.2, 0.4, 0.5, 1.0];
        let mut rng = SmallRng::seed_from_u64(3);
        let unshuffled: Vec<TrialDef> = coherences
            .iter()
            .flat_map(|&c| {
                Direction::ALL
                    .into_iter()
                    .flat_map(move |d| std::iter::repeat_n(TrialDef::new(c, d), 3))
            })
            .collect();
        let permuted = (0..20).any(|_| {
            generate_block(&coherences, &Direction::ALL, 3, &mut rng).unwrap() != unshuffled
        });
        assert!(permuted);
    }

    #[test]
    fn first_position_is_not_biased() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut lefts = 0;
        let runs = 2000;
        for _ in 0..runs {
            let block = generate_block(&[0.5], &Direction::ALL, 1, &mut rng).unwrap();
            if block[0].direction == Direction::Left {
                lefts += 1;
            }
        }
        assert!((800..1200).contains(&lefts), "lefts = {lefts}");
    }

    #[test]
    fn rejects_empty_and_invalid_inputs() {
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(matches!(
            generate_block(&[], &Direction::ALL, 1, &mut rng),
            Err(ExperimentError::EmptyConditions("coherence"))
        ));
        assert!(matches!(
            generate_block(&[0.5], &[], 1, &mut rng),
            Err(ExperimentError::EmptyConditions("direction"))
        ));
        assert!(matches!(
            generate_block(&[0.5], &Direction::ALL, 0, &mut rng),
            Err(ExperimentError::EmptyConditions(_))
        ));
        assert!(matches!(
            generate_block(&[1.2], &Direction::ALL, 1, &mut rng),
            Err(ExperimentError::InvalidCoherence(_))
        ));
    }
}
