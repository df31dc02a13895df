use rand::Rng;
use rand::seq::SliceRandom;

/// Number of coherently moving dots for `n` dots at coherence `c`.
///
/// Halves round to the even neighbour, and the result is clamped to `n`.
pub fn signal_count(n: usize, coherence: f64) -> usize {
    let raw = (n as f64 * coherence).round_ties_even();
    if raw.is_nan() || raw <= 0.0 {
        0
    } else {
        (raw as usize).min(n)
    }
}

/// Disjoint split of dot indices `0..n` into signal and noise groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub signal: Vec<usize>,
    pub noise: Vec<usize>,
}

impl Partition {
    /// Shuffles all indices, then takes the first `signal_count(n, c)` as
    /// signal and the rest as noise.
    pub fn new<R>(n: usize, coherence: f64, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        let noise = indices.split_off(signal_count(n, coherence));
        Self {
            signal: indices,
            noise,
        }
    }

    pub fn len(&self) -> usize {
        self.signal.len() + self.noise.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
