use bit_set::BitSet;
use bit_vec::BitVec;

use ndarray::Array2;

use rand::Rng;


/// The grid of per-cell possibility sets, with the running sums that make
/// entropy lookups cheap: for each cell we cache the weight sum, the
/// `w * ln(w)` sum, the log of the weight sum and the possibility count,
/// and refresh them on every removal instead of rescanning the alphabet.
pub struct Wave {
    weights: Vec<f64>,
    w_log_w: Vec<f64>,
    noise_bound: f64,

    possible: Array2<BitSet>,
    count: Array2<usize>,
    sum_w: Array2<f64>,
    sum_w_log_w: Array2<f64>,
    log_sum_w: Array2<f64>,
    entropy: Array2<f64>,

    contradicted: bool,
}


impl Wave {
    /// A fully permissive wave. `weights` are the normalized pattern
    /// frequencies.
    pub fn new(height: usize, width: usize, weights: &[f64]) -> Wave {
        let w_log_w: Vec<f64> = weights.iter().map(|&w| w * w.ln()).collect();
        let noise_bound = w_log_w.iter().map(|w| w.abs()).fold(f64::INFINITY, f64::min) / 2.0;

        let sum_w: f64 = weights.iter().sum();
        let sum_w_log_w: f64 = w_log_w.iter().sum();
        let entropy = sum_w.ln() - sum_w_log_w / sum_w;

        let all = BitSet::from_bit_vec(BitVec::from_elem(weights.len(), true));

        Wave {
            weights: weights.to_vec(),
            w_log_w,
            noise_bound,

            possible: Array2::from_elem((height, width), all),
            count: Array2::from_elem((height, width), weights.len()),
            sum_w: Array2::from_elem((height, width), sum_w),
            sum_w_log_w: Array2::from_elem((height, width), sum_w_log_w),
            log_sum_w: Array2::from_elem((height, width), sum_w.ln()),
            entropy: Array2::from_elem((height, width), entropy),

            contradicted: false,
        }
    }


    pub fn dims(&self) -> (usize, usize) {
        self.count.dim()
    }


    pub fn possible(&self, y: usize, x: usize, pattern: usize) -> bool {
        self.possible[[y, x]].contains(pattern)
    }


    /// The patterns still admissible at `(y, x)`, in index order.
    pub fn patterns(&self, y: usize, x: usize) -> impl Iterator<Item = usize> + '_ {
        self.possible[[y, x]].iter()
    }


    pub fn count(&self, y: usize, x: usize) -> usize {
        self.count[[y, x]]
    }


    pub fn is_contradicted(&self) -> bool {
        self.contradicted
    }


    /// Removes `pattern` from `(y, x)` and refreshes the cell's caches.
    /// The pattern must still be possible there.
    pub fn remove(&mut self, y: usize, x: usize, pattern: usize) {
        debug_assert!(self.possible[[y, x]].contains(pattern));
        self.possible[[y, x]].remove(pattern);

        self.sum_w[[y, x]] -= self.weights[pattern];
        self.sum_w_log_w[[y, x]] -= self.w_log_w[pattern];
        self.log_sum_w[[y, x]] = self.sum_w[[y, x]].ln();
        self.entropy[[y, x]] = self.log_sum_w[[y, x]] - self.sum_w_log_w[[y, x]] / self.sum_w[[y, x]];

        self.count[[y, x]] -= 1;
        if self.count[[y, x]] == 0 {
            debug!("cell ({}, {}) has no patterns left", y, x);
            self.contradicted = true;
        }
    }


    /// The unobserved cell with the lowest entropy, or `None` once every
    /// cell is down to a single pattern. A jitter drawn from `rng` breaks
    /// ties so that equal-entropy cells are not visited in scan order.
    pub fn min_entropy_cell<R: Rng>(&self, rng: &mut R) -> Option<(usize, usize)> {
        let (height, width) = self.count.dim();

        let mut min = f64::INFINITY;
        let mut argmin = None;

        for y in 0..height {
            for x in 0..width {
                if self.count[[y, x]] <= 1 {
                    continue;
                }

                let entropy = self.entropy[[y, x]];
                if entropy <= min {
                    let noise = if self.noise_bound > 0.0 {
                        rng.gen_range(0.0..self.noise_bound)
                    } else {
                        0.0
                    };
                    if entropy + noise < min {
                        min = entropy + noise;
                        argmin = Some((y, x));
                    }
                }
            }
        }

        argmin
    }


    #[cfg(test)]
    pub(crate) fn entropy(&self, y: usize, x: usize) -> f64 {
        self.entropy[[y, x]]
    }


    #[cfg(test)]
    pub(crate) fn sums(&self, y: usize, x: usize) -> (f64, f64) {
        (self.sum_w[[y, x]], self.sum_w_log_w[[y, x]])
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn normalized(weights: &[f64]) -> Vec<f64> {
        let total: f64 = weights.iter().sum();
        weights.iter().map(|w| w / total).collect()
    }

    #[test]
    fn fresh_wave_counters() {
        let wave = Wave::new(2, 3, &normalized(&[1.0, 1.0, 2.0]));

        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(wave.count(y, x), 3);
                let (sum_w, _) = wave.sums(y, x);
                assert!((sum_w - 1.0).abs() < 1e-12);
            }
        }
        assert!(!wave.is_contradicted());
    }

    #[test]
    fn removal_updates_sums_and_entropy() {
        let mut wave = Wave::new(1, 1, &normalized(&[1.0, 1.0, 2.0]));

        wave.remove(0, 0, 2);
        assert_eq!(wave.count(0, 0), 2);
        let (sum_w, sum_w_log_w) = wave.sums(0, 0);
        assert!((sum_w - 0.5).abs() < 1e-12);
        assert!((sum_w_log_w - 2.0 * 0.25 * 0.25f64.ln()).abs() < 1e-12);
        // two equally likely patterns left
        assert!((wave.entropy(0, 0) - 2.0f64.ln()).abs() < 1e-12);

        wave.remove(0, 0, 0);
        assert_eq!(wave.count(0, 0), 1);
        assert!(wave.entropy(0, 0).abs() < 1e-12);
        assert!(!wave.is_contradicted());

        wave.remove(0, 0, 1);
        assert!(wave.is_contradicted());
    }

    #[test]
    fn min_entropy_prefers_narrowed_cell() {
        let mut wave = Wave::new(1, 2, &normalized(&[1.0, 1.0, 2.0]));
        let mut rng = StdRng::seed_from_u64(0);

        wave.remove(0, 1, 2);

        // noise stays below the entropy gap, so the narrowed cell wins
        // every scan
        for _ in 0..32 {
            assert_eq!(wave.min_entropy_cell(&mut rng), Some((0, 1)));
        }
    }

    #[test]
    fn observed_wave_yields_no_cell() {
        let mut wave = Wave::new(1, 2, &normalized(&[1.0, 1.0]));
        let mut rng = StdRng::seed_from_u64(0);

        wave.remove(0, 0, 0);
        wave.remove(0, 1, 1);
        assert_eq!(wave.min_entropy_cell(&mut rng), None);
    }
}
