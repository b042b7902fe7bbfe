use ndarray::Array2;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::propagator::{Compatibility, Propagator};
use crate::wave::Wave;


#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ObserveStatus {
    Success,
    Failure,
    Running,
}


/// The model-agnostic solver: entropy-guided observation over a wave,
/// propagating each collapse through the compatibility relation. Pattern
/// weights are normalized once at construction; the reducers translate
/// the collapsed pattern grid back into their own output.
pub struct Wfc {
    rng: StdRng,
    frequencies: Vec<f64>,
    wave: Wave,
    propagator: Propagator,
}


impl Wfc {
    pub fn new(height: usize,
               width: usize,
               periodic: bool,
               weights: &[f64],
               compatibility: Compatibility,
               seed: u64)
               -> Wfc {
        let total: f64 = weights.iter().sum();
        let frequencies: Vec<f64> = weights.iter().map(|w| w / total).collect();

        let mut wave = Wave::new(height, width, &frequencies);
        let mut propagator = Propagator::new(height, width, periodic, compatibility);
        propagator.ban_unsupported(&mut wave);
        propagator.propagate(&mut wave);

        Wfc {
            rng: StdRng::seed_from_u64(seed),
            frequencies,
            wave,
            propagator,
        }
    }


    pub fn wave(&self) -> &Wave {
        &self.wave
    }


    /// Removes `pattern` from `(y, x)` and queues the removal. Used by the
    /// reducers for their initial constraints; follow with [`propagate`].
    ///
    /// [`propagate`]: Wfc::propagate
    pub fn ban(&mut self, y: usize, x: usize, pattern: usize) {
        self.wave.remove(y, x, pattern);
        self.propagator.add(y, x, pattern);
    }


    pub fn propagate(&mut self) {
        self.propagator.propagate(&mut self.wave);
    }


    /// One observation step: collapse the minimum-entropy cell to a single
    /// pattern by weighted choice. Draws from the RNG in a fixed order —
    /// the jitter draws of the entropy scan first, then one draw for the
    /// weighted choice — so a seed fully determines the outcome.
    pub fn observe(&mut self) -> ObserveStatus {
        if self.wave.is_contradicted() {
            return ObserveStatus::Failure;
        }

        let (y, x) = match self.wave.min_entropy_cell(&mut self.rng) {
            Some(cell) => cell,
            None => return ObserveStatus::Success,
        };

        let remaining: Vec<usize> = self.wave.patterns(y, x).collect();
        let choice = match WeightedIndex::new(remaining.iter().map(|&p| self.frequencies[p])) {
            Ok(distribution) => remaining[distribution.sample(&mut self.rng)],
            Err(_) => return ObserveStatus::Failure,
        };

        for pattern in remaining {
            if pattern != choice {
                self.wave.remove(y, x, pattern);
                self.propagator.add(y, x, pattern);
            }
        }

        ObserveStatus::Running
    }


    /// Runs the observation loop to completion. `Some` holds the collapsed
    /// pattern index per cell; `None` reports a contradiction, which the
    /// caller may answer by retrying with a fresh seed.
    pub fn run(&mut self) -> Option<Array2<usize>> {
        loop {
            match self.observe() {
                ObserveStatus::Failure => {
                    debug!("wave contradicted, giving up");
                    return None;
                }
                ObserveStatus::Success => return Some(self.collapsed()),
                ObserveStatus::Running => self.propagator.propagate(&mut self.wave),
            }
        }
    }


    fn collapsed(&self) -> Array2<usize> {
        Array2::from_shape_fn(self.wave.dims(),
                              |(y, x)| self.wave.patterns(y, x).next().unwrap())
    }


    #[cfg(test)]
    pub(crate) fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard() -> Compatibility {
        vec![[vec![1], vec![1], vec![1], vec![1]],
             [vec![0], vec![0], vec![0], vec![0]]]
    }

    #[test]
    fn collapses_to_alternating_cells() {
        let mut wfc = Wfc::new(4, 4, true, &[1.0, 1.0], checkerboard(), 7);
        let cells = wfc.run().expect("solvable");

        for y in 0..4 {
            for x in 0..4 {
                assert_ne!(cells[[y, x]], cells[[y, (x + 1) % 4]]);
                assert_ne!(cells[[y, x]], cells[[(y + 1) % 4, x]]);
            }
        }
    }

    #[test]
    fn same_seed_same_output() {
        let first = Wfc::new(4, 4, true, &[1.0, 3.0], checkerboard(), 11).run();
        let second = Wfc::new(4, 4, true, &[1.0, 3.0], checkerboard(), 11).run();
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn globally_unsupported_pattern_never_appears() {
        let state: Compatibility = vec![[vec![0], vec![0], vec![0], vec![0]],
                                        [vec![], vec![], vec![], vec![]]];
        let mut wfc = Wfc::new(2, 2, false, &[1.0, 1.0], state, 3);
        let cells = wfc.run().expect("solvable");
        assert!(cells.iter().all(|&p| p == 0));
    }

    #[test]
    fn empty_compatibility_fails() {
        let state: Compatibility = vec![[vec![], vec![], vec![], vec![]],
                                        [vec![], vec![], vec![], vec![]]];
        let mut wfc = Wfc::new(2, 1, false, &[1.0, 1.0], state, 3);
        assert_eq!(wfc.run(), None);
    }
}
