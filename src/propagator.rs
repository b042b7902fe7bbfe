use ndarray::Array3;

use crate::direction::{opposite, DX, DY};
use crate::wave::Wave;


/// For each pattern and direction, the patterns that may sit in the
/// neighboring cell. Required to be symmetric: `q` appears in `C[p][d]`
/// exactly when `p` appears in `C[q][opposite(d)]`.
pub type Compatibility = Vec<[Vec<usize>; 4]>;


/// Arc-consistency engine. `compatible[[y, x, p]][d]` counts the patterns
/// still possible in the neighbor of `(y, x)` opposite `d` that support
/// `p`; a pattern whose counter reaches zero is removed and its removal
/// queued, until the queue drains or the wave contradicts.
pub struct Propagator {
    height: usize,
    width: usize,
    periodic: bool,

    state: Compatibility,
    compatible: Array3<[i32; 4]>,
    queue: Vec<(usize, usize, usize)>,
}


impl Propagator {
    pub fn new(height: usize, width: usize, periodic: bool, state: Compatibility) -> Propagator {
        let patterns = state.len();

        let mut base = vec![[0i32; 4]; patterns];
        for (pattern, counts) in base.iter_mut().enumerate() {
            for direction in 0..4 {
                counts[direction] = state[pattern][opposite(direction)].len() as i32;
            }
        }

        let compatible = Array3::from_shape_fn((height, width, patterns), |(_, _, p)| base[p]);

        let mut propagator = Propagator {
            height,
            width,
            periodic,
            state,
            compatible,
            queue: Vec::new(),
        };

        // counters whose supporting neighbor falls outside a bounded wave
        // are pinned to zero and never consulted
        if !periodic {
            for y in 0..height {
                for x in 0..width {
                    for direction in 0..4 {
                        if propagator.neighbor(y, x, opposite(direction)).is_none() {
                            for pattern in 0..patterns {
                                propagator.compatible[[y, x, pattern]][direction] = 0;
                            }
                        }
                    }
                }
            }
        }

        propagator
    }


    /// Records that `pattern` has been removed from `(y, x)`; the caller
    /// has already applied `wave.remove`.
    pub fn add(&mut self, y: usize, x: usize, pattern: usize) {
        self.queue.push((y, x, pattern));
    }


    /// Removes every pattern that has an empty support list toward an
    /// existing neighbor, queueing the removals. Patterns at the edge of a
    /// bounded wave keep directions that point outside.
    pub fn ban_unsupported(&mut self, wave: &mut Wave) {
        for pattern in 0..self.state.len() {
            for direction in 0..4 {
                if !self.state[pattern][direction].is_empty() {
                    continue;
                }
                for y in 0..self.height {
                    for x in 0..self.width {
                        if self.neighbor(y, x, direction).is_some() && wave.possible(y, x, pattern) {
                            wave.remove(y, x, pattern);
                            self.queue.push((y, x, pattern));
                        }
                    }
                }
            }
        }
    }


    /// Drains the removal queue to fixpoint, or stops early once the wave
    /// reports a contradiction.
    pub fn propagate(&mut self, wave: &mut Wave) {
        while let Some((y1, x1, pattern)) = self.queue.pop() {
            for direction in 0..4 {
                let (y2, x2) = match self.neighbor(y1, x1, direction) {
                    Some(cell) => cell,
                    None => continue,
                };

                let supported = &self.state[pattern][direction];
                for &other in supported {
                    let counts = &mut self.compatible[[y2, x2, other]];
                    counts[direction] -= 1;
                    if counts[direction] == 0 && wave.possible(y2, x2, other) {
                        wave.remove(y2, x2, other);
                        self.queue.push((y2, x2, other));
                    }
                }
            }

            if wave.is_contradicted() {
                self.queue.clear();
                return;
            }
        }
    }


    fn neighbor(&self, y: usize, x: usize, direction: usize) -> Option<(usize, usize)> {
        let y2 = y as isize + DY[direction];
        let x2 = x as isize + DX[direction];

        if self.periodic {
            Some((y2.rem_euclid(self.height as isize) as usize,
                  x2.rem_euclid(self.width as isize) as usize))
        } else if y2 < 0 || y2 >= self.height as isize || x2 < 0 || x2 >= self.width as isize {
            None
        } else {
            Some((y2 as usize, x2 as usize))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    // two patterns that only tolerate each other in every direction
    fn checkerboard() -> Compatibility {
        vec![[vec![1], vec![1], vec![1], vec![1]],
             [vec![0], vec![0], vec![0], vec![0]]]
    }

    fn fresh(height: usize, width: usize, periodic: bool) -> (Wave, Propagator) {
        let wave = Wave::new(height, width, &[0.5, 0.5]);
        let propagator = Propagator::new(height, width, periodic, checkerboard());
        (wave, propagator)
    }

    #[test]
    fn removal_forces_checkerboard() {
        let (mut wave, mut propagator) = fresh(3, 3, false);

        wave.remove(1, 1, 0);
        propagator.add(1, 1, 0);
        propagator.propagate(&mut wave);

        assert!(!wave.is_contradicted());
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(wave.count(y, x), 1);
                let expected = if (y + x) % 2 == 0 { 1 } else { 0 };
                assert!(wave.possible(y, x, expected));
            }
        }
    }

    #[test]
    fn counters_match_brute_force() {
        let (mut wave, mut propagator) = fresh(3, 3, false);

        wave.remove(0, 0, 0);
        propagator.add(0, 0, 0);
        propagator.propagate(&mut wave);

        for y in 0..3 {
            for x in 0..3 {
                for pattern in wave.patterns(y, x).collect::<Vec<_>>() {
                    for direction in 0..4 {
                        let counted = propagator.compatible[[y, x, pattern]][direction];
                        let expected = match propagator.neighbor(y, x, opposite(direction)) {
                            Some((ny, nx)) => wave.patterns(ny, nx)
                                .filter(|&p| propagator.state[p][direction].contains(&pattern))
                                .count() as i32,
                            None => 0,
                        };
                        assert_eq!(counted, expected, "at ({}, {}) pattern {} direction {}",
                                   y, x, pattern, direction);
                    }
                }
            }
        }
    }

    #[test]
    fn fixpoint_ignores_event_order() {
        let (mut first_wave, mut first) = fresh(3, 3, false);
        first_wave.remove(0, 0, 0);
        first_wave.remove(2, 2, 0);
        first.add(0, 0, 0);
        first.add(2, 2, 0);
        first.propagate(&mut first_wave);

        let (mut second_wave, mut second) = fresh(3, 3, false);
        second_wave.remove(2, 2, 0);
        second_wave.remove(0, 0, 0);
        second.add(2, 2, 0);
        second.add(0, 0, 0);
        second.propagate(&mut second_wave);

        assert!(!first_wave.is_contradicted());
        assert!(!second_wave.is_contradicted());
        for y in 0..3 {
            for x in 0..3 {
                for pattern in 0..2 {
                    assert_eq!(first_wave.possible(y, x, pattern),
                               second_wave.possible(y, x, pattern));
                }
            }
        }
    }

    #[test]
    fn conflicting_removals_contradict() {
        let (mut wave, mut propagator) = fresh(3, 3, false);

        // (0, 0) and (0, 1) are neighbors, so banning pattern 0 in both
        // leaves nothing for one of them
        wave.remove(0, 0, 0);
        propagator.add(0, 0, 0);
        wave.remove(0, 1, 0);
        propagator.add(0, 1, 0);
        propagator.propagate(&mut wave);

        assert!(wave.is_contradicted());
    }

    #[test]
    fn unsupported_patterns_are_banned_up_front() {
        // pattern 1 has no support anywhere
        let state: Compatibility = vec![[vec![0], vec![0], vec![0], vec![0]],
                                        [vec![], vec![], vec![], vec![]]];
        let mut wave = Wave::new(2, 2, &[0.5, 0.5]);
        let mut propagator = Propagator::new(2, 2, false, state);

        propagator.ban_unsupported(&mut wave);
        propagator.propagate(&mut wave);

        assert!(!wave.is_contradicted());
        for y in 0..2 {
            for x in 0..2 {
                assert!(!wave.possible(y, x, 1));
                assert!(wave.possible(y, x, 0));
            }
        }
    }
}
