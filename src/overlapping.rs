use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use image::{GenericImageView, Pixel};

use ndarray::Array2;

use crate::direction::{DX, DY};
use crate::grid;
use crate::propagator::Compatibility;
use crate::wfc::Wfc;
use crate::Error;


#[derive(Copy, Clone, Debug)]
pub struct OverlappingOptions {
    /// Side length of the square patches, at least 2.
    pub pattern_size: usize,
    pub periodic_input: bool,
    pub periodic_output: bool,
    /// Output image height in pixels.
    pub out_height: usize,
    /// Output image width in pixels.
    pub out_width: usize,
    /// How many dihedral variants of each patch to admit, `1..=8`.
    pub symmetry: usize,
    pub ground: bool,
}


impl OverlappingOptions {
    pub fn new(pattern_size: usize) -> OverlappingOptions {
        OverlappingOptions {
            pattern_size,
            periodic_input: true,
            periodic_output: false,
            out_height: 48,
            out_width: 48,
            symmetry: 8,
            ground: false,
        }
    }


    fn wave_height(&self) -> usize {
        if self.periodic_output {
            self.out_height
        } else {
            self.out_height - self.pattern_size + 1
        }
    }


    fn wave_width(&self) -> usize {
        if self.periodic_output {
            self.out_width
        } else {
            self.out_width - self.pattern_size + 1
        }
    }
}


/// The overlapping model: every N-by-N window of the output is one of the
/// N-by-N patches of the input, weighted by how often it occurs there.
pub struct OverlappingWfc<T> {
    options: OverlappingOptions,
    patterns: Vec<Array2<T>>,
    wfc: Wfc,
}


impl<T> OverlappingWfc<T>
    where T: Copy + Eq + Hash
{
    pub fn new(input: Array2<T>,
               options: OverlappingOptions,
               seed: u64)
               -> Result<OverlappingWfc<T>, Error> {
        let n = options.pattern_size;
        if n < 2 {
            return Err(Error::PatternSize(n));
        }
        if options.symmetry < 1 || options.symmetry > 8 {
            return Err(Error::Symmetry(options.symmetry));
        }

        let (height, width) = input.dim();
        if height < n || width < n {
            return Err(Error::InputTooSmall { height, width, size: n });
        }
        if !options.periodic_output && (options.out_height < n || options.out_width < n) {
            return Err(Error::OutputTooSmall { size: n });
        }

        let (patterns, weights, index) = extract_patterns(&input, &options);
        debug!("{} distinct patterns over a {}x{} input", patterns.len(), height, width);

        let ground = if options.ground {
            Some(ground_pattern(&input, &index, n)?)
        } else {
            None
        };

        let compatibility = generate_compatibility(&patterns);
        let wfc = Wfc::new(options.wave_height(),
                           options.wave_width(),
                           options.periodic_output,
                           &weights,
                           compatibility,
                           seed);

        let mut model = OverlappingWfc {
            options,
            patterns,
            wfc,
        };

        if let Some(ground) = ground {
            debug!("pinning ground pattern {} to the bottom row", ground);
            model.init_ground(ground);
            model.wfc.propagate();
        }

        Ok(model)
    }


    /// The extracted pattern alphabet, in first-seen order.
    pub fn patterns(&self) -> &[Array2<T>] {
        &self.patterns
    }


    /// Runs the solver. `Some` holds the output pixel grid, sized
    /// `out_height`-by-`out_width`; `None` reports a contradiction.
    pub fn run(&mut self) -> Option<Array2<T>> {
        let cells = self.wfc.run()?;
        Some(self.decode(&cells))
    }


    /// Collapses the wave cell `(y, x)` to the given patch before solving.
    /// False if the patch is not in the alphabet, the cell is out of
    /// range, or the constraint contradicts the wave.
    pub fn set_pattern(&mut self, pattern: &Array2<T>, y: usize, x: usize) -> bool {
        let keep = match self.patterns.iter().position(|p| p == pattern) {
            Some(keep) => keep,
            None => return false,
        };
        if y >= self.options.wave_height() || x >= self.options.wave_width() {
            return false;
        }
        if !self.wfc.wave().possible(y, x, keep) {
            return false;
        }

        for pattern in 0..self.patterns.len() {
            if pattern != keep && self.wfc.wave().possible(y, x, pattern) {
                self.wfc.ban(y, x, pattern);
            }
        }
        self.wfc.propagate();

        !self.wfc.wave().is_contradicted()
    }


    /// Requires the output pixel `(y, x)` to hold `value`: every wave cell
    /// whose patch covers that pixel drops the patterns that disagree.
    /// False once the wave contradicts.
    pub fn set_pixel(&mut self, y: usize, x: usize, value: T) -> bool {
        let n = self.options.pattern_size;
        let wave_height = self.options.wave_height() as isize;
        let wave_width = self.options.wave_width() as isize;

        for dy in 0..n {
            for dx in 0..n {
                let mut cy = y as isize - dy as isize;
                let mut cx = x as isize - dx as isize;
                if self.options.periodic_output {
                    cy = cy.rem_euclid(wave_height);
                    cx = cx.rem_euclid(wave_width);
                } else if cy < 0 || cy >= wave_height || cx < 0 || cx >= wave_width {
                    continue;
                }
                let (cy, cx) = (cy as usize, cx as usize);

                let conflicting: Vec<usize> = self.wfc
                    .wave()
                    .patterns(cy, cx)
                    .filter(|&p| self.patterns[p][[dy, dx]] != value)
                    .collect();
                for pattern in conflicting {
                    self.wfc.ban(cy, cx, pattern);
                }
            }
        }
        self.wfc.propagate();

        !self.wfc.wave().is_contradicted()
    }


    fn init_ground(&mut self, ground: usize) {
        let bottom = self.options.wave_height() - 1;

        for x in 0..self.options.wave_width() {
            for pattern in 0..self.patterns.len() {
                if pattern != ground && self.wfc.wave().possible(bottom, x, pattern) {
                    self.wfc.ban(bottom, x, pattern);
                }
            }
        }

        for y in 0..bottom {
            for x in 0..self.options.wave_width() {
                if self.wfc.wave().possible(y, x, ground) {
                    self.wfc.ban(y, x, ground);
                }
            }
        }
    }


    // Clamping to the last wave cell makes the trailing rows and columns
    // of a bounded output read out of the full patch rather than its
    // top-left pixel.
    fn decode(&self, cells: &Array2<usize>) -> Array2<T> {
        let (wave_height, wave_width) = cells.dim();

        Array2::from_shape_fn((self.options.out_height, self.options.out_width), |(y, x)| {
            let (wy, dy) = if y < wave_height {
                (y, 0)
            } else {
                (wave_height - 1, y - (wave_height - 1))
            };
            let (wx, dx) = if x < wave_width {
                (x, 0)
            } else {
                (wave_width - 1, x - (wave_width - 1))
            };
            self.patterns[cells[[wy, wx]]][[dy, dx]]
        })
    }
}


impl<P> OverlappingWfc<P>
    where P: Pixel + Eq + Hash + 'static
{
    pub fn from_image<I>(img: &I,
                         options: OverlappingOptions,
                         seed: u64)
                         -> Result<OverlappingWfc<P>, Error>
        where I: GenericImageView<Pixel = P>
    {
        OverlappingWfc::new(grid::from_image(img), options, seed)
    }
}


type PatternIndex<T> = HashMap<Vec<T>, usize>;


fn extract_patterns<T>(input: &Array2<T>,
                       options: &OverlappingOptions)
                       -> (Vec<Array2<T>>, Vec<f64>, PatternIndex<T>)
    where T: Copy + Eq + Hash
{
    let n = options.pattern_size;
    let (height, width) = input.dim();
    let (y_range, x_range) = if options.periodic_input {
        (height, width)
    } else {
        (height - n + 1, width - n + 1)
    };

    let mut index = HashMap::new();
    let mut patterns = Vec::new();
    let mut weights = Vec::new();

    for y in 0..y_range {
        for x in 0..x_range {
            let window = grid::periodic_window(input, y, x, n);

            // identity, then alternately the reflection of the previous
            // variant and the rotation of the one before that
            let mut variants = Vec::with_capacity(options.symmetry);
            variants.push(window);
            while variants.len() < options.symmetry {
                let generated = variants.len();
                let variant = if generated % 2 == 1 {
                    grid::reflected(&variants[generated - 1])
                } else {
                    grid::rotated(&variants[generated - 2])
                };
                variants.push(variant);
            }

            for variant in variants {
                let key: Vec<T> = variant.iter().copied().collect();
                match index.entry(key) {
                    Entry::Occupied(entry) => weights[*entry.get()] += 1.0,
                    Entry::Vacant(entry) => {
                        entry.insert(patterns.len());
                        patterns.push(variant);
                        weights.push(1.0);
                    }
                }
            }
        }
    }

    (patterns, weights, index)
}


/// The most frequent toroidal patch anchored on the input's bottom row.
fn ground_pattern<T>(input: &Array2<T>, index: &PatternIndex<T>, n: usize) -> Result<usize, Error>
    where T: Copy + Eq + Hash
{
    let (height, width) = input.dim();

    let mut counts: HashMap<usize, usize> = HashMap::new();
    let mut best = None;

    for x in 0..width {
        let patch = grid::periodic_window(input, height - 1, x, n);
        let key: Vec<T> = patch.iter().copied().collect();
        let pattern = match index.get(&key) {
            Some(&pattern) => pattern,
            None => return Err(Error::GroundPattern),
        };

        let count = counts.entry(pattern).or_insert(0);
        *count += 1;
        match best {
            Some((_, top)) if *count <= top => {}
            _ => best = Some((pattern, *count)),
        }
    }

    // width >= n >= 2, so at least one patch was seen
    Ok(best.map(|(pattern, _)| pattern).unwrap())
}


fn agrees<T: Copy + Eq>(first: &Array2<T>, second: &Array2<T>, dy: isize, dx: isize) -> bool {
    let n = first.dim().0 as isize;
    let (y_min, y_max) = if dy < 0 { (0, dy + n) } else { (dy, n) };
    let (x_min, x_max) = if dx < 0 { (0, dx + n) } else { (dx, n) };

    for y in y_min..y_max {
        for x in x_min..x_max {
            if first[[y as usize, x as usize]] != second[[(y - dy) as usize, (x - dx) as usize]] {
                return false;
            }
        }
    }

    true
}


fn generate_compatibility<T: Copy + Eq>(patterns: &[Array2<T>]) -> Compatibility {
    (0..patterns.len())
        .map(|first| {
            let mut lists: [Vec<usize>; 4] = Default::default();
            for direction in 0..4 {
                for second in 0..patterns.len() {
                    if agrees(&patterns[first],
                              &patterns[second],
                              DY[direction],
                              DX[direction]) {
                        lists[direction].push(second);
                    }
                }
            }
            lists
        })
        .collect()
}
