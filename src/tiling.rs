use ndarray::Array2;

use crate::direction::{opposite, DOWN, LEFT, RIGHT, UP};
use crate::grid;
use crate::propagator::Compatibility;
use crate::wfc::Wfc;
use crate::Error;


/// Dihedral class of a tile, fixing how many distinct orientations it has.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Symmetry {
    /// Fully symmetric.
    #[default]
    X,
    /// Two-fold, like a straight segment.
    I,
    /// Corner.
    L,
    /// T-junction.
    T,
    /// Diagonal.
    Backslash,
    /// No symmetry at all.
    P,
}


impl Symmetry {
    pub fn orientations(self) -> usize {
        match self {
            Symmetry::X => 1,
            Symmetry::I | Symmetry::Backslash => 2,
            Symmetry::L | Symmetry::T => 4,
            Symmetry::P => 8,
        }
    }


    fn rotation_map(self) -> &'static [usize] {
        match self {
            Symmetry::X => &[0],
            Symmetry::I | Symmetry::Backslash => &[1, 0],
            Symmetry::L | Symmetry::T => &[1, 2, 3, 0],
            Symmetry::P => &[1, 2, 3, 0, 5, 6, 7, 4],
        }
    }


    fn reflection_map(self) -> &'static [usize] {
        match self {
            Symmetry::X => &[0],
            Symmetry::I => &[0, 1],
            Symmetry::Backslash => &[1, 0],
            Symmetry::T => &[0, 3, 2, 1],
            Symmetry::L => &[1, 0, 3, 2],
            Symmetry::P => &[4, 7, 6, 5, 0, 3, 2, 1],
        }
    }


    /// How each of the eight dihedral actions permutes this class's
    /// orientation indices: identity, three successive rotations, then the
    /// reflection and its three rotations.
    fn action_map(self) -> Vec<Vec<usize>> {
        let rotation = self.rotation_map();
        let reflection = self.reflection_map();

        let mut actions: Vec<Vec<usize>> = Vec::with_capacity(8);
        actions.push((0..rotation.len()).collect());
        for action in 1..4 {
            actions.push(actions[action - 1].iter().map(|&o| rotation[o]).collect());
        }
        actions.push(actions[0].iter().map(|&o| reflection[o]).collect());
        for action in 5..8 {
            actions.push(actions[action - 1].iter().map(|&o| rotation[o]).collect());
        }

        actions
    }
}


// where each action carries the canonical "may sit left of" direction
const ACTION_DIRECTIONS: [usize; 8] = [RIGHT, UP, LEFT, DOWN, LEFT, DOWN, RIGHT, UP];


pub struct Tile<T> {
    pub images: Vec<Array2<T>>,
    pub symmetry: Symmetry,
    pub weight: f64,
}


impl<T: Copy> Tile<T> {
    /// A tile whose orientation images are synthesized by rotating and
    /// reflecting a single image.
    pub fn new(image: Array2<T>, symmetry: Symmetry, weight: f64) -> Tile<T> {
        let mut images = Vec::with_capacity(symmetry.orientations());
        images.push(image);
        match symmetry {
            Symmetry::X => {}
            Symmetry::I | Symmetry::Backslash => {
                let quarter = grid::rotated(&images[0]);
                images.push(quarter);
            }
            Symmetry::L | Symmetry::T => {
                for turn in 1..4 {
                    let quarter = grid::rotated(&images[turn - 1]);
                    images.push(quarter);
                }
            }
            Symmetry::P => {
                for turn in 1..4 {
                    let quarter = grid::rotated(&images[turn - 1]);
                    images.push(quarter);
                }
                images.push(grid::reflected(&images[0]));
                for turn in 5..8 {
                    let quarter = grid::rotated(&images[turn - 1]);
                    images.push(quarter);
                }
            }
        }

        Tile {
            images,
            symmetry,
            weight,
        }
    }


    /// A tile with caller-supplied orientation images; their count must
    /// match the symmetry class.
    pub fn with_orientations(images: Vec<Array2<T>>, symmetry: Symmetry, weight: f64) -> Tile<T> {
        Tile {
            images,
            symmetry,
            weight,
        }
    }
}


/// The tiled model: a grid of oriented tiles obeying left-right adjacency
/// rules and everything those rules imply under the dihedral group.
pub struct TilingWfc<T> {
    oriented: Vec<Array2<T>>,
    oriented_ids: Vec<Vec<usize>>,
    tile_size: usize,
    height: usize,
    width: usize,
    wfc: Wfc,
}


impl<T: Copy + Eq> TilingWfc<T> {
    /// `neighbors` entries `(a, oa, b, ob)` allow tile `a` at orientation
    /// `oa` immediately left of tile `b` at orientation `ob`; rules naming
    /// a tile or orientation outside the palette are discarded.
    pub fn new(tiles: Vec<Tile<T>>,
               neighbors: &[(usize, usize, usize, usize)],
               height: usize,
               width: usize,
               periodic: bool,
               seed: u64)
               -> Result<TilingWfc<T>, Error> {
        if tiles.is_empty() {
            return Err(Error::NoTiles);
        }

        let mut size = None;
        for (index, tile) in tiles.iter().enumerate() {
            let expected = tile.symmetry.orientations();
            if tile.images.len() != expected {
                return Err(Error::OrientationCount {
                    tile: index,
                    expected,
                    found: tile.images.len(),
                });
            }
            if tile.weight <= 0.0 {
                return Err(Error::TileWeight { tile: index });
            }
            for image in &tile.images {
                let side = *size.get_or_insert(image.dim().0);
                if image.dim() != (side, side) {
                    return Err(Error::TileImage { tile: index });
                }
            }
        }
        let tile_size = size.unwrap();

        let mut oriented_ids = Vec::with_capacity(tiles.len());
        let mut weights = Vec::new();
        let mut patterns = 0;
        for tile in &tiles {
            let ids: Vec<usize> = (0..tile.images.len()).map(|o| patterns + o).collect();
            patterns += tile.images.len();
            weights.extend(std::iter::repeat(tile.weight / tile.images.len() as f64)
                .take(tile.images.len()));
            oriented_ids.push(ids);
        }
        debug!("{} tiles expand to {} oriented patterns", tiles.len(), patterns);

        let compatibility = compile_neighbors(&tiles, &oriented_ids, neighbors, patterns);
        let wfc = Wfc::new(height, width, periodic, &weights, compatibility, seed);
        let oriented = tiles.into_iter().flat_map(|tile| tile.images).collect();

        Ok(TilingWfc {
            oriented,
            oriented_ids,
            tile_size,
            height,
            width,
            wfc,
        })
    }


    /// Runs the solver. `Some` holds the assembled pixel grid, sized
    /// `height * tile_size` by `width * tile_size`; `None` reports a
    /// contradiction.
    pub fn run(&mut self) -> Option<Array2<T>> {
        let cells = self.wfc.run()?;
        Some(self.decode(&cells))
    }


    /// Pre-places an oriented tile at cell `(y, x)`. False if the tile,
    /// orientation or cell is out of range, or the placement contradicts
    /// the wave.
    pub fn set_tile(&mut self, tile: usize, orientation: usize, y: usize, x: usize) -> bool {
        if tile >= self.oriented_ids.len() || orientation >= self.oriented_ids[tile].len() {
            return false;
        }
        if y >= self.height || x >= self.width {
            return false;
        }

        let keep = self.oriented_ids[tile][orientation];
        if !self.wfc.wave().possible(y, x, keep) {
            return false;
        }

        for pattern in 0..self.oriented.len() {
            if pattern != keep && self.wfc.wave().possible(y, x, pattern) {
                self.wfc.ban(y, x, pattern);
            }
        }
        self.wfc.propagate();

        !self.wfc.wave().is_contradicted()
    }


    fn decode(&self, cells: &Array2<usize>) -> Array2<T> {
        let side = self.tile_size;
        Array2::from_shape_fn((self.height * side, self.width * side), |(y, x)| {
            self.oriented[cells[[y / side, x / side]]][[y % side, x % side]]
        })
    }
}


fn compile_neighbors<T>(tiles: &[Tile<T>],
                        oriented_ids: &[Vec<usize>],
                        neighbors: &[(usize, usize, usize, usize)],
                        patterns: usize)
                        -> Compatibility {
    let empty = || [vec![false; patterns], vec![false; patterns],
                    vec![false; patterns], vec![false; patterns]];
    let mut dense: Vec<[Vec<bool>; 4]> = (0..patterns).map(|_| empty()).collect();

    for &(left, left_orientation, right, right_orientation) in neighbors {
        if left >= tiles.len() || right >= tiles.len() {
            debug!("discarding rule over unknown tiles {} and {}", left, right);
            continue;
        }
        if left_orientation >= tiles[left].symmetry.orientations()
            || right_orientation >= tiles[right].symmetry.orientations()
        {
            debug!("discarding rule over unknown orientations");
            continue;
        }

        let left_actions = tiles[left].symmetry.action_map();
        let right_actions = tiles[right].symmetry.action_map();

        for action in 0..8 {
            let direction = ACTION_DIRECTIONS[action];
            let first = oriented_ids[left][left_actions[action][left_orientation]];
            let second = oriented_ids[right][right_actions[action][right_orientation]];
            dense[first][direction][second] = true;
            dense[second][opposite(direction)][first] = true;
        }
    }

    dense
        .into_iter()
        .map(|lists| {
            let mut sparse: [Vec<usize>; 4] = Default::default();
            for direction in 0..4 {
                for (pattern, &allowed) in lists[direction].iter().enumerate() {
                    if allowed {
                        sparse[direction].push(pattern);
                    }
                }
            }
            sparse
        })
        .collect()
}
