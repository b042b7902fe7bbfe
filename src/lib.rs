#[macro_use]
extern crate log;

mod direction;
mod grid;
mod overlapping;
mod propagator;
mod tiling;
mod wave;
mod wfc;


pub use crate::direction::{opposite, DX, DY};
pub use crate::grid::{from_image, periodic_window, reflected, rotated, to_image};
pub use crate::overlapping::{OverlappingOptions, OverlappingWfc};
pub use crate::propagator::{Compatibility, Propagator};
pub use crate::tiling::{Symmetry, Tile, TilingWfc};
pub use crate::wave::Wave;
pub use crate::wfc::{ObserveStatus, Wfc};


/// A problem the solver refuses to attempt. Contradictions are not errors:
/// the solvers report those by returning `None` from `run`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("pattern size must be at least 2, got {0}")]
    PatternSize(usize),
    #[error("symmetry must lie in 1..=8, got {0}")]
    Symmetry(usize),
    #[error("input is {height}x{width}, too small for {size}x{size} patterns")]
    InputTooSmall {
        height: usize,
        width: usize,
        size: usize,
    },
    #[error("bounded output needs at least {size} pixels per axis")]
    OutputTooSmall { size: usize },
    #[error("the bottom-row patch never occurs in the extracted pattern set")]
    GroundPattern,
    #[error("the tile palette is empty")]
    NoTiles,
    #[error("tile {tile} supplies {found} orientation images, its symmetry class needs {expected}")]
    OrientationCount {
        tile: usize,
        expected: usize,
        found: usize,
    },
    #[error("tile {tile} has a non-square or mismatched image")]
    TileImage { tile: usize },
    #[error("tile {tile} has a non-positive weight")]
    TileWeight { tile: usize },
}
