use image::{GenericImageView, ImageBuffer, Pixel};

use ndarray::Array2;


/// Reflection about the vertical axis.
pub fn reflected<T: Copy>(grid: &Array2<T>) -> Array2<T> {
    let (height, width) = grid.dim();
    Array2::from_shape_fn((height, width), |(y, x)| grid[[y, width - 1 - x]])
}


/// Rotation by 90 degrees counter-clockwise.
pub fn rotated<T: Copy>(grid: &Array2<T>) -> Array2<T> {
    let (height, width) = grid.dim();
    Array2::from_shape_fn((width, height), |(y, x)| grid[[x, width - 1 - y]])
}


/// The `n`-by-`n` window anchored at `(y, x)`, wrapping toroidally.
pub fn periodic_window<T: Copy>(grid: &Array2<T>, y: usize, x: usize, n: usize) -> Array2<T> {
    let (height, width) = grid.dim();
    Array2::from_shape_fn((n, n), |(dy, dx)| grid[[(y + dy) % height, (x + dx) % width]])
}


pub fn from_image<I: GenericImageView>(img: &I) -> Array2<I::Pixel> {
    let (width, height) = img.dimensions();
    Array2::from_shape_fn((height as usize, width as usize),
                          |(y, x)| img.get_pixel(x as u32, y as u32))
}


pub fn to_image<P>(grid: &Array2<P>) -> ImageBuffer<P, Vec<P::Subpixel>>
    where P: Pixel + 'static
{
    let (height, width) = grid.dim();
    ImageBuffer::from_fn(width as u32, height as u32, |x, y| grid[[y as usize, x as usize]])
}


#[cfg(test)]
mod tests {
    use super::*;

    use image::{Rgba, RgbaImage};
    use ndarray::array;

    #[test]
    fn reflection_swaps_columns() {
        let grid = array![[1, 2, 3], [4, 5, 6]];
        assert_eq!(reflected(&grid), array![[3, 2, 1], [6, 5, 4]]);
    }

    #[test]
    fn rotation_is_counter_clockwise() {
        let grid = array![[1, 2, 3], [4, 5, 6]];
        assert_eq!(rotated(&grid), array![[3, 6], [2, 5], [1, 4]]);
    }

    #[test]
    fn four_rotations_are_identity() {
        let grid = array![[1, 2], [3, 4]];
        let back = rotated(&rotated(&rotated(&rotated(&grid))));
        assert_eq!(back, grid);
    }

    #[test]
    fn periodic_window_wraps() {
        let grid = array![[1, 2], [3, 4]];
        assert_eq!(periodic_window(&grid, 1, 1, 2), array![[4, 3], [2, 1]]);
    }

    #[test]
    fn image_round_trip() {
        let img = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let grid = from_image(&img);
        assert_eq!(grid.dim(), (2, 3));
        assert_eq!(grid[[1, 2]], Rgba([2, 1, 0, 255]));
        assert_eq!(to_image(&grid), img);
    }
}
