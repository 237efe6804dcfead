// THEORY:
// The `GridManager` turns a raw frame into the chunk grid the rest of the detector
// works on. It slices the frame into square `Chunk`s, averages each one, and
// buckets the average into a `ColorClass`. The result is a "class map": a flat,
// row-major `Vec<ColorClass>` with one entry per chunk, which is the direct input
// of the blob detector.
//
// The manager owns its scratch buffers (the pixels of the chunk being averaged and
// the class map itself) so that a detector session can analyse frame after frame
// without reallocating. Chunks that would hang off the right or bottom edge of the
// frame are skipped, so the grid always covers whole chunks only.

use crate::core_modules::chunk::Chunk;
use crate::core_modules::pixel::{ColorClass, ColorThresholds, Pixel};
use image::RgbaImage;

/// Largest accepted chunk side in pixels.
pub const MAX_CHUNK_SIZE: u32 = 1024;

/// Owns the chunk grid for one detector session.
pub struct GridManager {
    /// The side of a square chunk in pixels.
    chunk_size: u32,
    /// The width of the grid in chunks.
    grid_width: u32,
    /// The height of the grid in chunks.
    grid_height: u32,
    /// Reused buffer holding the pixels of the chunk currently being averaged.
    chunk_pixels: Vec<Pixel>,
    /// The class of every chunk in the last processed frame.
    class_map: Vec<ColorClass>,
}

impl GridManager {
    /// `chunk_size` is clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn new(chunk_size: u32) -> Self {
        let chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        Self {
            chunk_size,
            grid_width: 0,
            grid_height: 0,
            chunk_pixels: Vec::with_capacity(chunk_size as usize * chunk_size as usize),
            class_map: Vec::new(),
        }
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn grid_width(&self) -> u32 {
        self.grid_width
    }

    pub fn grid_height(&self) -> u32 {
        self.grid_height
    }

    /// Classifies every whole chunk of `frame` and returns the class map.
    pub fn process_frame(&mut self, frame: &RgbaImage, thresholds: &ColorThresholds) -> &[ColorClass] {
        self.grid_width = frame.width() / self.chunk_size;
        self.grid_height = frame.height() / self.chunk_size;
        let num_chunks = (self.grid_width * self.grid_height) as usize;
        self.class_map.clear();
        self.class_map.reserve(num_chunks);

        for chunk_y in 0..self.grid_height {
            for chunk_x in 0..self.grid_width {
                self.chunk_pixels.clear();
                let x0 = chunk_x * self.chunk_size;
                let y0 = chunk_y * self.chunk_size;
                for y in y0..y0 + self.chunk_size {
                    for x in x0..x0 + self.chunk_size {
                        self.chunk_pixels.push(Pixel::from(*frame.get_pixel(x, y)));
                    }
                }
                let chunk = Chunk::new(self.chunk_size, self.chunk_size, &self.chunk_pixels);
                self.class_map.push(chunk.average_pixel().classify(thresholds));
            }
        }

        &self.class_map
    }

    pub fn get_last_class_map(&self) -> &[ColorClass] {
        &self.class_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn grid_skips_partial_chunks() {
        let frame = RgbaImage::from_pixel(10, 7, Rgba([40, 120, 60, 255]));
        let mut grid = GridManager::new(4);
        let map = grid.process_frame(&frame, &ColorThresholds::default()).to_vec();
        assert_eq!(map.len(), 2);
        assert_eq!(grid.grid_width(), 2);
        assert_eq!(grid.grid_height(), 1);
        assert!(map.iter().all(|c| *c == ColorClass::Background));
    }

    #[test]
    fn dark_block_is_classified_dark() {
        let mut frame = RgbaImage::from_pixel(8, 8, Rgba([40, 120, 60, 255]));
        for y in 4..8 {
            for x in 4..8 {
                frame.put_pixel(x, y, Rgba([10, 10, 10, 255]));
            }
        }
        let mut grid = GridManager::new(4);
        let map = grid.process_frame(&frame, &ColorThresholds::default()).to_vec();
        assert_eq!(
            map,
            vec![ColorClass::Background, ColorClass::Background, ColorClass::Background, ColorClass::Dark]
        );
        assert_eq!(grid.get_last_class_map(), map.as_slice());
    }

    #[test]
    fn oversized_chunks_are_clamped() {
        let mut grid = GridManager::new(u32::MAX);
        assert_eq!(grid.chunk_size(), MAX_CHUNK_SIZE);
        assert_eq!(GridManager::new(0).chunk_size(), 1);

        let frame = RgbaImage::from_pixel(64, 64, Rgba([10, 10, 10, 255]));
        assert!(grid.process_frame(&frame, &ColorThresholds::default()).is_empty());
        assert_eq!((grid.grid_width(), grid.grid_height()), (0, 0));
    }
}
