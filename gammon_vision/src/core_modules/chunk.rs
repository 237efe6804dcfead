// THEORY:
// A `Chunk` is a square block of pixels cut out of a frame. Averaging a block
// rather than reading single pixels cancels sensor noise and board texture, and
// shrinks a full frame down to a grid small enough to flood-fill cheaply. The
// chunk does not know where it sits in the grid or what its neighbours are; it
// only summarises its own pixels.

use crate::core_modules::pixel::Pixel;

/// A "dumb" view of a rectangular block of pixels.
pub struct Chunk<'a> {
    /// The width of the chunk in pixels.
    pub width: u32,
    /// The height of the chunk in pixels.
    pub height: u32,
    /// Row-major pixels of this chunk, borrowed from the grid's scratch buffer.
    pub pixels: &'a [Pixel],
}

impl<'a> Chunk<'a> {
    pub fn new(width: u32, height: u32, pixels: &'a [Pixel]) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Calculates the average pixel value for the entire chunk.
    pub fn average_pixel(&self) -> Pixel {
        let num_pixels = self.pixels.len() as u64;
        if num_pixels == 0 {
            return Pixel::default();
        }

        let mut sum_r = 0u64;
        let mut sum_g = 0u64;
        let mut sum_b = 0u64;
        let mut sum_a = 0u64;
        for pixel in self.pixels {
            sum_r += pixel.red as u64;
            sum_g += pixel.green as u64;
            sum_b += pixel.blue as u64;
            sum_a += pixel.alpha as u64;
        }

        Pixel {
            red: (sum_r / num_pixels) as u8,
            green: (sum_g / num_pixels) as u8,
            blue: (sum_b / num_pixels) as u8,
            alpha: (sum_a / num_pixels) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_every_channel() {
        let pixels = [
            Pixel::new(0, 10, 100, 255),
            Pixel::new(10, 20, 200, 255),
            Pixel::new(20, 30, 0, 255),
            Pixel::new(30, 40, 100, 255),
        ];
        let chunk = Chunk::new(2, 2, &pixels);
        assert_eq!(chunk.average_pixel(), Pixel::new(15, 25, 100, 255));
    }

    #[test]
    fn empty_chunk_is_default() {
        let chunk = Chunk::new(0, 0, &[]);
        assert_eq!(chunk.average_pixel(), Pixel::default());
    }
}
