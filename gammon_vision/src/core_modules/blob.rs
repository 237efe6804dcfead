// THEORY:
// A `Blob` is the output of the spatial grouping layer: one contiguous region of
// same-coloured chunks in a single frame. It is a "dumb" data container with the
// summary properties the shape classifier needs (bounding box, area, centroid).
// It has no identity across frames; a new set of blobs is built for every frame.

use crate::core_modules::pixel::ColorClass;

/// A coordinate on the chunk grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPoint {
    pub x: u32,
    pub y: u32,
}

/// A single, spatially coherent region of one colour class.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Per-frame identifier. Not persistent.
    pub id: u64,
    /// The colour class shared by every chunk in the blob.
    pub class: ColorClass,
    /// Inclusive top-left and bottom-right chunk of the enclosing box.
    pub bounding_box: (GridPoint, GridPoint),
    /// Every chunk that makes up this blob.
    pub chunk_coords: Vec<GridPoint>,
    /// Area in chunks.
    pub size_in_chunks: usize,
    /// Mean of the chunk centres, in chunk units.
    pub center_of_mass: (f64, f64),
}

impl Blob {
    /// Bounding box width and height in chunks.
    pub fn box_size(&self) -> (u32, u32) {
        let (top_left, bottom_right) = self.bounding_box;
        (bottom_right.x - top_left.x + 1, bottom_right.y - top_left.y + 1)
    }

    /// Share of the bounding box covered by the blob, in `(0, 1]`.
    pub fn fill_ratio(&self) -> f64 {
        let (w, h) = self.box_size();
        self.size_in_chunks as f64 / (w * h) as f64
    }

    /// Long side over short side of the bounding box, always `>= 1`.
    pub fn aspect_ratio(&self) -> f64 {
        let (w, h) = self.box_size();
        w.max(h) as f64 / w.min(h) as f64
    }

    /// Centroid in pixel space for a grid of `chunk_size` pixel chunks.
    pub fn pixel_center(&self, chunk_size: u32) -> (f64, f64) {
        let scale = chunk_size as f64;
        (self.center_of_mass.0 * scale, self.center_of_mass.1 * scale)
    }

    /// Bounding box in pixel space as `(x0, y0, x1, y1)`, end-exclusive.
    pub fn pixel_box(&self, chunk_size: u32) -> (u32, u32, u32, u32) {
        let (top_left, bottom_right) = self.bounding_box;
        (
            top_left.x * chunk_size,
            top_left.y * chunk_size,
            (bottom_right.x + 1) * chunk_size,
            (bottom_right.y + 1) * chunk_size,
        )
    }
}
