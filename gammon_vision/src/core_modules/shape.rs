// THEORY:
// Shape classification decides whether a blob is a disc (a checker) or a square
// (a die or the doubling cube) from two cheap properties of its bounding box:
//
// - aspect ratio: both shapes have a roughly square box; elongated blobs are
//   board edges, shadows or stacked pieces and are ignored.
// - fill ratio: a disc covers about pi/4 (~0.785) of its box, an axis-aligned
//   square covers all of it.
//
// The fill is measured after closing interior holes, because the pips on a die
// punch holes into the chunk grid that would otherwise make a die look like a disc.
// A hole is any non-blob chunk inside the box that cannot reach the box border
// through other non-blob chunks.

use crate::core_modules::blob::Blob;

/// The two shapes the board detector cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Circle,
    Square,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeThresholds {
    /// Largest accepted long-side / short-side ratio of the bounding box.
    pub max_aspect: f64,
    /// Hole-filled coverage at or above which a blob is a square.
    pub square_fill_ratio: f64,
    /// Hole-filled coverage below which a blob is neither shape.
    pub circle_min_fill_ratio: f64,
}

impl Default for ShapeThresholds {
    fn default() -> Self {
        Self {
            max_aspect: 1.35,
            square_fill_ratio: 0.9,
            circle_min_fill_ratio: 0.6,
        }
    }
}

/// Blob area in chunks with interior holes closed.
pub fn filled_size(blob: &Blob) -> usize {
    let (top_left, _) = blob.bounding_box;
    let (w, h) = blob.box_size();
    let (w, h) = (w as usize, h as usize);

    let mut member = vec![false; w * h];
    for point in &blob.chunk_coords {
        member[(point.y - top_left.y) as usize * w + (point.x - top_left.x) as usize] = true;
    }

    // Flood the non-member cells reachable from the border.
    let mut outside = vec![false; w * h];
    let mut stack = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let on_border = x == 0 || y == 0 || x == w - 1 || y == h - 1;
            let index = y * w + x;
            if on_border && !member[index] {
                outside[index] = true;
                stack.push((x, y));
            }
        }
    }
    while let Some((x, y)) = stack.pop() {
        let neighbours = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbours {
            if nx >= w || ny >= h {
                continue;
            }
            let index = ny * w + nx;
            if !member[index] && !outside[index] {
                outside[index] = true;
                stack.push((nx, ny));
            }
        }
    }

    w * h - outside.iter().filter(|o| **o).count()
}

/// Classifies a blob, or returns `None` when it is neither a disc nor a square.
pub fn classify_shape(blob: &Blob, thresholds: &ShapeThresholds) -> Option<Shape> {
    if blob.aspect_ratio() > thresholds.max_aspect {
        return None;
    }
    let (w, h) = blob.box_size();
    let fill = filled_size(blob) as f64 / (w * h) as f64;
    if fill >= thresholds.square_fill_ratio {
        Some(Shape::Square)
    } else if fill >= thresholds.circle_min_fill_ratio {
        Some(Shape::Circle)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::blob_detector::find_blobs;
    use crate::core_modules::pixel::ColorClass;

    fn grid_from(rows: &[&str]) -> (Vec<ColorClass>, u32, u32) {
        let map = rows
            .iter()
            .flat_map(|row| row.chars())
            .map(|c| if c == '#' { ColorClass::Light } else { ColorClass::Background })
            .collect();
        (map, rows[0].len() as u32, rows.len() as u32)
    }

    fn only_blob(rows: &[&str]) -> Blob {
        let (map, w, h) = grid_from(rows);
        let mut blobs = find_blobs(&map, w, h, 1);
        assert_eq!(blobs.len(), 1);
        blobs.remove(0)
    }

    #[test]
    fn square_with_pip_holes_is_square() {
        let blob = only_blob(&[
            "######",
            "#.##.#",
            "######",
            "######",
            "#.##.#",
            "######",
        ]);
        assert_eq!(filled_size(&blob), 36);
        assert_eq!(classify_shape(&blob, &ShapeThresholds::default()), Some(Shape::Square));
    }

    #[test]
    fn disc_is_circle() {
        let blob = only_blob(&[
            "..####..",
            ".######.",
            "########",
            "########",
            "########",
            "########",
            ".######.",
            "..####..",
        ]);
        assert_eq!(filled_size(&blob), 52);
        assert_eq!(classify_shape(&blob, &ShapeThresholds::default()), Some(Shape::Circle));
    }

    #[test]
    fn elongated_and_sparse_blobs_are_rejected() {
        let bar = only_blob(&["########", "########"]);
        assert_eq!(classify_shape(&bar, &ShapeThresholds::default()), None);

        let cross = only_blob(&["..#..", "..#..", "#####", "..#..", "..#.."]);
        assert_eq!(classify_shape(&cross, &ShapeThresholds::default()), None);
    }
}
