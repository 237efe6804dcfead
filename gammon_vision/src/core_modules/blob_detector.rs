// THEORY:
// The blob detector is the spatial grouping layer. It reads the class map built by
// the `GridManager` and returns every 4-connected region of chunks that share a
// non-background colour class. Regions smaller than `min_chunks` are treated as
// noise (specular highlights, the edge of a triangle, a stray shadow) and dropped.
//
// Like the rest of the per-frame analysis it is stateless: one class map in, one
// list of blobs out.

use crate::core_modules::blob::{Blob, GridPoint};
use crate::core_modules::pixel::ColorClass;

/// Finds every connected region of same-class, non-background chunks.
pub fn find_blobs(class_map: &[ColorClass], grid_width: u32, grid_height: u32, min_chunks: usize) -> Vec<Blob> {
    let width = grid_width as usize;
    let height = grid_height as usize;
    if class_map.len() < width * height {
        return Vec::new();
    }

    let mut visited = vec![false; width * height];
    let mut blobs = Vec::new();
    let mut blob_id_counter = 0;

    for y in 0..height {
        for x in 0..width {
            let index = y * width + x;
            let class = class_map[index];
            if visited[index] || class == ColorClass::Background {
                continue;
            }

            let seed = GridPoint { x: x as u32, y: y as u32 };
            let chunks = grow_region(seed, class, class_map, &mut visited, width, height);
            if chunks.len() < min_chunks {
                continue;
            }
            blobs.push(aggregate(blob_id_counter, class, chunks));
            blob_id_counter += 1;
        }
    }

    blobs
}

/// Depth-first fill over the 4 direct neighbours (no diagonals).
fn grow_region(
    seed: GridPoint,
    class: ColorClass,
    class_map: &[ColorClass],
    visited: &mut [bool],
    width: usize,
    height: usize,
) -> Vec<GridPoint> {
    let mut region = Vec::new();
    let mut stack = vec![seed];
    visited[seed.y as usize * width + seed.x as usize] = true;

    while let Some(current) = stack.pop() {
        region.push(current);

        for (dx, dy) in [(0i64, 1i64), (0, -1), (1, 0), (-1, 0)] {
            let nx = current.x as i64 + dx;
            let ny = current.y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            let index = ny as usize * width + nx as usize;
            if !visited[index] && class_map[index] == class {
                visited[index] = true;
                stack.push(GridPoint { x: nx as u32, y: ny as u32 });
            }
        }
    }

    region
}

fn aggregate(id: u64, class: ColorClass, chunks: Vec<GridPoint>) -> Blob {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut center_x = 0.0;
    let mut center_y = 0.0;

    for point in &chunks {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
        center_x += point.x as f64 + 0.5;
        center_y += point.y as f64 + 0.5;
    }

    let num_chunks = chunks.len();
    Blob {
        id,
        class,
        bounding_box: (GridPoint { x: min_x, y: min_y }, GridPoint { x: max_x, y: max_y }),
        chunk_coords: chunks,
        size_in_chunks: num_chunks,
        center_of_mass: (center_x / num_chunks as f64, center_y / num_chunks as f64),
    }
}
