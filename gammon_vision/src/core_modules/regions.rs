// THEORY:
// The board is partitioned into the 24 landing points checkers sit on. The
// partition is pure arithmetic on the board size: twelve equal-width columns, the
// top row of points at 10% of the height and the bottom row at 90%. Points 1-12
// run left to right along the top, points 13-24 left to right along the bottom,
// both rows sharing the same column centres.

use serde::{Deserialize, Serialize};

pub const POINT_COUNT: usize = 24;
pub const COLUMNS: usize = 12;

const TOP_ROW: f64 = 0.1;
const BOTTOM_ROW: f64 = 0.9;

/// Which edge of the board a point sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Top,
    Bottom,
}

/// One of the 24 board points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// 1-based point number, `1..=24`.
    pub index: u8,
    pub x: f64,
    pub y: f64,
    pub side: Side,
}

/// Maps a `width` x `height` board to its 24 points, ordered by index.
pub fn board_points(width: f64, height: f64) -> Vec<Point> {
    let column_width = width / COLUMNS as f64;
    (0..POINT_COUNT)
        .map(|i| {
            let column = i % COLUMNS;
            let (side, row) = if i < COLUMNS {
                (Side::Top, TOP_ROW)
            } else {
                (Side::Bottom, BOTTOM_ROW)
            };
            Point {
                index: (i + 1) as u8,
                x: (column as f64 + 0.5) * column_width,
                y: row * height,
                side,
            }
        })
        .collect()
}

/// The point closest to `(x, y)`, or `None` for an empty slice.
pub fn nearest_point(points: &[Point], x: f64, y: f64) -> Option<&Point> {
    points.iter().min_by(|a, b| {
        let da = (a.x - x).powi(2) + (a.y - y).powi(2);
        let db = (b.x - x).powi(2) + (b.y - y).powi(2);
        da.total_cmp(&db)
    })
}
