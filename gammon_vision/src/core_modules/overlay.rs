// THEORY:
// The overlay draws what the detector saw back onto the frame: a ring around every
// checker, a box around each die and the doubling cube, and a dot on each of the
// 24 board points. All primitives clip against the frame, so a detection half off
// screen still draws what is visible.

use crate::core_modules::game_state::{Detection, GameStateSnapshot};
use crate::core_modules::regions::Point;
use image::{Rgba, RgbaImage};

pub const CHECKER_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const RED_DIE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const WHITE_DIE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const CUBE_COLOR: Rgba<u8> = Rgba([0, 128, 255, 255]);
pub const POINT_COLOR: Rgba<u8> = Rgba([255, 220, 0, 255]);

const STROKE: i64 = 2;
const POINT_RADIUS: i64 = 4;

fn put(frame: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && x < frame.width() as i64 && y < frame.height() as i64 {
        frame.put_pixel(x as u32, y as u32, color);
    }
}

/// Fills the end-exclusive rectangle `[x0, x1) x [y0, y1)`.
pub fn fill_rect(frame: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
    for y in y0.max(0)..y1.min(frame.height() as i64) {
        for x in x0.max(0)..x1.min(frame.width() as i64) {
            frame.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Fills every pixel within `radius` of `(cx, cy)`.
pub fn fill_disc(frame: &mut RgbaImage, cx: i64, cy: i64, radius: i64, color: Rgba<u8>) {
    for y in cy - radius..=cy + radius {
        for x in cx - radius..=cx + radius {
            if (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius {
                put(frame, x, y, color);
            }
        }
    }
}

/// Draws a ring of `STROKE` pixels just inside `radius`.
pub fn draw_circle(frame: &mut RgbaImage, cx: i64, cy: i64, radius: i64, color: Rgba<u8>) {
    let outer = radius * radius;
    let inner = (radius - STROKE).max(0).pow(2);
    for y in cy - radius..=cy + radius {
        for x in cx - radius..=cx + radius {
            let d = (x - cx).pow(2) + (y - cy).pow(2);
            if d <= outer && d > inner {
                put(frame, x, y, color);
            }
        }
    }
}

/// Draws the outline of the end-exclusive rectangle `[x0, x1) x [y0, y1)`.
pub fn draw_rect(frame: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
    fill_rect(frame, x0, y0, x1, y0 + STROKE, color);
    fill_rect(frame, x0, y1 - STROKE, x1, y1, color);
    fill_rect(frame, x0, y0, x0 + STROKE, y1, color);
    fill_rect(frame, x1 - STROKE, y0, x1, y1, color);
}

fn draw_square_around(frame: &mut RgbaImage, detection: &Detection, color: Rgba<u8>) {
    let half = detection.radius.round() as i64;
    let (cx, cy) = (detection.x.round() as i64, detection.y.round() as i64);
    draw_rect(frame, cx - half, cy - half, cx + half, cy + half, color);
}

/// Draws every detection in `snapshot` and the board `points` onto `frame`.
pub fn draw_overlay(frame: &mut RgbaImage, snapshot: &GameStateSnapshot, points: &[Point]) {
    for point in points {
        fill_disc(frame, point.x.round() as i64, point.y.round() as i64, POINT_RADIUS, POINT_COLOR);
    }

    for checker in &snapshot.checkers {
        draw_circle(
            frame,
            checker.x.round() as i64,
            checker.y.round() as i64,
            checker.radius.round().max(1.0) as i64,
            CHECKER_COLOR,
        );
    }

    if let Some(red) = &snapshot.dice.red {
        draw_square_around(frame, red, RED_DIE_COLOR);
    }
    if let Some(white) = &snapshot.dice.white {
        draw_square_around(frame, white, WHITE_DIE_COLOR);
    }

    if let Some(cube) = &snapshot.cube {
        if let Some((x, y)) = cube.position() {
            // Client snapshots carry no cube size.
            let half = 20;
            let (cx, cy) = (x.round() as i64, y.round() as i64);
            draw_rect(frame, cx - half, cy - half, cx + half, cy + half, CUBE_COLOR);
        }
    }
}
