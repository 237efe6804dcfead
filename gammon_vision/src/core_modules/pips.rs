// THEORY:
// Pip counting reads a die face at full pixel resolution. Inside the die's box
// (inset so the die outline and shadow stay out), every pixel whose colour class
// contrasts with the die body is a pip candidate: light pixels on the red die,
// dark pixels on the white die. Candidates are grouped into 8-connected
// components and only components whose area is plausible for a pip, relative to
// the die size, are counted.
//
// A count outside 1..=6 means the face could not be read (glare, motion blur, a
// die seen at an angle), and the result is `None` rather than a guess.

use crate::core_modules::pixel::{ColorClass, ColorThresholds, Pixel};
use image::RgbaImage;

/// Share of the die side trimmed from every edge before reading the face.
const INSET: f64 = 0.1;
/// Accepted pip area as a share of the die area.
const MIN_PIP_AREA: f64 = 0.004;
const MAX_PIP_AREA: f64 = 0.08;

/// The colour class pips have on a die of the given body class.
pub fn pip_class(body: ColorClass) -> ColorClass {
    match body {
        ColorClass::Red | ColorClass::Dark => ColorClass::Light,
        ColorClass::Light | ColorClass::Background => ColorClass::Dark,
    }
}

/// Counts the pips inside the end-exclusive pixel box `(x0, y0, x1, y1)`.
pub fn count_pips(
    frame: &RgbaImage,
    die_box: (u32, u32, u32, u32),
    body: ColorClass,
    thresholds: &ColorThresholds,
) -> Option<u8> {
    let (x0, y0, x1, y1) = die_box;
    let x1 = x1.min(frame.width());
    let y1 = y1.min(frame.height());
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let side = ((x1 - x0) + (y1 - y0)) as f64 / 2.0;
    let inset = (side * INSET).round() as u32;
    let (fx0, fy0) = (x0 + inset, y0 + inset);
    let (fx1, fy1) = (x1.saturating_sub(inset), y1.saturating_sub(inset));
    if fx1 <= fx0 || fy1 <= fy0 {
        return None;
    }

    let w = (fx1 - fx0) as usize;
    let h = (fy1 - fy0) as usize;
    let target = pip_class(body);
    let mut candidate = vec![false; w * h];
    for y in 0..h {
        for x in 0..w {
            let pixel = Pixel::from(*frame.get_pixel(fx0 + x as u32, fy0 + y as u32));
            candidate[y * w + x] = pixel.classify(thresholds) == target;
        }
    }

    let die_area = side * side;
    let min_area = (die_area * MIN_PIP_AREA).max(1.0) as usize;
    let max_area = (die_area * MAX_PIP_AREA) as usize;

    let mut pips = 0usize;
    let mut stack = Vec::new();
    for start in 0..candidate.len() {
        if !candidate[start] {
            continue;
        }
        candidate[start] = false;
        stack.push(start);
        let mut area = 0usize;
        while let Some(index) = stack.pop() {
            area += 1;
            let (x, y) = ((index % w) as i64, (index / w) as i64);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    let neighbour = ny as usize * w + nx as usize;
                    if candidate[neighbour] {
                        candidate[neighbour] = false;
                        stack.push(neighbour);
                    }
                }
            }
        }
        if (min_area..=max_area).contains(&area) {
            pips += 1;
        }
    }

    tracing::trace!(pips, ?die_box, "read die face");
    match pips {
        1..=6 => Some(pips as u8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::overlay::{fill_disc, fill_rect};
    use image::Rgba;

    const FELT: Rgba<u8> = Rgba([40, 120, 60, 255]);
    const WHITE: Rgba<u8> = Rgba([245, 245, 240, 255]);
    const BLACK: Rgba<u8> = Rgba([15, 15, 15, 255]);
    const RED: Rgba<u8> = Rgba([200, 30, 30, 255]);

    fn die_face(body: Rgba<u8>, pip: Rgba<u8>, pips: &[(i64, i64)]) -> RgbaImage {
        let mut frame = RgbaImage::from_pixel(60, 60, FELT);
        fill_rect(&mut frame, 10, 10, 50, 50, body);
        for &(x, y) in pips {
            fill_disc(&mut frame, x, y, 4, pip);
        }
        frame
    }

    #[test]
    fn reads_white_die_five() {
        let frame = die_face(WHITE, BLACK, &[(20, 20), (40, 20), (30, 30), (20, 40), (40, 40)]);
        let pips = count_pips(&frame, (10, 10, 50, 50), ColorClass::Light, &ColorThresholds::default());
        assert_eq!(pips, Some(5));
    }

    #[test]
    fn reads_red_die_three() {
        let frame = die_face(RED, WHITE, &[(20, 20), (30, 30), (40, 40)]);
        let pips = count_pips(&frame, (10, 10, 50, 50), ColorClass::Red, &ColorThresholds::default());
        assert_eq!(pips, Some(3));
    }

    #[test]
    fn blank_face_is_unknown() {
        let frame = die_face(WHITE, BLACK, &[]);
        let pips = count_pips(&frame, (10, 10, 50, 50), ColorClass::Light, &ColorThresholds::default());
        assert_eq!(pips, None);
    }

    #[test]
    fn empty_box_is_unknown() {
        let frame = die_face(WHITE, BLACK, &[]);
        assert_eq!(count_pips(&frame, (70, 70, 90, 90), ColorClass::Light, &ColorThresholds::default()), None);
    }
}
