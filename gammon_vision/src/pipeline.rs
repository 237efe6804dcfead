// THEORY:
// The `pipeline` module is the top-level API of the board detector. A
// `BoardDetector` is one detection session: it owns its configuration, the chunk
// grid scratch buffers and a frame counter, and it is passed by `&mut` into every
// call. Nothing is held in process-wide state, so two cameras simply use two
// sessions.
//
// Each call to `detect` runs the full stack on one frame:
//   Stage 1: chunk grid   - average and colour-bucket every chunk.
//   Stage 2: blobs        - group same-class chunks into connected regions.
//   Stage 3: shapes       - discs become checkers, squares become dice or the cube.
//   Stage 4: faces        - read the pip count of each die.
// The output is a `GameStateSnapshot` with no memory of earlier frames.

use crate::core_modules::blob::Blob;
use crate::core_modules::blob_detector::find_blobs;
use crate::core_modules::grid_manager::GridManager;
use crate::core_modules::pips::count_pips;
use crate::core_modules::pixel::{ColorClass, ColorThresholds};
use crate::core_modules::shape::{classify_shape, filled_size, Shape, ShapeThresholds};
use image::RgbaImage;
use std::f64::consts::PI;

// Re-export the data model for the public API.
pub use crate::core_modules::game_state::{Cube, Detection, DetectionKind, Dice, GameStateSnapshot};

/// Configuration for the `BoardDetector`, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Side of a square chunk in pixels.
    pub chunk_size: u32,
    /// Blobs with fewer chunks than this are noise.
    pub min_blob_chunks: usize,
    /// Light squares at least this many pixels across are the doubling cube.
    pub cube_min_side: u32,
    pub colors: ColorThresholds,
    pub shapes: ShapeThresholds,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4,
            min_blob_chunks: 6,
            cube_min_side: 48,
            colors: ColorThresholds::default(),
            shapes: ShapeThresholds::default(),
        }
    }
}

/// A square blob with its pixel-space geometry.
struct SquareCandidate {
    blob: Blob,
    pixel_box: (u32, u32, u32, u32),
    side: u32,
}

impl SquareCandidate {
    fn contains(&self, x: f64, y: f64) -> bool {
        let (x0, y0, x1, y1) = self.pixel_box;
        x >= x0 as f64 && x < x1 as f64 && y >= y0 as f64 && y < y1 as f64
    }
}

/// One detection session.
pub struct BoardDetector {
    config: DetectorConfig,
    grid_manager: GridManager,
    frame_count: u64,
}

impl BoardDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let grid_manager = GridManager::new(config.chunk_size);
        Self {
            config,
            grid_manager,
            frame_count: 0,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Frames analysed by this session so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn detect(&mut self, frame: &RgbaImage) -> GameStateSnapshot {
        self.frame_count += 1;
        let chunk_size = self.grid_manager.chunk_size();

        // Stage 1 + 2: chunk grid and spatial grouping.
        self.grid_manager.process_frame(frame, &self.config.colors);
        let blobs = find_blobs(
            self.grid_manager.get_last_class_map(),
            self.grid_manager.grid_width(),
            self.grid_manager.grid_height(),
            self.config.min_blob_chunks,
        );

        // Stage 3: shape classification.
        let mut discs = Vec::new();
        let mut squares = Vec::new();
        for blob in blobs {
            match classify_shape(&blob, &self.config.shapes) {
                Some(Shape::Circle) if matches!(blob.class, ColorClass::Dark | ColorClass::Light) => discs.push(blob),
                Some(Shape::Square) => {
                    let pixel_box = blob.pixel_box(chunk_size);
                    let (w, h) = blob.box_size();
                    let side = (w + h) * chunk_size / 2;
                    squares.push(SquareCandidate { blob, pixel_box, side });
                }
                _ => {}
            }
        }

        let mut red_die: Option<&SquareCandidate> = None;
        let mut white_die: Option<&SquareCandidate> = None;
        let mut cube: Option<&SquareCandidate> = None;
        for square in &squares {
            let slot = match square.blob.class {
                ColorClass::Red => &mut red_die,
                ColorClass::Light if square.side >= self.config.cube_min_side => &mut cube,
                ColorClass::Light => &mut white_die,
                _ => continue,
            };
            if slot.is_none_or(|current| square.side > current.side) {
                *slot = Some(square);
            }
        }

        // Pips and specks inside a die or the cube are not checkers.
        let checkers = discs
            .iter()
            .filter_map(|blob| {
                let (x, y) = blob.pixel_center(chunk_size);
                if squares.iter().any(|s| s.contains(x, y)) {
                    return None;
                }
                let area = (filled_size(blob) as u32 * chunk_size * chunk_size) as f64;
                Some(Detection::checker(x, y, (area / PI).sqrt()))
            })
            .collect::<Vec<_>>();

        // Stage 4: die faces.
        let read_die = |square: &SquareCandidate, kind: DetectionKind| {
            let (x, y) = square.blob.pixel_center(chunk_size);
            let pips = count_pips(frame, square.pixel_box, square.blob.class, &self.config.colors);
            Detection::die(kind, x, y, square.side as f64 / 2.0, pips)
        };
        let dice = Dice {
            red: red_die.map(|s| read_die(s, DetectionKind::RedDie)),
            white: white_die.map(|s| read_die(s, DetectionKind::WhiteDie)),
        };

        // Cube faces are not read; the value stays unknown.
        let cube = cube.map(|square| {
            let (x, y) = square.blob.pixel_center(chunk_size);
            Cube {
                x: Some(x),
                y: Some(y),
                value: None,
            }
        });

        tracing::debug!(
            frame = self.frame_count,
            checkers = checkers.len(),
            red_die = dice.red.is_some(),
            white_die = dice.white.is_some(),
            cube = cube.is_some(),
            "analysed frame"
        );

        GameStateSnapshot {
            checkers,
            dice,
            cube,
            timestamp: None,
        }
    }
}

impl Default for BoardDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::overlay::{fill_disc, fill_rect};
    use image::Rgba;

    const FELT: Rgba<u8> = Rgba([40, 120, 60, 255]);
    const WHITE: Rgba<u8> = Rgba([245, 245, 240, 255]);
    const IVORY: Rgba<u8> = Rgba([230, 230, 220, 255]);
    const BLACK: Rgba<u8> = Rgba([15, 15, 15, 255]);
    const RED: Rgba<u8> = Rgba([200, 30, 30, 255]);

    fn board_frame() -> RgbaImage {
        let mut frame = RgbaImage::from_pixel(320, 240, FELT);

        // Checkers.
        fill_disc(&mut frame, 60, 60, 20, BLACK);
        fill_disc(&mut frame, 160, 60, 20, IVORY);

        // Red die showing three.
        fill_rect(&mut frame, 40, 140, 80, 180, RED);
        for (x, y) in [(50, 150), (60, 160), (70, 170)] {
            fill_disc(&mut frame, x, y, 4, WHITE);
        }

        // White die showing five.
        fill_rect(&mut frame, 140, 140, 180, 180, WHITE);
        for (x, y) in [(150, 150), (170, 150), (160, 160), (150, 170), (170, 170)] {
            fill_disc(&mut frame, x, y, 4, BLACK);
        }

        // Doubling cube.
        fill_rect(&mut frame, 232, 120, 296, 184, WHITE);

        frame
    }

    fn near(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() <= 3.0
    }

    #[test]
    fn finds_checkers_dice_and_cube() {
        let mut detector = BoardDetector::default();
        let snapshot = detector.detect(&board_frame());

        assert_eq!(snapshot.checkers.len(), 2, "{:?}", snapshot.checkers);
        for (x, y) in [(60.0, 60.0), (160.0, 60.0)] {
            let checker = snapshot
                .checkers
                .iter()
                .find(|c| near(c.x, x) && near(c.y, y))
                .expect("checker near expected position");
            assert!(near(checker.radius, 20.0), "radius {}", checker.radius);
        }

        let red = snapshot.dice.red.as_ref().expect("red die");
        assert!(near(red.x, 60.0) && near(red.y, 160.0));
        assert_eq!(red.pips, Some(3));

        let white = snapshot.dice.white.as_ref().expect("white die");
        assert!(near(white.x, 160.0) && near(white.y, 160.0));
        assert_eq!(white.pips, Some(5));

        let cube = snapshot.cube.as_ref().expect("cube");
        let (x, y) = cube.position().expect("cube position");
        assert!(near(x, 264.0) && near(y, 152.0));
        assert_eq!(cube.value, None);
    }

    #[test]
    fn empty_board_yields_empty_snapshot() {
        let mut detector = BoardDetector::default();
        let frame = RgbaImage::from_pixel(320, 240, FELT);
        assert_eq!(detector.detect(&frame), GameStateSnapshot::default());
    }

    #[test]
    fn session_counts_frames() {
        let mut detector = BoardDetector::new(DetectorConfig {
            chunk_size: 8,
            ..Default::default()
        });
        let frame = RgbaImage::from_pixel(64, 64, FELT);
        detector.detect(&frame);
        detector.detect(&frame);
        assert_eq!(detector.frame_count(), 2);
        assert_eq!(detector.config().chunk_size, 8);
    }
}
