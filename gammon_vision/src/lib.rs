// THEORY:
// This file is the main entry point for the `gammon_vision` library crate.
// It exposes two layers to consumers such as the submission server and the
// board tester:
//
// - The board detector (`pipeline::BoardDetector`), which turns a camera frame
//   into a `GameStateSnapshot` of checkers, dice and the doubling cube.
// - The game log (`core_modules::game_log`), which serializes a snapshot into
//   human-readable lines and appends them to a shared file under a lock.
//
// The region partitioner and the overlay renderer sit alongside them in
// `core_modules`; both are pure functions of their inputs.

pub mod core_modules;
pub mod pipeline;

pub use core_modules::game_log::{GameLog, LogError, format_stamp, render, render_lines};
pub use core_modules::game_state::{Cube, Detection, DetectionKind, Dice, GameStateSnapshot};
pub use core_modules::overlay::draw_overlay;
pub use core_modules::regions::{Point, Side, board_points};
pub use pipeline::{BoardDetector, DetectorConfig};
