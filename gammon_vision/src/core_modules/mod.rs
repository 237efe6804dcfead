pub mod blob;
pub mod blob_detector;
pub mod chunk;
pub mod game_log;
pub mod game_state;
pub mod grid_manager;
pub mod overlay;
pub mod pips;
pub mod pixel;
pub mod regions;
pub mod shape;
