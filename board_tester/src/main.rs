use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gammon_vision::core_modules::game_log::DEFAULT_LOCK_TIMEOUT;
use gammon_vision::core_modules::grid_manager::MAX_CHUNK_SIZE;
use gammon_vision::core_modules::regions::nearest_point;
use gammon_vision::{board_points, draw_overlay, render_lines, BoardDetector, DetectorConfig, GameLog};
use tracing_subscriber::EnvFilter;

/// Runs the board detector over still images.
#[derive(Debug, Parser)]
#[command(name = "board_tester", version)]
struct Args {
    /// Board photos to analyse.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Directory for `<name>_overlay.png` renderings.
    #[arg(long)]
    overlay_dir: Option<PathBuf>,
    /// Append each snapshot to this game log.
    #[arg(long)]
    log: Option<PathBuf>,
    /// Stamp for log lines; defaults to the local time.
    #[arg(long)]
    timestamp: Option<String>,
    /// Side of a detector chunk in pixels.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..=MAX_CHUNK_SIZE as i64))]
    chunk_size: u32,
    /// Milliseconds to wait for the log lock.
    #[arg(long, default_value_t = DEFAULT_LOCK_TIMEOUT.as_millis() as u64)]
    lock_timeout_ms: u64,
}

fn overlay_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("frame");
    dir.join(format!("{stem}_overlay.png"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // --- 1. Argument Parsing & Setup ---
    let args = Args::parse();
    let mut detector = BoardDetector::new(DetectorConfig {
        chunk_size: args.chunk_size,
        ..Default::default()
    });
    let log = args
        .log
        .as_ref()
        .map(|path| GameLog::new(path.clone(), Duration::from_millis(args.lock_timeout_ms)));
    if let Some(dir) = &args.overlay_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    // --- 2. Main Processing Loop ---
    for input in &args.inputs {
        let mut frame = image::open(input)
            .with_context(|| format!("opening {}", input.display()))?
            .to_rgba8();
        let snapshot = detector.detect(&frame);
        let points = board_points(frame.width() as f64, frame.height() as f64);
        for checker in &snapshot.checkers {
            if let Some(point) = nearest_point(&points, checker.x, checker.y) {
                tracing::debug!(x = checker.x, y = checker.y, point = point.index, "checker");
            }
        }

        let stamp = match &args.timestamp {
            Some(ts) => gammon_vision::format_stamp(ts).unwrap_or_else(|_| ts.clone()),
            None => chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        println!("# {}", input.display());
        for line in render_lines(&snapshot, &stamp) {
            println!("{line}");
        }

        if let Some(log) = &log {
            log.append_snapshot(&snapshot, &stamp)
                .with_context(|| format!("appending to {}", log.path().display()))?;
        }

        // --- 3. Visualization ---
        if let Some(dir) = &args.overlay_dir {
            draw_overlay(&mut frame, &snapshot, &points);
            let out = overlay_path(dir, input);
            frame.save(&out).with_context(|| format!("saving {}", out.display()))?;
            tracing::info!(output = %out.display(), "wrote overlay");
        }
    }

    tracing::info!(frames = detector.frame_count(), "processing complete");
    Ok(())
}
