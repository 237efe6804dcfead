// THEORY:
// The game log is the only persisted state in the system: a shared, append-only
// UTF-8 text file that gets one block of lines per submitted snapshot. This module
// has two halves.
//
// 1.  **Serialization** (`render_lines` / `render`): a pure function from a
//     snapshot and a stamp to an ordered list of lines. Section headers carry the
//     `[stamp] ` prefix, detail lines are indented without it, and the block ends
//     with an empty line. Coordinates are rounded half-up to integers and absent
//     optional values (pip count, cube value) print as `?`.
// 2.  **Appending** (`GameLog`): the rendered block is appended to the file while
//     holding an exclusive advisory lock, so that blocks from concurrent writers
//     never interleave. Lock acquisition polls with a deadline instead of blocking
//     forever. The block goes out in a single write; if that write fails the file is
//     truncated back to its previous length, so a call either lands completely or
//     not at all.

use crate::core_modules::game_state::{Detection, GameStateSnapshot};
use chrono::{DateTime, NaiveDateTime};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

const UNKNOWN: &str = "?";
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const LOCAL_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(5);

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Error)]
pub enum LogError {
    #[error("timed out after {waited:?} waiting for the lock on {path}")]
    LockTimeout { path: PathBuf, waited: Duration },
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Rounds half-up: `120.5 -> 121`, `-0.5 -> 0`.
pub fn round_coord(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Converts an ISO 8601 timestamp into the log stamp `YYYY-MM-DD HH:MM:SS`,
/// keeping the wall-clock time of the timestamp's own offset. A timestamp
/// without an offset is taken as written.
pub fn format_stamp(iso8601: &str) -> Result<String, LogError> {
    let trimmed = iso8601.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.format(STAMP_FORMAT).to_string());
    }
    let local = NaiveDateTime::parse_from_str(trimmed, LOCAL_ISO_FORMAT).map_err(|source| LogError::Timestamp {
        value: iso8601.to_string(),
        source,
    })?;
    Ok(local.format(STAMP_FORMAT).to_string())
}

fn die_line(color: &str, die: &Detection) -> String {
    let pips = die.pips.map_or_else(|| UNKNOWN.to_string(), |p| p.to_string());
    format!(
        "  - {color} Die: {pips} pips at (x:{}, y:{})",
        round_coord(die.x),
        round_coord(die.y)
    )
}

/// Renders a snapshot into its ordered log lines, ending with an empty line.
pub fn render_lines(snapshot: &GameStateSnapshot, stamp: &str) -> Vec<String> {
    let mut lines = Vec::with_capacity(snapshot.checkers.len() + 8);

    lines.push(format!("[{stamp}] === CHECKERS === ({} found)", snapshot.checkers.len()));
    for checker in &snapshot.checkers {
        lines.push(format!(
            "  - Checker at position (x:{}, y:{})",
            round_coord(checker.x),
            round_coord(checker.y)
        ));
    }

    lines.push(format!("[{stamp}] === DICE ==="));
    if let Some(red) = &snapshot.dice.red {
        lines.push(die_line("Red", red));
    }
    if let Some(white) = &snapshot.dice.white {
        lines.push(die_line("White", white));
    }

    if let Some(cube) = &snapshot.cube {
        if let Some((x, y)) = cube.position() {
            let value = cube.value.map_or_else(|| UNKNOWN.to_string(), |v| v.to_string());
            lines.push(format!("[{stamp}] === DOUBLING CUBE ==="));
            lines.push(format!(
                "  - Cube at (x:{}, y:{}), value: {value}",
                round_coord(x),
                round_coord(y)
            ));
        }
    }

    lines.push(String::new());
    lines
}

/// Renders a snapshot into one newline-terminated block.
pub fn render(snapshot: &GameStateSnapshot, stamp: &str) -> String {
    let mut block = render_lines(snapshot, stamp).join("\n");
    block.push('\n');
    block
}

/// A shared, append-only log file guarded by an exclusive advisory lock.
#[derive(Debug, Clone)]
pub struct GameLog {
    path: PathBuf,
    lock_timeout: Duration,
}

impl GameLog {
    pub fn new(path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            lock_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders `snapshot` and appends it. Returns the number of lines written.
    pub fn append_snapshot(&self, snapshot: &GameStateSnapshot, stamp: &str) -> Result<usize, LogError> {
        let block = render(snapshot, stamp);
        self.append(&block)?;
        Ok(block.lines().count())
    }

    /// Appends `block` as a single all-or-nothing write under the file lock.
    pub fn append(&self, block: &str) -> Result<(), LogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;

        self.lock(&file)?;
        let result = self.write_locked(&file, block.as_bytes());
        // The block is already on disk; closing the file drops the lock anyway.
        if let Err(err) = FileExt::unlock(&file) {
            tracing::warn!(path = %self.path.display(), %err, "could not release log lock");
        }
        result?;

        tracing::info!(path = %self.path.display(), bytes = block.len(), "appended game state");
        Ok(())
    }

    fn lock(&self, file: &File) -> Result<(), LogError> {
        let started = Instant::now();
        let mut contended = false;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                    if !contended {
                        tracing::debug!(path = %self.path.display(), "log file locked by another writer");
                        contended = true;
                    }
                    let waited = started.elapsed();
                    if waited >= self.lock_timeout {
                        tracing::warn!(path = %self.path.display(), ?waited, "gave up waiting for log lock");
                        return Err(LogError::LockTimeout {
                            path: self.path.clone(),
                            waited,
                        });
                    }
                    std::thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(source) => return Err(self.io_error(source)),
            }
        }
    }

    fn write_locked(&self, file: &File, bytes: &[u8]) -> Result<(), LogError> {
        let original_len = file.metadata().map_err(|source| self.io_error(source))?.len();
        let mut out = file;
        self.write_or_roll_back(
            original_len,
            || {
                out.write_all(bytes)?;
                out.flush()?;
                file.sync_data()
            },
            |len| file.set_len(len),
        )
    }

    /// Runs `write`; on failure calls `roll_back` with the pre-write length.
    fn write_or_roll_back(
        &self,
        original_len: u64,
        write: impl FnOnce() -> std::io::Result<()>,
        roll_back: impl FnOnce(u64) -> std::io::Result<()>,
    ) -> Result<(), LogError> {
        if let Err(source) = write() {
            if let Err(rollback) = roll_back(original_len) {
                tracing::error!(path = %self.path.display(), %rollback, "could not roll back partial append");
            }
            return Err(self.io_error(source));
        }
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::game_state::{Cube, Dice, DetectionKind};
    use std::sync::{Arc, Barrier};

    const STAMP: &str = "2025-10-26 15:22:41";

    fn example_snapshot() -> GameStateSnapshot {
        GameStateSnapshot {
            checkers: vec![Detection::checker(120.0, 340.0, 20.0), Detection::checker(180.0, 290.0, 20.0)],
            dice: Dice {
                red: Some(Detection::die(DetectionKind::RedDie, 150.0, 200.0, 15.0, Some(6))),
                white: None,
            },
            cube: Some(Cube {
                x: Some(50.0),
                y: Some(300.0),
                value: Some(1),
            }),
            timestamp: None,
        }
    }

    #[test]
    fn renders_example_block_exactly() {
        let expected = "\
[2025-10-26 15:22:41] === CHECKERS === (2 found)
  - Checker at position (x:120, y:340)
  - Checker at position (x:180, y:290)
[2025-10-26 15:22:41] === DICE ===
  - Red Die: 6 pips at (x:150, y:200)
[2025-10-26 15:22:41] === DOUBLING CUBE ===
  - Cube at (x:50, y:300), value: 1

";
        assert_eq!(render(&example_snapshot(), STAMP), expected);
    }

    #[test]
    fn empty_snapshot_has_zero_header_and_trailing_blank() {
        let lines = render_lines(&GameStateSnapshot::default(), STAMP);
        assert_eq!(
            lines,
            vec![
                format!("[{STAMP}] === CHECKERS === (0 found)"),
                format!("[{STAMP}] === DICE ==="),
                String::new(),
            ]
        );
    }

    #[test]
    fn rounds_half_up() {
        let snapshot = GameStateSnapshot {
            checkers: vec![Detection::checker(120.4, 339.6, 0.0)],
            ..Default::default()
        };
        let lines = render_lines(&snapshot, STAMP);
        assert_eq!(lines[1], "  - Checker at position (x:120, y:340)");
        assert_eq!(round_coord(2.5), 3);
        assert_eq!(round_coord(-0.5), 0);
        assert_eq!(round_coord(-1.6), -2);
    }

    #[test]
    fn unknown_values_print_as_placeholder() {
        let snapshot = GameStateSnapshot {
            dice: Dice {
                red: None,
                white: Some(Detection::die(DetectionKind::WhiteDie, 10.0, 20.0, 5.0, None)),
            },
            cube: Some(Cube {
                x: Some(1.0),
                y: Some(2.0),
                value: None,
            }),
            ..Default::default()
        };
        let lines = render_lines(&snapshot, STAMP);
        assert_eq!(lines[2], "  - White Die: ? pips at (x:10, y:20)");
        assert_eq!(lines[4], "  - Cube at (x:1, y:2), value: ?");
    }

    #[test]
    fn cube_without_coordinates_is_skipped() {
        let snapshot = GameStateSnapshot {
            cube: Some(Cube {
                x: Some(1.0),
                y: None,
                value: Some(2),
            }),
            ..Default::default()
        };
        let block = render(&snapshot, STAMP);
        assert!(!block.contains("DOUBLING CUBE"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let snapshot = example_snapshot();
        assert_eq!(render(&snapshot, STAMP), render(&snapshot, STAMP));
    }

    #[test]
    fn formats_iso8601_stamps() {
        assert_eq!(format_stamp("2025-10-26T15:22:41.123Z").expect("stamp"), STAMP);
        assert_eq!(format_stamp("2025-10-26T15:22:41+02:00").expect("stamp"), STAMP);
        assert_eq!(format_stamp("2025-10-26T15:22:41").expect("stamp"), STAMP);
        assert_eq!(format_stamp("2025-10-26T15:22:41.750").expect("stamp"), STAMP);
        assert!(matches!(format_stamp("yesterday"), Err(LogError::Timestamp { .. })));
        assert!(matches!(format_stamp("2025-10-26"), Err(LogError::Timestamp { .. })));
    }

    #[test]
    fn appends_blocks_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = GameLog::new(dir.path().join("game_log.txt"), DEFAULT_LOCK_TIMEOUT);

        let written = log.append_snapshot(&example_snapshot(), STAMP).expect("first append");
        assert_eq!(written, 8);
        log.append_snapshot(&GameStateSnapshot::default(), STAMP).expect("second append");

        let contents = std::fs::read_to_string(log.path()).expect("read log");
        let expected = format!(
            "{}{}",
            render(&example_snapshot(), STAMP),
            render(&GameStateSnapshot::default(), STAMP)
        );
        assert_eq!(contents, expected);
    }

    #[test]
    fn times_out_while_another_writer_holds_the_lock() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("game_log.txt");
        let holder = File::create(&path).expect("create log");
        holder.lock_exclusive().expect("hold lock");

        let log = GameLog::new(&path, Duration::from_millis(50));
        let err = log.append("x\n").expect_err("lock should time out");
        assert!(matches!(err, LogError::LockTimeout { .. }));
        assert_eq!(std::fs::read_to_string(&path).expect("read log"), "");

        FileExt::unlock(&holder).expect("release lock");
        log.append("x\n").expect("append after release");
    }

    #[test]
    fn failed_write_is_rolled_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("game_log.txt");
        let log = GameLog::new(&path, DEFAULT_LOCK_TIMEOUT);
        log.append("first\n").expect("first append");

        let file = OpenOptions::new().append(true).open(&path).expect("open log");
        let original_len = file.metadata().expect("metadata").len();
        let mut out = &file;
        let err = log
            .write_or_roll_back(
                original_len,
                || {
                    out.write_all(b"[half a blo")?;
                    Err(std::io::Error::other("disk full"))
                },
                |len| file.set_len(len),
            )
            .expect_err("write should fail");

        assert!(matches!(err, LogError::Io { .. }));
        assert_eq!(std::fs::read_to_string(&path).expect("read log"), "first\n");
    }

    #[test]
    fn lock_is_released_after_append() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("game_log.txt");
        let log = GameLog::new(&path, DEFAULT_LOCK_TIMEOUT);
        log.append("x\n").expect("append");

        let other = File::open(&path).expect("open log");
        other.try_lock_exclusive().expect("lock is free after append");
        FileExt::unlock(&other).expect("release lock");
    }

    #[test]
    fn concurrent_writers_never_interleave() {
        const WRITERS: usize = 8;
        const BLOCKS_PER_WRITER: usize = 25;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("game_log.txt");
        let barrier = Arc::new(Barrier::new(WRITERS));

        let handles: Vec<_> = (0..WRITERS)
            .map(|writer| {
                let log = GameLog::new(&path, Duration::from_secs(30));
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let snapshot = GameStateSnapshot {
                        checkers: (0..5).map(|i| Detection::checker(writer as f64, i as f64, 1.0)).collect(),
                        ..Default::default()
                    };
                    barrier.wait();
                    for _ in 0..BLOCKS_PER_WRITER {
                        log.append_snapshot(&snapshot, &format!("writer-{writer}"))
                            .expect("append under contention");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        let contents = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        let block_len = 5 + 3;
        assert_eq!(lines.len(), WRITERS * BLOCKS_PER_WRITER * block_len);

        for block in lines.chunks(block_len) {
            let header = block[0];
            let writer: usize = header
                .strip_prefix("[writer-")
                .and_then(|rest| rest.split(']').next())
                .and_then(|n| n.parse().ok())
                .expect("block starts with a header");
            assert!(header.ends_with("=== CHECKERS === (5 found)"));
            for line in &block[1..6] {
                assert!(line.starts_with(&format!("  - Checker at position (x:{writer}, ")));
            }
            assert_eq!(block[6], format!("[writer-{writer}] === DICE ==="));
            assert_eq!(block[7], "");
        }
    }
}
