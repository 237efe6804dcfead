use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use gammon_vision::core_modules::grid_manager::MAX_CHUNK_SIZE;
use gammon_vision::DetectorConfig;
use gammon_vision_server::{start_server, ServerConfig};
use tracing_subscriber::EnvFilter;

/// Serves the Gammon Vision browser client and the game-state log endpoint.
#[derive(Debug, Parser)]
#[command(name = "gammon-vision-server", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "GV_BIND", default_value = "127.0.0.1:3001")]
    bind: String,
    /// Shared append-only log file.
    #[arg(long, env = "GV_LOG_PATH", default_value = "game_log.txt")]
    log_path: PathBuf,
    /// How long an append waits for the file lock before failing.
    #[arg(long, env = "GV_LOCK_TIMEOUT_MS", default_value_t = 2000)]
    lock_timeout_ms: u64,
    /// Side of a detector chunk in pixels.
    #[arg(long, env = "GV_CHUNK_SIZE", default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..=MAX_CHUNK_SIZE as i64))]
    chunk_size: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = ServerConfig {
        bind_addr: args.bind,
        log_path: args.log_path,
        lock_timeout: Duration::from_millis(args.lock_timeout_ms),
        detector: DetectorConfig {
            chunk_size: args.chunk_size,
            ..Default::default()
        },
    };

    let handle = start_server(cfg).await?;
    // Park forever
    handle.await?;
    Ok(())
}
