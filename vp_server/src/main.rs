//! Virtual poker tabletop server.
//!
//! Loads saved users and tables, serves the HTTP/WebSocket API, and writes
//! the state back periodically and once more on shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Error;
use log::{error, info};
use pico_args::Arguments;
use tokio::task::JoinHandle;
use vp_server::{api, config::ServerConfig, logging};
use vpoker::{StateFile, TableRegistry, UserRegistry};

const HELP: &str = "\
Run a virtual poker tabletop server

USAGE:
  vp_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --state      PATH        State file location         [default: env STATE_PATH or /tmp/vpoker.json]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STATE_PATH               Where users and tables are saved
  SAVE_INTERVAL_SECS       Seconds between state saves [default: 60]
  CHIPS_PER_COLOR          Bank chips of each color on a new table
  RUST_LOG                 Log filter (e.g., debug,hyper=warn)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let state_path: Option<PathBuf> = pargs.opt_value_from_str("--state")?;

    let config = ServerConfig::from_env(bind, state_path)?;
    config.validate()?;

    logging::init();
    info!("Starting virtual poker server at {}", config.bind);

    let state_file = StateFile::new(config.state_path.clone());
    let saved = state_file
        .load()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", config.state_path.display(), e))?;
    info!(
        "Loaded {} user(s) and {} table(s) from {}",
        saved.users.len(),
        saved.tables.len(),
        config.state_path.display()
    );

    let users = UserRegistry::from_map(saved.users);
    let tables = TableRegistry::from_tables(saved.tables, config.chips_per_color);

    let saver = spawn_periodic_save(state_file.clone(), users.clone(), tables.clone(), &config);

    let app = api::create_router(api::AppState {
        users: users.clone(),
        tables: tables.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    saver.abort();
    // Wait for the periodic task to stop before the final save
    if let Err(e) = saver.await
        && !e.is_cancelled()
    {
        error!("Periodic save task failed: {}", e);
    }
    state_file
        .save(&users, &tables)
        .await
        .map_err(|e| anyhow::anyhow!("Final save failed: {}", e))?;
    info!("State saved to {}", config.state_path.display());

    Ok(())
}

/// Rewrite the state file every `save_interval` until aborted.
fn spawn_periodic_save(
    state_file: StateFile,
    users: UserRegistry,
    tables: TableRegistry,
    config: &ServerConfig,
) -> JoinHandle<()> {
    let period = config.save_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            match state_file.save(&users, &tables).await {
                Ok(()) => log::debug!("State saved to {}", state_file.path().display()),
                Err(e) => error!("Periodic save failed: {}", e),
            }
        }
    })
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
