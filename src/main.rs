// main.rs - Tile Merge server entry point
use clap::Parser;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tile_merge::config::{ConfigStore, DEFAULT_CONFIG_FILE};
use tile_merge::leaderboard::LeaderboardDatabase;
use tile_merge::logging::setup_logging;
use tile_merge::servers::{AppState, RoomSocketServer, WebUiConfig, WebUiServer};
use tile_merge::services::{RoomManager, SessionManager};
use tile_merge::{TileMergeError, DESCRIPTION, NAME, VERSION};

const REAPER_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "tile_merge", version, about)]
struct Cli {
    /// JSON configuration file, created with defaults when missing
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Address the HTTP server binds to
    #[arg(long)]
    host: Option<String>,

    /// Port for the HTTP server
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Port for the multiplayer room websocket
    #[arg(long)]
    room_port: Option<u16>,

    /// Path to the SQLite leaderboard
    #[arg(long)]
    leaderboard: Option<String>,

    /// Log level or filter string (RUST_LOG takes precedence)
    #[arg(long)]
    log_level: Option<String>,

    /// Write rotating log files to this directory
    #[arg(long)]
    log_dir: Option<String>,
}

impl Cli {
    /// Command line values override the file, in memory only.
    fn apply_overrides(&self, store: &mut ConfigStore) -> Result<(), Box<dyn std::error::Error>> {
        let overrides = [
            ("server.host", self.host.clone().map(Value::from)),
            ("server.port", self.port.map(Value::from)),
            ("server.room_port", self.room_port.map(Value::from)),
            ("leaderboard.path", self.leaderboard.clone().map(Value::from)),
            ("logging.level", self.log_level.clone().map(Value::from)),
            ("logging.directory", self.log_dir.clone().map(Value::from)),
        ];

        let mut detached = store.clone().detached();
        for (key, value) in overrides {
            if let Some(value) = value {
                detached.set(key, value)?;
            }
        }
        *store = detached;
        Ok(())
    }
}

// ============================================================================
// FONCTION PRINCIPALE
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut store = ConfigStore::load(&cli.config)?;
    cli.apply_overrides(&mut store)?;
    let settings = store.settings()?;

    let _logger = setup_logging(&settings.logging)?;
    log::info!("🎮 {} v{} - {}", NAME, VERSION, DESCRIPTION);
    log::info!("⚙️ Configuration loaded from {}", cli.config);

    // Ensure data directory exists
    if let Some(parent) = std::path::Path::new(&settings.leaderboard.path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)?;
    }
    let leaderboard =
        LeaderboardDatabase::open(&settings.leaderboard.path, settings.leaderboard.capacity)?;
    log::info!("🏆 Leaderboard ready (db: {})", settings.leaderboard.path);

    let sessions = SessionManager::new(settings.game.target_score);
    let rooms = RoomManager::new(settings.game.clone());

    // Idle sessions are dropped in the background
    let ttl = Duration::from_secs(settings.server.session_ttl_secs);
    let reaper = sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REAPER_INTERVAL);
        loop {
            interval.tick().await;
            reaper.purge_expired(ttl).await;
        }
    });

    // Lancer le serveur de salons en arrière-plan
    let room_addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.room_port)
        .parse()
        .map_err(|e| TileMergeError::Server(format!("invalid room socket address: {e}")))?;
    tokio::spawn(async move {
        if let Err(e) = RoomSocketServer::new(rooms).start(room_addr).await {
            log::error!("❌ Room socket error: {}", e);
        }
    });

    let web_config = WebUiConfig {
        port: settings.server.port,
        host: settings.server.host.clone(),
    };
    let state = AppState {
        settings: Arc::new(settings),
        sessions,
        leaderboard,
    };

    WebUiServer::new(web_config, state).start().await?;
    Ok(())
}
