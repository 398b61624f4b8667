use std::env;
use std::path::PathBuf;

use geocache::{
    resolve_app_paths, ConfigError, GameConfig, GameSession, JsonFileGameStateStore,
    JsonFilePositionStore, StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub(crate) struct AppWiring {
    pub(crate) session: GameSession,
    pub(crate) script_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Geocache Startup ===");

    let config = GameConfig::from_env()?;
    let app_paths = resolve_app_paths()?;
    info!(
        data_dir = %app_paths.data_dir.display(),
        visibility_radius = config.visibility_radius,
        spawn_probability = config.spawn_probability,
        "startup"
    );

    let position_store =
        JsonFilePositionStore::in_dir(&app_paths.data_dir, config.default_position);
    let game_state_store = JsonFileGameStateStore::in_dir(&app_paths.data_dir);
    let session = GameSession::with_game_state(
        config,
        Box::new(position_store),
        Box::new(game_state_store),
    );

    Ok(AppWiring {
        session,
        script_path: env::args_os().nth(1).map(PathBuf::from),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
