use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod board;
pub mod cache;
pub mod config;
pub mod luck;
pub mod neighborhood;
pub mod persistence;
pub mod session;

pub use board::{Board, Cell, CellBounds, LatLng, MAX_CELL_INDEX, MAX_VISIBILITY_RADIUS};
pub use cache::{CacheEntity, CacheId, CacheRegistry, CacheSnapshot, Score, SnapshotStore};
pub use config::{ConfigError, GameConfig, DEFAULT_PLAYER_POSITION};
pub use luck::luck;
pub use neighborhood::{CellState, Neighborhood, NeighborhoodUpdate};
pub use persistence::{
    GameStateStore, JsonFileGameStateStore, JsonFilePositionStore, MemoryGameStateStore,
    MemoryPositionStore, PersistenceError, PositionStore, SavedGame,
};
pub use session::{
    GameSession, GeolocationError, MapLayer, MoveDirection, RejectReason, SessionNotice,
    TransferOutcome, VisibleCache,
};

/// Overrides the directory save files are written to.
pub const DATA_DIR_ENV_VAR: &str = "GEOCACHE_DATA_DIR";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("failed to create data directory at {path}: {source}")]
    CreateDataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Save directory: `GEOCACHE_DATA_DIR` when set, else `saves/` in the workspace
/// holding the executable, else `saves/` next to the executable.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let data_dir = match env::var_os(DATA_DIR_ENV_VAR) {
        Some(dir) => PathBuf::from(dir),
        None => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            default_data_dir(exe.parent().unwrap_or_else(|| Path::new(".")))
        }
    };

    fs::create_dir_all(&data_dir).map_err(|source| StartupError::CreateDataDir {
        path: data_dir.clone(),
        source,
    })?;
    Ok(AppPaths { data_dir })
}

fn default_data_dir(exe_dir: &Path) -> PathBuf {
    exe_dir
        .ancestors()
        .find(|dir| is_workspace_root(dir))
        .unwrap_or(exe_dir)
        .join("saves")
}

fn is_workspace_root(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("crates").is_dir()
}
