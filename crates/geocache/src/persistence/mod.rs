mod atomic_io;
mod position;
mod save_game;

use std::path::PathBuf;

use thiserror::Error;

pub use position::{
    JsonFilePositionStore, MemoryPositionStore, PositionStore, PLAYER_POSITION_RECORD,
};
pub use save_game::{
    GameStateStore, JsonFileGameStateStore, MemoryGameStateStore, SavedGame, GAME_STATE_RECORD,
    SAVE_VERSION,
};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read/write file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode record for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("record at {path} is not valid json: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("validation failed: {message}")]
    Validation { message: String },
}
