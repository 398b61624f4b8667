use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::atomic_io::{read_text_if_present, write_text_atomic};
use super::PersistenceError;
use crate::cache::CacheSnapshot;

pub const SAVE_VERSION: u32 = 1;
pub const GAME_STATE_RECORD: &str = "gameState";

/// Score and offscreen cache values carried across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    pub save_version: u32,
    pub score: u32,
    pub snapshots: Vec<CacheSnapshot>,
}

impl SavedGame {
    pub fn new(score: u32, snapshots: Vec<CacheSnapshot>) -> Self {
        Self {
            save_version: SAVE_VERSION,
            score,
            snapshots,
        }
    }
}

pub trait GameStateStore {
    /// `None` means there is no usable save and the session starts fresh.
    fn load(&self) -> Option<SavedGame>;
    fn save(&mut self, game: &SavedGame) -> Result<(), PersistenceError>;
    fn clear(&mut self) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryGameStateStore {
    game: Option<SavedGame>,
}

impl MemoryGameStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> Option<&SavedGame> {
        self.game.as_ref()
    }
}

impl GameStateStore for MemoryGameStateStore {
    fn load(&self) -> Option<SavedGame> {
        self.game.clone()
    }

    fn save(&mut self, game: &SavedGame) -> Result<(), PersistenceError> {
        self.game = Some(game.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        self.game = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileGameStateStore {
    path: PathBuf,
}

impl JsonFileGameStateStore {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{GAME_STATE_RECORD}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<SavedGame>, PersistenceError> {
        let raw = read_text_if_present(&self.path).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let game = parse_saved_game_json(&self.path, &raw)?;
        validate_saved_game(&game)?;
        Ok(Some(game))
    }
}

impl GameStateStore for JsonFileGameStateStore {
    fn load(&self) -> Option<SavedGame> {
        match self.read() {
            Ok(Some(game)) => {
                info!(
                    score = game.score,
                    snapshots = game.snapshots.len(),
                    "game_state_loaded"
                );
                Some(game)
            }
            Ok(None) => None,
            Err(error) => {
                warn!(error = %error, "game_state_unreadable; starting fresh");
                None
            }
        }
    }

    fn save(&mut self, game: &SavedGame) -> Result<(), PersistenceError> {
        let text =
            serde_json::to_string_pretty(game).map_err(|source| PersistenceError::Encode {
                path: self.path.clone(),
                source,
            })?;
        write_text_atomic(&self.path, &text).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistenceError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn parse_saved_game_json(path: &Path, raw: &str) -> Result<SavedGame, PersistenceError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SavedGame>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        let source = error.into_inner();
        let message = if json_path.is_empty() || json_path == "." {
            source.to_string()
        } else {
            format!("at {json_path}: {source}")
        };
        PersistenceError::Parse {
            path: path.to_path_buf(),
            message,
        }
    })
}

fn validate_saved_game(game: &SavedGame) -> Result<(), PersistenceError> {
    if game.save_version != SAVE_VERSION {
        return Err(PersistenceError::Validation {
            message: format!(
                "save_version: expected {SAVE_VERSION}, got {}",
                game.save_version
            ),
        });
    }

    let mut seen = HashSet::with_capacity(game.snapshots.len());
    for (index, snapshot) in game.snapshots.iter().enumerate() {
        if !seen.insert(snapshot.cell) {
            return Err(PersistenceError::Validation {
                message: format!(
                    "snapshots[{index}]: duplicate cell {},{}",
                    snapshot.cell.i, snapshot.cell.j
                ),
            });
        }
    }
    Ok(())
}
