use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::atomic_io::{read_text_if_present, write_text_atomic};
use super::PersistenceError;
use crate::board::LatLng;

pub const PLAYER_POSITION_RECORD: &str = "playerPosition";

/// Durable home of the player's last confirmed position.
pub trait PositionStore {
    /// Returns the stored position, or the store's default origin when nothing
    /// usable is stored.
    fn load(&self) -> LatLng;
    fn save(&mut self, position: LatLng) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone)]
pub struct MemoryPositionStore {
    default: LatLng,
    position: Option<LatLng>,
}

impl MemoryPositionStore {
    pub fn new(default: LatLng) -> Self {
        Self {
            default,
            position: None,
        }
    }

    pub fn with_position(default: LatLng, position: LatLng) -> Self {
        Self {
            default,
            position: Some(position),
        }
    }

    pub fn stored(&self) -> Option<LatLng> {
        self.position
    }
}

impl PositionStore for MemoryPositionStore {
    fn load(&self) -> LatLng {
        self.position.unwrap_or(self.default)
    }

    fn save(&mut self, position: LatLng) -> Result<(), PersistenceError> {
        self.position = Some(position);
        Ok(())
    }
}

/// Stores the position as `{"lat":..,"lng":..}` in `playerPosition.json`.
#[derive(Debug, Clone)]
pub struct JsonFilePositionStore {
    path: PathBuf,
    default: LatLng,
}

impl JsonFilePositionStore {
    pub fn in_dir(data_dir: &Path, default: LatLng) -> Self {
        Self {
            path: data_dir.join(format!("{PLAYER_POSITION_RECORD}.json")),
            default,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<LatLng>, PersistenceError> {
        let raw = read_text_if_present(&self.path).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let position = serde_json::from_str::<LatLng>(&raw).map_err(|error| {
            PersistenceError::Parse {
                path: self.path.clone(),
                message: error.to_string(),
            }
        })?;
        if !position.lat.is_finite() || !position.lng.is_finite() {
            return Err(PersistenceError::Validation {
                message: format!("non-finite position lat={} lng={}", position.lat, position.lng),
            });
        }
        Ok(Some(position))
    }
}

impl PositionStore for JsonFilePositionStore {
    fn load(&self) -> LatLng {
        let default = self.default;
        match self.read() {
            Ok(Some(position)) => {
                info!(lat = position.lat, lng = position.lng, "player_position_loaded");
                position
            }
            Ok(None) => {
                info!(lat = default.lat, lng = default.lng, "player_position_default");
                default
            }
            Err(error) => {
                warn!(error = %error, "player_position_unreadable; using default");
                default
            }
        }
    }

    fn save(&mut self, position: LatLng) -> Result<(), PersistenceError> {
        let text = serde_json::to_string(&position).map_err(|source| PersistenceError::Encode {
            path: self.path.clone(),
            source,
        })?;
        write_text_atomic(&self.path, &text).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
