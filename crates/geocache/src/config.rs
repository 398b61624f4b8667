use std::env;

use thiserror::Error;

use crate::board::{LatLng, MAX_VISIBILITY_RADIUS};

pub const VISIBILITY_RADIUS_ENV_VAR: &str = "GEOCACHE_VISIBILITY_RADIUS";
pub const SPAWN_PROBABILITY_ENV_VAR: &str = "GEOCACHE_SPAWN_PROBABILITY";

/// Where a player with no stored position starts.
pub const DEFAULT_PLAYER_POSITION: LatLng = LatLng::new(37.793439, -122.410296);

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Edge length of one cell, in degrees.
    pub tile_degrees: f64,
    /// Cells in view extend this many cells from the player's cell on each axis.
    pub visibility_radius: i32,
    pub spawn_probability: f64,
    /// Generated cache values fall in `0..max_initial_value`.
    pub max_initial_value: u32,
    pub board_origin: LatLng,
    pub default_position: LatLng,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_degrees: 1e-4,
            visibility_radius: 8,
            spawn_probability: 0.1,
            max_initial_value: 100,
            board_origin: LatLng::new(0.0, 0.0),
            default_position: DEFAULT_PLAYER_POSITION,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid {var} value '{value}': {reason}")]
    InvalidEnvValue {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("tile_degrees must be finite and positive, got {0}")]
    TileDegrees(f64),
    #[error("visibility_radius must be within 0..=4096, got {0}")]
    VisibilityRadius(i32),
    #[error("spawn_probability must be within [0, 1], got {0}")]
    SpawnProbability(f64),
    #[error("{field} must be finite, got lat={lat} lng={lng}")]
    NonFinitePosition {
        field: &'static str,
        lat: f64,
        lng: f64,
    },
}

impl GameConfig {
    /// Defaults with overrides from `GEOCACHE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| env::var(var).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(VISIBILITY_RADIUS_ENV_VAR) {
            self.visibility_radius = raw
                .trim()
                .parse::<i32>()
                .map_err(|_| ConfigError::InvalidEnvValue {
                    var: VISIBILITY_RADIUS_ENV_VAR,
                    value: raw.clone(),
                    reason: "expected an integer",
                })?;
        }
        if let Some(raw) = lookup(SPAWN_PROBABILITY_ENV_VAR) {
            self.spawn_probability = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidEnvValue {
                    var: SPAWN_PROBABILITY_ENV_VAR,
                    value: raw.clone(),
                    reason: "expected a number",
                })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tile_degrees.is_finite() || self.tile_degrees <= 0.0 {
            return Err(ConfigError::TileDegrees(self.tile_degrees));
        }
        if !(0..=MAX_VISIBILITY_RADIUS).contains(&self.visibility_radius) {
            return Err(ConfigError::VisibilityRadius(self.visibility_radius));
        }
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(ConfigError::SpawnProbability(self.spawn_probability));
        }
        for (field, position) in [
            ("board_origin", self.board_origin),
            ("default_position", self.default_position),
        ] {
            if !position.lat.is_finite() || !position.lng.is_finite() {
                return Err(ConfigError::NonFinitePosition {
                    field,
                    lat: position.lat,
                    lng: position.lng,
                });
            }
        }
        Ok(())
    }
}
