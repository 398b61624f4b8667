use thiserror::Error;
use tracing::{info, warn};

use crate::board::{Board, Cell, CellBounds, LatLng};
use crate::cache::{CacheRegistry, Score, SnapshotStore};
use crate::config::GameConfig;
use crate::neighborhood::{CellState, Neighborhood, NeighborhoodUpdate};
use crate::persistence::{GameStateStore, PositionStore, SavedGame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    North,
    South,
    East,
    West,
}

impl MoveDirection {
    /// `(d_lat, d_lng)` for one step of `step_degrees`.
    pub fn delta(self, step_degrees: f64) -> (f64, f64) {
        match self {
            MoveDirection::North => (step_degrees, 0.0),
            MoveDirection::South => (-step_degrees, 0.0),
            MoveDirection::East => (0.0, step_degrees),
            MoveDirection::West => (0.0, -step_degrees),
        }
    }
}

/// What the map needs to draw one cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleCache {
    pub cell: Cell,
    pub bounds: CellBounds,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotVisible,
    CacheEmpty,
    NoPoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Transferred { cache_value: u32, score: Score },
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
    #[error("location request timed out")]
    Timeout,
}

/// Non-fatal messages for the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    GeolocationUnavailable(String),
    PersistenceFailed(String),
}

/// Rendering side of the game. The session wipes and redraws it wholesale.
pub trait MapLayer {
    fn clear_caches(&mut self);
    fn draw_cache(&mut self, cache: &VisibleCache);
    fn draw_player(&mut self, position: LatLng);
    fn show_score(&mut self, score: Score);
    fn show_notice(&mut self, _notice: &SessionNotice) {}
}

/// One player's game: owns the board, every cache, the captured values and the
/// stores they persist to.
pub struct GameSession {
    config: GameConfig,
    board: Board,
    registry: CacheRegistry,
    snapshots: SnapshotStore,
    neighborhood: Neighborhood,
    score: Score,
    position: LatLng,
    position_store: Box<dyn PositionStore>,
    game_state_store: Option<Box<dyn GameStateStore>>,
    pending_notices: Vec<SessionNotice>,
}

impl GameSession {
    pub fn new(config: GameConfig, position_store: Box<dyn PositionStore>) -> Self {
        Self::build(config, position_store, None)
    }

    pub fn with_game_state(
        config: GameConfig,
        position_store: Box<dyn PositionStore>,
        game_state_store: Box<dyn GameStateStore>,
    ) -> Self {
        Self::build(config, position_store, Some(game_state_store))
    }

    fn build(
        config: GameConfig,
        position_store: Box<dyn PositionStore>,
        game_state_store: Option<Box<dyn GameStateStore>>,
    ) -> Self {
        let position = position_store.load();
        let saved = game_state_store.as_ref().and_then(|store| store.load());
        let (score, snapshots) = match saved {
            Some(game) => (
                Score::new(game.score),
                SnapshotStore::from_snapshots(game.snapshots),
            ),
            None => (Score::ZERO, SnapshotStore::new()),
        };

        let mut session = Self {
            board: Board::new(
                config.tile_degrees,
                config.visibility_radius,
                config.board_origin,
            ),
            registry: CacheRegistry::new(config.max_initial_value),
            snapshots,
            neighborhood: Neighborhood::new(),
            score,
            position,
            position_store,
            game_state_store,
            pending_notices: Vec::new(),
            config,
        };
        let update = session.refresh_neighborhood();
        info!(
            lat = position.lat,
            lng = position.lng,
            score = session.score.get(),
            snapshots = session.snapshots.len(),
            visible_caches = update.spawned.len() + update.restored.len(),
            "session_started"
        );
        session
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn player_cell(&self) -> Option<Cell> {
        self.neighborhood.center()
    }

    pub fn cell_state(&self, cell: Cell) -> CellState {
        self.neighborhood.state(cell)
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn registry(&self) -> &CacheRegistry {
        &self.registry
    }

    pub fn move_player(&mut self, direction: MoveDirection) -> NeighborhoodUpdate {
        let (d_lat, d_lng) = direction.delta(self.config.tile_degrees);
        self.relocate(self.position.offset(d_lat, d_lng))
    }

    pub fn move_by(&mut self, d_lat: f64, d_lng: f64) -> Option<NeighborhoodUpdate> {
        self.teleport(self.position.offset(d_lat, d_lng))
    }

    /// Jumps straight to `position`. Non-finite coordinates are ignored.
    pub fn teleport(&mut self, position: LatLng) -> Option<NeighborhoodUpdate> {
        if !position.lat.is_finite() || !position.lng.is_finite() {
            warn!(lat = position.lat, lng = position.lng, "teleport_ignored_non_finite");
            return None;
        }
        Some(self.relocate(position))
    }

    /// Result of an asynchronous location lookup. A fix behaves like a teleport;
    /// a failure leaves the game untouched and yields a notice.
    pub fn on_geolocation(
        &mut self,
        result: Result<LatLng, GeolocationError>,
    ) -> Result<NeighborhoodUpdate, SessionNotice> {
        let notice = match result {
            Ok(position) => match self.teleport(position) {
                Some(update) => return Ok(update),
                None => SessionNotice::GeolocationUnavailable(
                    "location fix was not a finite coordinate".to_string(),
                ),
            },
            Err(error) => SessionNotice::GeolocationUnavailable(error.to_string()),
        };
        warn!(?notice, "geolocation_failed");
        self.pending_notices.push(notice.clone());
        Err(notice)
    }

    /// Starts over: no points, every cache back to its generated value, no
    /// captured values, player at the default position.
    pub fn reset(&mut self) -> NeighborhoodUpdate {
        self.score = Score::ZERO;
        self.snapshots.clear();
        self.registry.reset_all();
        self.neighborhood.clear();
        if let Some(store) = self.game_state_store.as_mut() {
            if let Err(error) = store.clear() {
                warn!(error = %error, "game_state_clear_failed");
                self.pending_notices
                    .push(SessionNotice::PersistenceFailed(error.to_string()));
            }
        }
        info!("session_reset");
        self.relocate(self.config.default_position)
    }

    /// Takes one point from the visible cache at `cell`.
    pub fn poke(&mut self, cell: Cell) -> TransferOutcome {
        let Some(id) = self.neighborhood.visible_cache(cell) else {
            return TransferOutcome::Rejected(RejectReason::NotVisible);
        };
        if !self.registry.poke(id, &mut self.score) {
            return TransferOutcome::Rejected(RejectReason::CacheEmpty);
        }
        self.persist_game_state();
        TransferOutcome::Transferred {
            cache_value: self.registry.value(id).unwrap_or_default(),
            score: self.score,
        }
    }

    /// Puts one of the player's points into the visible cache at `cell`.
    pub fn place(&mut self, cell: Cell) -> TransferOutcome {
        let Some(id) = self.neighborhood.visible_cache(cell) else {
            return TransferOutcome::Rejected(RejectReason::NotVisible);
        };
        if !self.registry.place(id, &mut self.score) {
            return TransferOutcome::Rejected(RejectReason::NoPoints);
        }
        self.persist_game_state();
        TransferOutcome::Transferred {
            cache_value: self.registry.value(id).unwrap_or_default(),
            score: self.score,
        }
    }

    pub fn visible_caches(&self) -> Vec<VisibleCache> {
        self.neighborhood
            .visible_caches()
            .filter_map(|(cell, id)| {
                self.registry.value(id).map(|value| VisibleCache {
                    cell,
                    bounds: self.board.cell_bounds(&cell),
                    value,
                })
            })
            .collect()
    }

    pub fn render(&mut self, layer: &mut dyn MapLayer) {
        layer.clear_caches();
        for cache in self.visible_caches() {
            layer.draw_cache(&cache);
        }
        layer.draw_player(self.position);
        layer.show_score(self.score);
        for notice in self.pending_notices.drain(..) {
            layer.show_notice(&notice);
        }
    }

    /// Everything needed to resume this game later: captured values plus the
    /// live values of caches still in view.
    pub fn saved_game(&self) -> SavedGame {
        let mut snapshots = self.snapshots.clone();
        for (cell, _) in self.neighborhood.visible_caches() {
            snapshots.save(&self.registry, cell);
        }
        SavedGame::new(self.score.get(), snapshots.iter().copied().collect())
    }

    fn relocate(&mut self, position: LatLng) -> NeighborhoodUpdate {
        self.position = position;
        if let Err(error) = self.position_store.save(position) {
            warn!(error = %error, "player_position_save_failed");
            self.pending_notices
                .push(SessionNotice::PersistenceFailed(error.to_string()));
        }
        let update = self.refresh_neighborhood();
        self.persist_game_state();
        update
    }

    fn refresh_neighborhood(&mut self) -> NeighborhoodUpdate {
        self.neighborhood.update(
            self.position,
            &mut self.board,
            &mut self.registry,
            &mut self.snapshots,
            self.config.spawn_probability,
        )
    }

    fn persist_game_state(&mut self) {
        if self.game_state_store.is_none() {
            return;
        }
        let game = self.saved_game();
        let Some(store) = self.game_state_store.as_mut() else {
            return;
        };
        if let Err(error) = store.save(&game) {
            warn!(error = %error, "game_state_save_failed");
            self.pending_notices
                .push(SessionNotice::PersistenceFailed(error.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use std::fs;

    use crate::board::MAX_CELL_INDEX;
    use crate::cache::CacheSnapshot;
    use crate::luck::{initial_value, spawns_cache};
    use crate::persistence::{
        JsonFileGameStateStore, JsonFilePositionStore, MemoryGameStateStore, MemoryPositionStore,
        PersistenceError,
    };

    const TILE: f64 = 1e-4;

    fn test_config(radius: i32, spawn_probability: f64) -> GameConfig {
        GameConfig {
            visibility_radius: radius,
            spawn_probability,
            default_position: LatLng::new(0.5 * TILE, 0.5 * TILE),
            ..GameConfig::default()
        }
    }

    fn memory_session(radius: i32, spawn_probability: f64) -> GameSession {
        let config = test_config(radius, spawn_probability);
        let store = MemoryPositionStore::new(config.default_position);
        GameSession::new(config, Box::new(store))
    }

    fn file_session(dir: &TempDir, radius: i32) -> GameSession {
        let config = test_config(radius, 1.0);
        GameSession::with_game_state(
            config.clone(),
            Box::new(JsonFilePositionStore::in_dir(dir.path(), config.default_position)),
            Box::new(JsonFileGameStateStore::in_dir(dir.path())),
        )
    }

    fn value_of(session: &GameSession, cell: Cell) -> Option<u32> {
        session
            .visible_caches()
            .into_iter()
            .find(|cache| cache.cell == cell)
            .map(|cache| cache.value)
    }

    fn points_from_first_nonempty(session: &mut GameSession, points: u32) -> Cell {
        let cell = session
            .visible_caches()
            .into_iter()
            .find(|cache| cache.value >= points)
            .map(|cache| cache.cell)
            .expect("cache with enough points");
        for _ in 0..points {
            assert!(matches!(
                session.poke(cell),
                TransferOutcome::Transferred { .. }
            ));
        }
        cell
    }

    #[derive(Default)]
    struct RecordingLayer {
        clears: usize,
        caches: Vec<VisibleCache>,
        player: Option<LatLng>,
        score: Option<Score>,
        notices: Vec<SessionNotice>,
    }

    impl MapLayer for RecordingLayer {
        fn clear_caches(&mut self) {
            self.clears += 1;
            self.caches.clear();
        }

        fn draw_cache(&mut self, cache: &VisibleCache) {
            self.caches.push(*cache);
        }

        fn draw_player(&mut self, position: LatLng) {
            self.player = Some(position);
        }

        fn show_score(&mut self, score: Score) {
            self.score = Some(score);
        }

        fn show_notice(&mut self, notice: &SessionNotice) {
            self.notices.push(notice.clone());
        }
    }

    struct FailingPositionStore;

    impl PositionStore for FailingPositionStore {
        fn load(&self) -> LatLng {
            LatLng::new(0.5 * TILE, 0.5 * TILE)
        }

        fn save(&mut self, _position: LatLng) -> Result<(), PersistenceError> {
            Err(PersistenceError::Validation {
                message: "read-only".to_string(),
            })
        }
    }

    #[test]
    fn new_session_starts_at_default_position_with_square_in_view() {
        let session = memory_session(2, 0.5);
        assert_eq!(session.position(), session.config().default_position);
        assert_eq!(session.player_cell(), Some(Cell { i: 0, j: 0 }));
        assert_eq!(session.score(), Score::ZERO);

        for i in -2..=2 {
            for j in -2..=2 {
                let cell = Cell { i, j };
                let expected = if spawns_cache(cell, 0.5) {
                    CellState::VisibleSpawned
                } else {
                    CellState::VisibleEmpty
                };
                assert_eq!(session.cell_state(cell), expected, "cell {i},{j}");
            }
        }
    }

    #[test]
    fn each_step_moves_exactly_one_cell() {
        let mut session = memory_session(1, 0.5);
        let steps = [
            (MoveDirection::North, Cell { i: 1, j: 0 }),
            (MoveDirection::East, Cell { i: 1, j: 1 }),
            (MoveDirection::South, Cell { i: 0, j: 1 }),
            (MoveDirection::West, Cell { i: 0, j: 0 }),
        ];
        for (direction, expected) in steps {
            let update = session.move_player(direction);
            assert_eq!(update.center_cell, Some(expected), "{direction:?}");
        }
    }

    #[test]
    fn poke_and_place_transfer_points_with_visible_caches() {
        let mut session = memory_session(2, 1.0);
        let cell = points_from_first_nonempty(&mut session, 1);
        assert_eq!(session.score(), Score::new(1));
        let before = value_of(&session, cell).expect("visible");

        let outcome = session.place(cell);
        assert_eq!(
            outcome,
            TransferOutcome::Transferred {
                cache_value: before + 1,
                score: Score::ZERO,
            }
        );
        assert_eq!(
            session.place(cell),
            TransferOutcome::Rejected(RejectReason::NoPoints)
        );
    }

    #[test]
    fn poking_an_empty_cache_changes_nothing() {
        let mut session = memory_session(2, 1.0);
        let cell = session.visible_caches()[0].cell;
        while value_of(&session, cell) != Some(0) {
            session.poke(cell);
        }
        let score = session.score();

        assert_eq!(
            session.poke(cell),
            TransferOutcome::Rejected(RejectReason::CacheEmpty)
        );
        assert_eq!(session.score(), score);
        assert_eq!(value_of(&session, cell), Some(0));
    }

    #[test]
    fn caches_out_of_view_cannot_be_touched() {
        let mut session = memory_session(1, 1.0);
        let far = Cell { i: 50, j: 50 };
        assert_eq!(
            session.poke(far),
            TransferOutcome::Rejected(RejectReason::NotVisible)
        );
        assert_eq!(
            session.place(far),
            TransferOutcome::Rejected(RejectReason::NotVisible)
        );
    }

    #[test]
    fn walking_away_and_back_keeps_mutated_value() {
        let mut session = memory_session(1, 1.0);
        let cell = points_from_first_nonempty(&mut session, 1);
        let mutated = value_of(&session, cell);

        for _ in 0..4 {
            session.move_player(MoveDirection::North);
        }
        assert_eq!(session.cell_state(cell), CellState::SavedOffscreen);
        assert_eq!(
            session.snapshots().get(cell).map(|snapshot| snapshot.value),
            mutated
        );

        for _ in 0..4 {
            session.move_player(MoveDirection::South);
        }
        assert_eq!(value_of(&session, cell), mutated);
    }

    #[test]
    fn reset_clears_points_snapshots_and_position() {
        let mut session = memory_session(1, 1.0);
        let cell = points_from_first_nonempty(&mut session, 1);
        let max = session
            .registry()
            .get(cell)
            .and_then(|id| session.registry().entity(id))
            .map(|cache| cache.max_value());
        session.teleport(LatLng::new(1.0, 1.0));
        assert!(!session.snapshots().is_empty());

        session.reset();
        assert_eq!(session.score(), Score::ZERO);
        assert!(session.snapshots().is_empty());
        assert_eq!(session.position(), session.config().default_position);
        assert_eq!(value_of(&session, cell), max);
    }

    #[test]
    fn non_finite_teleport_is_ignored() {
        let mut session = memory_session(1, 0.5);
        let before = session.position();
        assert_eq!(session.teleport(LatLng::new(f64::NAN, 0.0)), None);
        assert_eq!(session.position(), before);
    }

    #[test]
    fn geolocation_fix_teleports_and_failure_only_notifies() {
        let mut session = memory_session(1, 0.5);
        let target = LatLng::new(10.5 * TILE, -3.5 * TILE);
        let update = session.on_geolocation(Ok(target)).expect("fix");
        assert_eq!(update.center_cell, Some(Cell { i: 10, j: -4 }));
        assert_eq!(session.position(), target);

        let notice = session
            .on_geolocation(Err(GeolocationError::PermissionDenied))
            .expect_err("denied");
        assert_eq!(
            notice,
            SessionNotice::GeolocationUnavailable("location permission denied".to_string())
        );
        assert_eq!(session.position(), target);
    }

    #[test]
    fn render_wipes_and_redraws_visible_caches() {
        let mut session = memory_session(1, 1.0);
        session.on_geolocation(Err(GeolocationError::Timeout)).ok();
        let mut layer = RecordingLayer::default();

        session.render(&mut layer);
        session.render(&mut layer);

        assert_eq!(layer.clears, 2);
        assert_eq!(layer.caches.len(), 9);
        assert_eq!(layer.player, Some(session.position()));
        assert_eq!(layer.score, Some(Score::ZERO));
        assert_eq!(layer.notices.len(), 1);
        let first = layer.caches[0];
        assert_eq!(first.cell, Cell { i: -1, j: -1 });
        assert!(first.bounds.contains(LatLng::new(-0.5 * TILE, -0.5 * TILE)));
    }

    #[test]
    fn failed_position_write_surfaces_a_notice() {
        let config = test_config(0, 0.5);
        let mut session = GameSession::new(config, Box::new(FailingPositionStore));
        session.move_player(MoveDirection::East);
        let mut layer = RecordingLayer::default();
        session.render(&mut layer);

        assert!(matches!(
            layer.notices.as_slice(),
            [SessionNotice::PersistenceFailed(_), ..]
        ));
        assert_eq!(session.player_cell(), Some(Cell { i: 0, j: 1 }));
    }

    #[test]
    fn restart_resumes_position_score_and_cache_values() {
        let temp = TempDir::new().expect("temp");
        let (cell, mutated, far_position) = {
            let mut session = file_session(&temp, 1);
            let cell = points_from_first_nonempty(&mut session, 2);
            let mutated = value_of(&session, cell);
            session.teleport(LatLng::new(0.5, 0.5));
            (cell, mutated, session.position())
        };

        let mut resumed = file_session(&temp, 1);
        assert_eq!(resumed.position(), far_position);
        assert_eq!(resumed.score(), Score::new(2));
        assert_eq!(
            resumed.snapshots().get(cell).map(|snapshot| snapshot.value),
            mutated
        );

        resumed.teleport(LatLng::new(0.5 * TILE, 0.5 * TILE));
        assert_eq!(value_of(&resumed, cell), mutated);
    }

    #[test]
    fn restart_keeps_values_of_caches_still_in_view() {
        let temp = TempDir::new().expect("temp");
        let (cell, mutated) = {
            let mut session = file_session(&temp, 1);
            let cell = points_from_first_nonempty(&mut session, 1);
            (cell, value_of(&session, cell))
        };

        let resumed = file_session(&temp, 1);
        assert_eq!(resumed.score(), Score::new(1));
        assert_eq!(value_of(&resumed, cell), mutated);
    }

    #[test]
    fn reset_forgets_the_saved_game() {
        let temp = TempDir::new().expect("temp");
        {
            let mut session = file_session(&temp, 1);
            points_from_first_nonempty(&mut session, 1);
            session.reset();
        }
        let resumed = file_session(&temp, 1);
        assert_eq!(resumed.score(), Score::ZERO);
        for snapshot in resumed.snapshots().iter() {
            assert_eq!(snapshot.value, initial_value(snapshot.cell, 100));
        }
    }

    #[test]
    fn move_by_shifts_position_and_ignores_non_finite_deltas() {
        let mut session = memory_session(1, 0.5);
        let update = session.move_by(2.0 * TILE, -TILE).expect("finite move");
        assert_eq!(update.center_cell, Some(Cell { i: 2, j: -1 }));
        let moved = session.position();

        assert_eq!(session.move_by(f64::INFINITY, 0.0), None);
        assert_eq!(session.move_by(0.0, f64::NAN), None);
        assert_eq!(session.position(), moved);
        assert_eq!(session.player_cell(), Some(Cell { i: 2, j: -1 }));
    }

    #[test]
    fn huge_finite_teleport_lands_on_the_edge_cell() {
        let config = GameConfig::default();
        let store = MemoryPositionStore::new(config.default_position);
        let mut session = GameSession::new(config, Box::new(store));

        let update = session
            .teleport(LatLng::new(1.0e6, 0.0))
            .expect("finite target");
        assert_eq!(update.center_cell, Some(Cell { i: MAX_CELL_INDEX, j: 0 }));
        assert_eq!(session.position(), LatLng::new(1.0e6, 0.0));
        assert_eq!(update.visible_count, 17 * 17);
        assert_eq!(
            session.visible_caches().len(),
            update.spawned.len() + update.restored.len()
        );

        session.move_player(MoveDirection::North);
        assert_eq!(session.player_cell(), Some(Cell { i: MAX_CELL_INDEX, j: 0 }));
    }

    #[test]
    fn huge_stored_position_still_starts_a_session() {
        let temp = TempDir::new().expect("temp");
        fs::write(
            temp.path().join("playerPosition.json"),
            r#"{"lat":1000000.0,"lng":0.0}"#,
        )
        .expect("write");

        let config = GameConfig::default();
        let store = JsonFilePositionStore::in_dir(temp.path(), config.default_position);
        let mut session = GameSession::new(config, Box::new(store));

        assert_eq!(session.position(), LatLng::new(1.0e6, 0.0));
        assert_eq!(session.player_cell(), Some(Cell { i: MAX_CELL_INDEX, j: 0 }));
        session.reset();
        assert_eq!(session.position(), session.config().default_position);
    }

    #[test]
    fn session_resumes_from_stored_position_and_game_state() {
        let cell = Cell { i: 0, j: 1 };
        let mut game_state = MemoryGameStateStore::new();
        game_state
            .save(&SavedGame::new(5, vec![CacheSnapshot { cell, value: 0 }]))
            .expect("seed");
        let config = test_config(1, 1.0);
        let start = LatLng::new(0.5 * TILE, 1.5 * TILE);
        let position = MemoryPositionStore::with_position(config.default_position, start);

        let mut session =
            GameSession::with_game_state(config, Box::new(position), Box::new(game_state));

        assert_eq!(session.position(), start);
        assert_eq!(session.score(), Score::new(5));
        assert_eq!(value_of(&session, cell), Some(0));
        assert_eq!(
            session.poke(cell),
            TransferOutcome::Rejected(RejectReason::CacheEmpty)
        );
    }
}
