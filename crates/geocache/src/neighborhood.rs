use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::board::{Board, Cell, LatLng};
use crate::cache::{CacheId, CacheRegistry, SnapshotStore};
use crate::luck::spawns_cache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Unknown,
    VisibleSpawned,
    VisibleEmpty,
    SavedOffscreen,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborhoodUpdate {
    pub center_cell: Option<Cell>,
    /// Caches that left view and had their value captured.
    pub saved: Vec<Cell>,
    /// Caches that re-entered view with their captured value.
    pub restored: Vec<Cell>,
    /// Caches that entered view with no capture on record.
    pub spawned: Vec<Cell>,
    pub visible_count: usize,
}

/// Tracks which cells are in view of the player and which caches they hold.
#[derive(Debug, Default)]
pub struct Neighborhood {
    center: Option<Cell>,
    visible: BTreeMap<Cell, Option<CacheId>>,
    offscreen: BTreeSet<Cell>,
}

impl Neighborhood {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the visible square around `center`.
    ///
    /// Caches leaving view are saved before anything new is spawned or
    /// restored, so an offscreen mutation is never overwritten by the same
    /// update that hides it.
    pub fn update(
        &mut self,
        center: LatLng,
        board: &mut Board,
        registry: &mut CacheRegistry,
        snapshots: &mut SnapshotStore,
        spawn_probability: f64,
    ) -> NeighborhoodUpdate {
        let center_cell = *board.cell_for_point(center);
        let cells = board.cells_near_point(center);
        let in_range: BTreeSet<Cell> = cells.iter().map(|cell| **cell).collect();

        let mut update = NeighborhoodUpdate {
            center_cell: Some(center_cell),
            ..NeighborhoodUpdate::default()
        };

        for (cell, cache) in &self.visible {
            if cache.is_some() && !in_range.contains(cell) {
                snapshots.save(registry, *cell);
                self.offscreen.insert(*cell);
                update.saved.push(*cell);
            }
        }

        let previous = std::mem::take(&mut self.visible);
        for cell in cells {
            let cell = *cell;
            if !spawns_cache(cell, spawn_probability) {
                self.visible.insert(cell, None);
                continue;
            }

            let id = registry.get_or_create(cell);
            if !previous.contains_key(&cell) {
                if snapshots.restore(registry, cell) {
                    update.restored.push(cell);
                } else {
                    update.spawned.push(cell);
                }
            }
            self.offscreen.remove(&cell);
            self.visible.insert(cell, Some(id));
        }

        self.center = Some(center_cell);
        update.visible_count = self.visible.len();
        debug!(
            i = center_cell.i,
            j = center_cell.j,
            visible = update.visible_count,
            saved = update.saved.len(),
            restored = update.restored.len(),
            spawned = update.spawned.len(),
            "neighborhood_updated"
        );
        update
    }

    pub fn center(&self) -> Option<Cell> {
        self.center
    }

    pub fn state(&self, cell: Cell) -> CellState {
        match self.visible.get(&cell) {
            Some(Some(_)) => CellState::VisibleSpawned,
            Some(None) => CellState::VisibleEmpty,
            None if self.offscreen.contains(&cell) => CellState::SavedOffscreen,
            None => CellState::Unknown,
        }
    }

    pub fn visible_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.visible.keys().copied()
    }

    /// Caches currently in view, row-major.
    pub fn visible_caches(&self) -> impl Iterator<Item = (Cell, CacheId)> + '_ {
        self.visible
            .iter()
            .filter_map(|(cell, cache)| cache.map(|id| (*cell, id)))
    }

    pub fn visible_cache(&self, cell: Cell) -> Option<CacheId> {
        self.visible.get(&cell).copied().flatten()
    }

    pub fn clear(&mut self) {
        self.center = None;
        self.visible.clear();
        self.offscreen.clear();
    }
}
