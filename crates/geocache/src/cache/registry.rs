use std::collections::HashMap;

use tracing::debug;

use crate::board::Cell;
use crate::luck::initial_value;

/// Stable handle to a cache owned by a [`CacheRegistry`]. Two handles are the
/// same cache exactly when they compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntity {
    cell: Cell,
    value: u32,
    max_value: u32,
}

impl CacheEntity {
    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn max_value(&self) -> u32 {
        self.max_value
    }
}

/// Points held by the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score(u32);

impl Score {
    pub const ZERO: Score = Score(0);

    pub const fn new(points: u32) -> Self {
        Self(points)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Owns one cache per cell. Caches are created on first reference and live as
/// long as the registry, so mutations survive leaving and re-entering view.
#[derive(Debug)]
pub struct CacheRegistry {
    max_initial_value: u32,
    caches: Vec<CacheEntity>,
    ids_by_cell: HashMap<Cell, CacheId>,
}

impl CacheRegistry {
    pub fn new(max_initial_value: u32) -> Self {
        Self {
            max_initial_value,
            caches: Vec::new(),
            ids_by_cell: HashMap::new(),
        }
    }

    pub fn get_or_create(&mut self, cell: Cell) -> CacheId {
        if let Some(id) = self.ids_by_cell.get(&cell) {
            return *id;
        }

        let id = CacheId(self.caches.len() as u32);
        let value = initial_value(cell, self.max_initial_value);
        self.caches.push(CacheEntity {
            cell,
            value,
            max_value: value,
        });
        self.ids_by_cell.insert(cell, id);
        debug!(i = cell.i, j = cell.j, value, "cache_created");
        id
    }

    pub fn get(&self, cell: Cell) -> Option<CacheId> {
        self.ids_by_cell.get(&cell).copied()
    }

    pub fn entity(&self, id: CacheId) -> Option<&CacheEntity> {
        self.caches.get(id.0 as usize)
    }

    pub fn value(&self, id: CacheId) -> Option<u32> {
        self.entity(id).map(CacheEntity::value)
    }

    pub(crate) fn set_value(&mut self, id: CacheId, value: u32) -> bool {
        match self.caches.get_mut(id.0 as usize) {
            Some(cache) => {
                cache.value = value;
                true
            }
            None => false,
        }
    }

    /// Moves one point from the cache to the player. Returns `false` and changes
    /// nothing when the cache is empty.
    pub fn poke(&mut self, id: CacheId, score: &mut Score) -> bool {
        let Some(cache) = self.caches.get_mut(id.0 as usize) else {
            return false;
        };
        if cache.value == 0 {
            return false;
        }
        let Some(next_score) = score.0.checked_add(1) else {
            return false;
        };
        cache.value -= 1;
        score.0 = next_score;
        true
    }

    /// Moves one point from the player into the cache. Returns `false` and
    /// changes nothing when the player has no points.
    pub fn place(&mut self, id: CacheId, score: &mut Score) -> bool {
        let Some(cache) = self.caches.get_mut(id.0 as usize) else {
            return false;
        };
        if score.0 == 0 {
            return false;
        }
        let Some(next_value) = cache.value.checked_add(1) else {
            return false;
        };
        score.0 -= 1;
        cache.value = next_value;
        true
    }

    pub fn reset_value(&mut self, id: CacheId) -> bool {
        match self.caches.get_mut(id.0 as usize) {
            Some(cache) => {
                cache.value = cache.max_value;
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&mut self) {
        for cache in &mut self.caches {
            cache.value = cache.max_value;
        }
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    pub fn total_value(&self) -> u64 {
        self.caches.iter().map(|cache| u64::from(cache.value)).sum()
    }
}
