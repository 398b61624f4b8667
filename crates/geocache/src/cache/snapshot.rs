use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::registry::CacheRegistry;
use crate::board::Cell;

/// Value of a cache captured when it left view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub cell: Cell,
    pub value: u32,
}

/// One snapshot per cell, overwritten on every save and never evicted.
#[derive(Debug, Default, Clone)]
pub struct SnapshotStore {
    snapshots: BTreeMap<Cell, CacheSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshots(snapshots: impl IntoIterator<Item = CacheSnapshot>) -> Self {
        Self {
            snapshots: snapshots
                .into_iter()
                .map(|snapshot| (snapshot.cell, snapshot))
                .collect(),
        }
    }

    /// Captures the live value of the cache at `cell`. Returns `false` when the
    /// registry holds no cache for that cell.
    pub fn save(&mut self, registry: &CacheRegistry, cell: Cell) -> bool {
        let Some(value) = registry.get(cell).and_then(|id| registry.value(id)) else {
            return false;
        };
        self.snapshots.insert(cell, CacheSnapshot { cell, value });
        true
    }

    /// Writes the saved value back onto the registry's cache for `cell`.
    /// Without a snapshot this is a no-op and the generated value stands.
    pub fn restore(&self, registry: &mut CacheRegistry, cell: Cell) -> bool {
        let Some(snapshot) = self.snapshots.get(&cell) else {
            return false;
        };
        let id = registry.get_or_create(cell);
        registry.set_value(id, snapshot.value)
    }

    pub fn has(&self, cell: Cell) -> bool {
        self.snapshots.contains_key(&cell)
    }

    pub fn get(&self, cell: Cell) -> Option<&CacheSnapshot> {
        self.snapshots.get(&cell)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheSnapshot> {
        self.snapshots.values()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
