mod registry;
mod snapshot;

pub use registry::{CacheEntity, CacheId, CacheRegistry, Score};
pub use snapshot::{CacheSnapshot, SnapshotStore};
