use sha2::{Digest, Sha256};

use crate::board::Cell;

const INITIAL_VALUE_TAG: &str = "initialValue";
const MANTISSA_BITS: u32 = 53;

/// Maps a key to a reproducible number in `[0, 1)`.
///
/// The value is derived from the SHA-256 digest of the key bytes, so it is
/// identical across processes, platforms and toolchain upgrades. `std`'s
/// hashers make no such promise and must not be used here.
pub fn luck(key: &str) -> f64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let bits = u64::from_be_bytes(prefix) >> (64 - MANTISSA_BITS);
    bits as f64 / (1u64 << MANTISSA_BITS) as f64
}

pub fn spawn_key(cell: Cell) -> String {
    format!("{},{}", cell.i, cell.j)
}

pub fn initial_value_key(cell: Cell) -> String {
    format!("{},{},{INITIAL_VALUE_TAG}", cell.i, cell.j)
}

pub fn spawns_cache(cell: Cell, spawn_probability: f64) -> bool {
    luck(&spawn_key(cell)) < spawn_probability
}

pub fn initial_value(cell: Cell, max_initial_value: u32) -> u32 {
    (luck(&initial_value_key(cell)) * f64::from(max_initial_value)).floor() as u32
}
