//! The single hash family shared by every strategy.
//!
//! Ring positions, ring lookups, simple-hash and the round-robin snapshot
//! surrogate all go through [`hash32`], so churn numbers are comparable
//! across strategies.

/// Hash a string to a position in the 32-bit ring space.
///
/// The position is the first four bytes (big-endian) of the key's BLAKE3
/// digest, which keeps sequential inputs such as `localhost:8081#0`,
/// `localhost:8081#1` well spread.
pub fn hash32(key: &str) -> u32 {
    let digest = blake3::hash(key.as_bytes());
    let bytes = digest.as_bytes();
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
