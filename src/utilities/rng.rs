//! Source of fresh randomness for keys, seeds and commitments.

use rand::Rng;
#[cfg(feature = "insecure-rng")]
use rand::rngs::StdRng;
#[cfg(not(feature = "insecure-rng"))]
use rand::rngs::ThreadRng;
#[cfg(feature = "insecure-rng")]
use rand::SeedableRng;

pub const DEFAULT_SEED: u64 = 42;

#[cfg(not(feature = "insecure-rng"))]
pub fn get_rng() -> ThreadRng {
    rand::thread_rng()
}

#[cfg(feature = "insecure-rng")]
pub fn get_rng() -> StdRng {
    rand::rngs::StdRng::seed_from_u64(DEFAULT_SEED)
}

/// Draws a fresh 128-bit key.
///
/// These keys seed pseudorandom generators, blind commitments and act
/// as the verifier's global OT correlation.
#[must_use]
pub fn rand_key() -> [u8; 16] {
    get_rng().gen::<[u8; 16]>()
}
