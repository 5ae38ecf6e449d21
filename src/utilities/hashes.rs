//! Hash functions and digest accumulators.
//!
//! We use SHA-256 throughout, via `bitcoin_hashes`. Besides the usual
//! one-shot helpers, this module exposes an incremental [`Hash256`]
//! accumulator: the protocol keeps two of these alive for a whole
//! session (one over channel traffic, one over zero authentication
//! codes) and only reads the digest at the very end.

use bitcoin_hashes::{sha256, Hash, HashEngine};

/// Represents the output of the hash function.
///
/// We are using SHA-256, so the hash values have 256 bits.
pub type HashOutput = [u8; 32];

/// Hash of a message under a salt, with result in bytes.
///
/// The salt selects the random oracle: different sub-protocols pass
/// different salts so their oracles never collide.
#[must_use]
pub fn hash(msg: &[u8], salt: &[u8]) -> HashOutput {
    let mut engine = sha256::Hash::engine();
    engine.input(salt);
    engine.input(msg);
    sha256::Hash::from_engine(engine).to_byte_array()
}

/// An incremental 256-bit hash state.
///
/// `absorb` may be called any number of times; `digest` snapshots the
/// state without disturbing it, so an accumulator can keep running
/// after being read.
#[derive(Clone)]
pub struct Hash256 {
    engine: sha256::HashEngine,
}

impl Default for Hash256 {
    fn default() -> Hash256 {
        Hash256 {
            engine: sha256::Hash::engine(),
        }
    }
}

impl Hash256 {
    #[must_use]
    pub fn new() -> Hash256 {
        Hash256::default()
    }

    pub fn absorb(&mut self, bytes: &[u8]) {
        self.engine.input(bytes);
    }

    /// Digest of everything absorbed so far.
    #[must_use]
    pub fn digest(&self) -> HashOutput {
        sha256::Hash::from_engine(self.engine.clone()).to_byte_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests if [`hash`] really works as SHA-256 is intended.
    ///
    /// In this case, you should manually change the values and
    /// use a trusted source which computes SHA-256 to compare.
    #[test]
    fn test_hash() {
        let msg = "Testing message".as_bytes();
        let salt = "Testing salt".as_bytes();

        assert_eq!(
            hash(msg, salt).to_vec(),
            hex::decode("847bf2f0d27a519b25e519efebc9d509316539b89ee8f6f09ef6d2abc08113ba")
                .unwrap()
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut accumulator = Hash256::new();
        accumulator.absorb("Testing salt".as_bytes());
        accumulator.absorb("Testing message".as_bytes());
        assert_eq!(
            accumulator.digest(),
            hash("Testing message".as_bytes(), "Testing salt".as_bytes())
        );
    }

    #[test]
    fn test_digest_is_a_snapshot() {
        let mut accumulator = Hash256::new();
        accumulator.absorb(b"first");
        let early = accumulator.digest();
        assert_eq!(early, accumulator.digest());

        accumulator.absorb(b"second");
        assert_ne!(early, accumulator.digest());
    }

    #[test]
    fn test_fresh_accumulators_agree() {
        assert_eq!(Hash256::new().digest(), Hash256::default().digest());
    }
}
