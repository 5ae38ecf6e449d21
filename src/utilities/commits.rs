//! Commit and decommit over the link.
//!
//! The acceptance step of the protocol needs a binding, hiding
//! envelope: the prover publishes a digest of its zero-check hash
//! before the verifier reveals its PRG seed, and opens it afterwards.
//! A commitment to `message` is `SHA-256(message || key)` for a fresh
//! 128-bit key; opening reveals the key.

use rand::Rng;

use crate::utilities::hashes::{Hash256, HashOutput};
use crate::utilities::link::Link;
use crate::utilities::rng;
use crate::ProtocolError;

/// The random key blinding one commitment.
pub type CommitKey = [u8; 16];

fn commitment_digest(message: &HashOutput, key: &CommitKey) -> HashOutput {
    let mut hash = Hash256::new();
    hash.absorb(message);
    hash.absorb(key);
    hash.digest()
}

/// Commits to `message`: draws a fresh key, transmits the commitment
/// digest, and returns the key for the later opening.
pub fn send_commitment(
    link: &mut dyn Link,
    message: &HashOutput,
) -> Result<CommitKey, ProtocolError> {
    let key = rng::get_rng().gen::<CommitKey>();
    let digest = commitment_digest(message, &key);
    link.send(&digest)?;
    link.flush()?;
    Ok(key)
}

/// Receives a commitment digest, unopened.
pub fn recv_commitment(link: &mut dyn Link) -> Result<HashOutput, ProtocolError> {
    let mut digest = [0u8; 32];
    link.recv(&mut digest)?;
    Ok(digest)
}

/// Opens a previous commitment by transmitting its key.
pub fn open_commitment(link: &mut dyn Link, key: &CommitKey) -> Result<(), ProtocolError> {
    link.send(key)?;
    link.flush()?;
    Ok(())
}

/// Receives an opening key and checks it against a commitment.
///
/// `expected` is the message the receiver believes was committed to;
/// `actual` is the digest received earlier. Returns whether the opening
/// is consistent with both.
pub fn check_commitment_opening(
    link: &mut dyn Link,
    expected: &HashOutput,
    actual: &HashOutput,
) -> Result<bool, ProtocolError> {
    let mut key = [0u8; 16];
    link.recv(&mut key)?;
    Ok(commitment_digest(expected, &key) == *actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::link::PipeLink;

    fn round_trip(message: HashOutput, claimed: HashOutput) -> bool {
        let (mut prover, mut verifier) = PipeLink::pair();

        let key = send_commitment(&mut prover, &message).unwrap();
        let digest = recv_commitment(&mut verifier).unwrap();

        open_commitment(&mut prover, &key).unwrap();
        check_commitment_opening(&mut verifier, &claimed, &digest).unwrap()
    }

    #[test]
    fn test_commit_open_check() {
        let message = rng::get_rng().gen::<HashOutput>();
        assert!(round_trip(message, message));
    }

    #[test]
    fn test_commit_fails_on_other_message() {
        let message = rng::get_rng().gen::<HashOutput>();
        let other = rng::get_rng().gen::<HashOutput>();
        assert!(!round_trip(message, other));
    }

    #[test]
    fn test_commit_fails_on_wrong_key() {
        let message = rng::get_rng().gen::<HashOutput>();
        let (mut prover, mut verifier) = PipeLink::pair();

        let _key = send_commitment(&mut prover, &message).unwrap();
        let digest = recv_commitment(&mut verifier).unwrap();

        // Open with an unrelated key.
        let forged = rng::get_rng().gen::<CommitKey>();
        open_commitment(&mut prover, &forged).unwrap();
        assert!(!check_commitment_opening(&mut verifier, &message, &digest).unwrap());
    }

    #[test]
    fn test_commit_fails_on_altered_digest() {
        let message = rng::get_rng().gen::<HashOutput>();
        let (mut prover, mut verifier) = PipeLink::pair();

        let key = send_commitment(&mut prover, &message).unwrap();
        let mut digest = recv_commitment(&mut verifier).unwrap();
        digest[0] ^= 1;

        open_commitment(&mut prover, &key).unwrap();
        assert!(!check_commitment_opening(&mut verifier, &message, &digest).unwrap());
    }
}
