//! Interface to the bulk OT-extension collaborator.
//!
//! The protocol consumes correlated random OTs in bulk: for each
//! instance the sender holds a seed `zero` and a global 128-bit key
//! `delta`, while the receiver holds `receipt = zero ^ c*delta` for a
//! random choice bit `c`. By convention `c` is the lowest bit of the
//! receipt seed, so the receiver need not store choices separately.
//!
//! A real deployment plugs in a Ferret-style extension protocol here.
//! This crate ships a trusted-dealer realization with the exact same
//! interface and correlation shape: the sender samples the receipts,
//! derives its zeros from them, and transmits the receipts in one
//! block. It provides no security against the sender and exists so the
//! rest of the system can be exercised end to end.

use rand::Rng;

use crate::utilities::link::Link;
use crate::utilities::prg::Seed;
use crate::utilities::rng;
use crate::ProtocolError;

/// Security model the underlying extension is instantiated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    SemiHonest,
    Malicious,
}

/// XOR of two 128-bit blocks.
#[must_use]
pub fn xor_seed(left: Seed, right: Seed) -> Seed {
    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = left[i] ^ right[i];
    }
    out
}

/// Lowest bit of a 128-bit block.
#[must_use]
pub fn lsb(seed: Seed) -> bool {
    seed[0] & 1 == 1
}

/// Reads bit `index` of a bit vector packed into 128-bit blocks.
#[must_use]
pub fn block_bit(blocks: &[Seed], index: usize) -> bool {
    blocks[index / 128][(index % 128) / 8] >> (index % 8) & 1 == 1
}

/// Sets bit `index` of a bit vector packed into 128-bit blocks.
pub fn set_block_bit(blocks: &mut [Seed], index: usize) {
    blocks[index / 128][(index % 128) / 8] |= 1 << (index % 8);
}

/// Sender side: produces `n` zero seeds correlated under `delta`.
pub fn ferret_send(
    link: &mut dyn Link,
    _model: Model,
    n: usize,
    delta: Seed,
) -> Result<Vec<Seed>, ProtocolError> {
    let mut zeros = Vec::with_capacity(n);
    let mut wire = Vec::with_capacity(n * 16);
    for _ in 0..n {
        let receipt = rng::get_rng().gen::<Seed>();
        let zero = if lsb(receipt) {
            xor_seed(receipt, delta)
        } else {
            receipt
        };
        zeros.push(zero);
        wire.extend_from_slice(&receipt);
    }
    link.send(&wire)?;
    link.flush()?;
    Ok(zeros)
}

/// Receiver side: obtains `n` receipt seeds. The random choice bit of
/// instance `i` is `lsb(receipts[i])`.
pub fn ferret_recv(
    link: &mut dyn Link,
    _model: Model,
    n: usize,
) -> Result<Vec<Seed>, ProtocolError> {
    let mut wire = vec![0u8; n * 16];
    link.recv(&mut wire)?;
    let receipts = wire
        .chunks_exact(16)
        .map(|chunk| {
            let mut seed = [0u8; 16];
            seed.copy_from_slice(chunk);
            seed
        })
        .collect();
    Ok(receipts)
}
