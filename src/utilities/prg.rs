//! Deterministic extraction of field elements from 128-bit seeds.
//!
//! The Prover and the Verifier hold different halves of the same
//! authentication material, yet both must expand seeds into exactly the
//! same field elements. Everything here is therefore a pure function of
//! the seed: the expansion is SHA-256 in counter mode, and candidates
//! that fall outside the field are rejected and redrawn
//! deterministically.

use crate::utilities::field::{Zp, WIRE_SIZE};
use crate::utilities::hashes::hash;

/// A 128-bit PRG seed.
pub type Seed = [u8; 16];

/// How many candidate elements fit in one seed. A 128-bit block holds
/// three full 5-byte candidates (the last byte is ignored).
const CANDIDATES_PER_SEED: usize = 3;

/// Deterministic generator of 128-bit blocks from one seed.
///
/// Block `i` is the first half of `SHA-256(counter_i || seed)`. This
/// doubles as the keyed pseudorandom permutation used to re-seed after
/// a rejected batch.
#[derive(Debug, Clone)]
pub struct Prg {
    seed: Seed,
    counter: u64,
}

impl Prg {
    #[must_use]
    pub fn new(seed: Seed) -> Prg {
        Prg { seed, counter: 0 }
    }

    pub fn next_block(&mut self) -> Seed {
        let digest = hash(&self.seed, &self.counter.to_be_bytes());
        self.counter += 1;
        let mut block = [0u8; 16];
        block.copy_from_slice(&digest[..16]);
        block
    }
}

/// Expands `seed` into `target.len()` field elements.
///
/// For up to three elements the seed's own bytes are taken as 5-byte
/// candidates; if any candidate falls outside the field the *whole*
/// batch is discarded and retried under a fresh derived seed, so the
/// rejection is at batch granularity. Larger requests are split into
/// groups of three, each under an independently derived sub-seed.
///
/// The output is a pure function of `(seed, target.len())`.
pub fn draw_batch(seed: Seed, target: &mut [Zp]) {
    if target.len() <= CANDIDATES_PER_SEED {
        let mut current = seed;
        'batch: loop {
            for (i, slot) in target.iter_mut().enumerate() {
                let mut wire = [0u8; WIRE_SIZE];
                wire.copy_from_slice(&current[WIRE_SIZE * i..WIRE_SIZE * (i + 1)]);
                match Zp::from_wire_exact(wire) {
                    Some(element) => *slot = element,
                    None => {
                        current = Prg::new(current).next_block();
                        continue 'batch;
                    }
                }
            }
            return;
        }
    }

    let mut prg = Prg::new(seed);
    for group in target.chunks_mut(CANDIDATES_PER_SEED) {
        draw_batch(prg.next_block(), group);
    }
}

/// Number of 128-bit blocks buffered by the free-running generator.
const BUFFER_BLOCKS: usize = 40;
const BUFFER_BYTES: usize = BUFFER_BLOCKS * 16;
const BUFFER_CANDIDATES: usize = BUFFER_BYTES / WIRE_SIZE;

/// Free-running generator of field elements.
///
/// Buffers [`BUFFER_BLOCKS`] PRG blocks and slices them into 5-byte
/// candidates, skipping the rare candidate that falls outside the
/// field. Re-seeding resets the stream completely.
pub struct ZpPrg {
    prg: Prg,
    buffer: [u8; BUFFER_BYTES],
    ptr: usize,
}

impl Default for ZpPrg {
    fn default() -> ZpPrg {
        ZpPrg::new([0u8; 16])
    }
}

impl ZpPrg {
    #[must_use]
    pub fn new(seed: Seed) -> ZpPrg {
        ZpPrg {
            prg: Prg::new(seed),
            buffer: [0u8; BUFFER_BYTES],
            // Start exhausted so the first draw refills.
            ptr: BUFFER_CANDIDATES,
        }
    }

    pub fn draw(&mut self) -> Zp {
        loop {
            if self.ptr == BUFFER_CANDIDATES {
                for block in 0..BUFFER_BLOCKS {
                    self.buffer[16 * block..16 * (block + 1)]
                        .copy_from_slice(&self.prg.next_block());
                }
                self.ptr = 0;
            }
            let mut wire = [0u8; WIRE_SIZE];
            wire.copy_from_slice(&self.buffer[WIRE_SIZE * self.ptr..WIRE_SIZE * (self.ptr + 1)]);
            self.ptr += 1;
            if let Some(element) = Zp::from_wire_exact(wire) {
                return element;
            }
        }
    }
}
