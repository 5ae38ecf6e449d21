//! The verifier driver.
//!
//! The verifier deals the OT correlations, executes the body once under
//! Verify (which generates all the channel traffic), and settles the
//! proof with the commitment exchange: it accepts exactly when the
//! prover's committed zero-check digest opens correctly and equals its
//! own.

use crate::protocols::session::{OtState, Session};
use crate::protocols::share::Verify;
use crate::protocols::{ProtocolBody, VerifierOutcome};
use crate::utilities::commits::{check_commitment_opening, recv_commitment};
use crate::utilities::ferret::{block_bit, ferret_send, xor_seed, Model};
use crate::utilities::link::Link;
use crate::utilities::prg::Seed;
use crate::utilities::rng::rand_key;
use crate::ProtocolError;

/// Runs the full verifier side of one session.
pub fn verify<B: ProtocolBody>(
    link: &mut dyn Link,
    body: &B,
) -> Result<VerifierOutcome, ProtocolError> {
    // Handshake: correlation count, dealer, choice offsets.
    let mut count_wire = [0u8; 8];
    link.recv(&mut count_wire)?;
    let n_ots = usize::try_from(u64::from_le_bytes(count_wire)).map_err(|_| {
        ProtocolError::ProtocolViolation(String::from("unrepresentable OT count"))
    })?;

    let ferret_delta: Seed = rand_key();
    let mut zeros = ferret_send(link, Model::Malicious, n_ots, ferret_delta)?;

    let mut offset_wire = vec![0u8; n_ots.div_ceil(128) * 16];
    link.recv(&mut offset_wire)?;
    let offsets: Vec<Seed> = offset_wire
        .chunks_exact(16)
        .map(|chunk| {
            let mut block = [0u8; 16];
            block.copy_from_slice(chunk);
            block
        })
        .collect();
    for i in 0..n_ots {
        if block_bit(&offsets, i) {
            zeros[i] = xor_seed(zeros[i], ferret_delta);
        }
    }

    // The Verify execution, under a fresh seed.
    let prg_seed: Seed = rand_key();
    let (zero_digest, n_messages) = {
        let mut session = Session::<Verify>::new(link);
        session.ot = OtState {
            delta: ferret_delta,
            choices: offsets,
            zeros,
            ..OtState::default()
        };
        session.seed(prg_seed);
        session.draw_delta();
        body.run(&mut session)?;
        session.flush_remainder()?;
        (session.zero_digest(), session.total_messages)
    };

    // Settlement: commitment first, then the reveal, then the opening.
    let commitment = recv_commitment(link)?;

    let mut reveal = [0u8; 32];
    reveal[..16].copy_from_slice(&ferret_delta);
    reveal[16..].copy_from_slice(&prg_seed);
    link.send(&reveal)?;
    link.flush()?;

    let accepted = check_commitment_opening(link, &zero_digest, &commitment)?;

    Ok(VerifierOutcome {
        accepted,
        n_ots,
        n_messages,
        zero_digest,
    })
}
