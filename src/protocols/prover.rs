//! The prover driver.
//!
//! One proof is four passes over the same body. The Input pre-pass
//! counts correlations and traffic and records the OT choice bits; the
//! handshake then sets up the correlations; the Prove pass is the real
//! execution; the Check pass replays the verifier's side from its
//! revealed seed and audits every byte the prover received before the
//! committed digest is opened.

use crate::protocols::session::{OtState, Session};
use crate::protocols::share::{Check, Input, Prove};
use crate::protocols::{ProtocolBody, ProverOutcome};
use crate::utilities::commits::{open_commitment, send_commitment};
use crate::utilities::ferret::{block_bit, ferret_recv, lsb, set_block_bit, Model};
use crate::utilities::link::Link;
use crate::utilities::prg::Seed;
use crate::ProtocolError;

/// Runs the full prover side of one session.
pub fn prove<B: ProtocolBody>(
    link: &mut dyn Link,
    body: &B,
) -> Result<ProverOutcome, ProtocolError> {
    // Counting pre-pass: no cryptography, no traffic.
    let (choices, n_ots, n_messages) = {
        let mut session = Session::<Input>::new(link);
        body.run(&mut session)?;
        (session.ot.choices, session.ot.n_ots, session.total_messages)
    };

    // Handshake: announce the correlation count, obtain the receipts,
    // and align the dealer's random choice bits with the recorded ones.
    link.send(&(n_ots as u64).to_le_bytes())?;
    link.flush()?;
    let receipts = ferret_recv(link, Model::Malicious, n_ots)?;

    let mut offsets = vec![[0u8; 16]; n_ots.div_ceil(128)];
    for i in 0..n_ots {
        if block_bit(&choices, i) != lsb(receipts[i]) {
            set_block_bit(&mut offsets, i);
        }
    }
    let offset_wire: Vec<u8> = offsets.iter().flatten().copied().collect();
    link.send(&offset_wire)?;
    link.flush()?;

    // The real execution.
    let (zero_digest, channel_digest) = {
        let mut session = Session::<Prove>::new(link);
        session.ot = OtState {
            choices: choices.clone(),
            receipts: receipts.clone(),
            ..OtState::default()
        };
        session.expected_messages = n_messages;
        body.run(&mut session)?;
        (session.zero_digest(), session.channel_digest())
    };

    // Commit to the digest before the verifier reveals anything.
    let commit_key = send_commitment(link, &zero_digest)?;

    // The verifier reveals its OT key and PRG seed.
    let mut reveal = [0u8; 32];
    link.recv(&mut reveal)?;
    let mut ferret_delta: Seed = [0u8; 16];
    let mut prg_seed: Seed = [0u8; 16];
    ferret_delta.copy_from_slice(&reveal[..16]);
    prg_seed.copy_from_slice(&reveal[16..]);

    // Audit pass: replay the verifier's execution locally and compare
    // it against what actually arrived.
    let (check_zero, check_channel) = {
        let mut session = Session::<Check>::new(link);
        session.ot = OtState {
            delta: ferret_delta,
            choices,
            receipts,
            ..OtState::default()
        };
        session.seed(prg_seed);
        session.draw_delta();
        body.run(&mut session)?;
        session.flush_remainder()?;
        (session.zero_digest(), session.channel_digest())
    };

    if check_channel != channel_digest {
        return Err(ProtocolError::IntegrityMismatch(String::from(
            "received traffic is inconsistent with the revealed seed",
        )));
    }
    if check_zero != zero_digest {
        return Err(ProtocolError::IntegrityMismatch(String::from(
            "replayed zero codes diverge from the proof",
        )));
    }

    // Only now is the commitment opened.
    open_commitment(link, &commit_key)?;

    Ok(ProverOutcome {
        n_ots,
        n_messages,
        zero_digest,
    })
}
