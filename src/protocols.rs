//! The protocol engine: one algorithmic description, four executions.
//!
//! The same protocol body is instantiated once per [`share::Mode`]: a
//! cleartext reference pass (`Input`), the two cryptographic roles
//! (`Prove`, `Verify`), and a local self-check replay (`Check`). The
//! prover runs Input to count correlations, Prove for the real
//! execution and Check to audit the verifier; the verifier runs Verify.
//! Every secret-bearing wire value flows through the authenticated
//! channel in [`session`].

use serde::{Deserialize, Serialize};

use crate::protocols::session::Session;
use crate::protocols::share::Mode;
use crate::utilities::hashes::HashOutput;
use crate::ProtocolError;

pub mod demo;
pub mod prover;
pub mod roram;
pub mod session;
pub mod share;
pub mod verifier;

/// A protocol description, instantiable under every mode.
///
/// Implementations must drive the session through the *same* sequence
/// of operations regardless of the mode: the drivers rely on the four
/// executions staying in lockstep.
pub trait ProtocolBody {
    fn run<M: Mode>(&self, session: &mut Session<M>) -> Result<(), ProtocolError>;
}

/// What the prover learns from a completed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverOutcome {
    pub n_ots: usize,
    pub n_messages: usize,
    pub zero_digest: HashOutput,
}

/// What the verifier learns from a completed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierOutcome {
    pub accepted: bool,
    pub n_ots: usize,
    pub n_messages: usize,
    pub zero_digest: HashOutput,
}
