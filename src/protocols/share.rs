//! The mode-polymorphic authenticated-value abstraction.
//!
//! A wire value `x` is authenticated under the session MAC key `delta`:
//! the prover holds the tag `m`, the verifier holds the key `k`, and
//! honest executions satisfy `m + k = x * delta`. A [`Share`] carries
//! the role-appropriate half of that relation; the `Input` reference
//! mode carries `x` itself. The four roles are distinct types resolved
//! at build time, so a Prover binary contains no Verifier code path and
//! vice versa.

use std::marker::PhantomData;
use std::ops::{Add, Neg, Sub};

use crate::protocols::session::Session;
use crate::utilities::field::Zp;
use crate::ProtocolError;

/// The closed set of execution roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Input,
    Prove,
    Verify,
    Check,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Input {}
    impl Sealed for super::Prove {}
    impl Sealed for super::Verify {}
    impl Sealed for super::Check {}
}

/// One of the four execution modes, selected at instantiation time.
pub trait Mode: sealed::Sealed + Copy + Clone + 'static {
    const ROLE: Role;
}

/// Cleartext reference execution. Doubles as the prover's counting
/// pre-pass: it records OT choice bits and tallies channel traffic.
#[derive(Debug, Clone, Copy)]
pub struct Input;

/// The prover's cryptographic execution.
#[derive(Debug, Clone, Copy)]
pub struct Prove;

/// The verifier's cryptographic execution.
#[derive(Debug, Clone, Copy)]
pub struct Verify;

/// The prover's local replay of the verifier's execution, after the
/// verifier reveals its seed. Touches no network.
#[derive(Debug, Clone, Copy)]
pub struct Check;

impl Mode for Input {
    const ROLE: Role = Role::Input;
}
impl Mode for Prove {
    const ROLE: Role = Role::Prove;
}
impl Mode for Verify {
    const ROLE: Role = Role::Verify;
}
impl Mode for Check {
    const ROLE: Role = Role::Check;
}

/// One authenticated wire value, as seen by mode `M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Share<M: Mode> {
    pub data: Zp,
    _mode: PhantomData<M>,
}

impl<M: Mode> Share<M> {
    #[must_use]
    pub fn new(data: Zp) -> Share<M> {
        Share {
            data,
            _mode: PhantomData,
        }
    }

    /// A public constant. No interaction, no fresh key material: the
    /// prover's tag is zero and the verifier's key is `value * delta`.
    #[must_use]
    pub fn constant(session: &Session<M>, value: Zp) -> Share<M> {
        let data = match M::ROLE {
            Role::Input => value,
            Role::Prove => Zp::ZERO,
            Role::Verify | Role::Check => value * session.delta,
        };
        Share::new(data)
    }

    /// A prover-secret bit, authenticated through one OT correlation.
    ///
    /// The Input pre-pass records `bit` as the OT choice; the Prove
    /// execution receives `low + bit*delta`, the Verify execution keeps
    /// `-low`, and Check replays the Verify side locally. The shares
    /// reconstruct `bit * delta`.
    pub fn input_bit(session: &mut Session<M>, bit: bool) -> Result<Share<M>, ProtocolError> {
        let data = match M::ROLE {
            Role::Input => {
                session.ot_choose(1, bit);
                Zp::from(bit)
            }
            Role::Prove => {
                let (_, values) = session.ot_recv(1)?;
                values[0]
            }
            Role::Verify => {
                let mut correction = [session.delta];
                session.ot_send(&mut correction)?;
                correction[0]
            }
            Role::Check => {
                let mut correction = [session.delta];
                session.ot_check(&mut correction)?;
                correction[0]
            }
        };
        Ok(Share::new(data))
    }

    /// Claims that this share carries the value zero.
    ///
    /// The claim is folded into the session's zero-check digest; it is
    /// settled only by the final digest comparison. A forged claim
    /// survives with probability `1/p`.
    pub fn assert_zero(self, session: &mut Session<M>) -> Result<(), ProtocolError> {
        match M::ROLE {
            Role::Input => {
                if self.data != Zp::ZERO {
                    return Err(ProtocolError::IntegrityMismatch(format!(
                        "cleartext zero check failed: {}",
                        self.data
                    )));
                }
            }
            Role::Prove => session.hash_zero(self.data),
            Role::Verify | Role::Check => session.hash_zero(-self.data),
        }
        Ok(())
    }
}

impl<M: Mode> Add for Share<M> {
    type Output = Share<M>;

    fn add(self, other: Share<M>) -> Share<M> {
        Share::new(self.data + other.data)
    }
}

impl<M: Mode> Sub for Share<M> {
    type Output = Share<M>;

    fn sub(self, other: Share<M>) -> Share<M> {
        Share::new(self.data - other.data)
    }
}

impl<M: Mode> Neg for Share<M> {
    type Output = Share<M>;

    fn neg(self) -> Share<M> {
        Share::new(-self.data)
    }
}

/// The key half of one authenticated memory slot.
///
/// Two constructors mirror the two ways key material reaches the
/// prover: [`KeyShare::fresh`] distributes a share of a fresh slot key
/// through one OT correlation, and [`KeyShare::input`] transports a
/// key-minus-mask pad through the channel (one-time-padded by the fresh
/// slot key, so the pad reveals nothing).
#[derive(Debug, Clone, Copy)]
pub struct KeyShare<M: Mode> {
    pub data: Zp,
    _mode: PhantomData<M>,
}

impl<M: Mode> KeyShare<M> {
    #[must_use]
    pub fn new(data: Zp) -> KeyShare<M> {
        KeyShare {
            data,
            _mode: PhantomData,
        }
    }

    /// Distributes `key` (meaningful on the Verify/Check side only)
    /// through one OT correlation. Prove ends with `low + key`, Verify
    /// with `-low`; the halves reconstruct `key`.
    pub fn fresh(session: &mut Session<M>, key: Zp) -> Result<KeyShare<M>, ProtocolError> {
        let data = match M::ROLE {
            Role::Input => {
                // The key distribution always takes the high branch.
                session.ot_choose(1, true);
                Zp::ZERO
            }
            Role::Prove => {
                let (_, values) = session.ot_recv(1)?;
                values[0]
            }
            Role::Verify => {
                let mut correction = [key];
                session.ot_send(&mut correction)?;
                correction[0]
            }
            Role::Check => {
                let mut correction = [key];
                session.ot_check(&mut correction)?;
                correction[0]
            }
        };
        Ok(KeyShare::new(data))
    }

    /// Transports the pad `key - mask` through the channel. `key` and
    /// `mask` are meaningful on the Verify/Check side only; the Prove
    /// side receives the pad, the Input pre-pass merely tallies it.
    pub fn input(session: &mut Session<M>, key: Zp, mask: Zp) -> Result<KeyShare<M>, ProtocolError> {
        let data = match M::ROLE {
            Role::Input => {
                session.count_message();
                Zp::ZERO
            }
            Role::Prove => session.recv()?,
            Role::Verify => {
                let pad = key - mask;
                session.send(pad)?;
                pad
            }
            Role::Check => {
                let pad = key - mask;
                session.check(pad)?;
                pad
            }
        };
        Ok(KeyShare::new(data))
    }
}
