//! Per-session state and the buffered authenticated channel.
//!
//! A [`Session`] collects everything the reference implementation kept
//! as process globals: the link, the batched message buffer, the two
//! digest accumulators, the OT correlation state and the deterministic
//! field generator. Construction is the `reset`; a session is owned by
//! one driver, mutated by one thread, and never reused.
//!
//! The channel batches field elements into one shared buffer with one
//! shared cursor. The same cursor serves three backends: `send` flushes
//! full buffers onto the wire, `recv` refills from the wire, and
//! `check` folds the reconstructed buffer into the channel hash without
//! touching the network. The Input pre-pass advances the cursor through
//! [`Session::count_message`] so the prover learns the exact traffic
//! shape before any byte moves.

use serde::{Deserialize, Serialize};

use crate::protocols::share::Mode;
use crate::utilities::ferret::xor_seed;
use crate::utilities::field::{Zp, WIRE_SIZE};
use crate::utilities::hashes::{Hash256, HashOutput};
use crate::utilities::link::Link;
use crate::utilities::prg::{draw_batch, Seed, ZpPrg};
use crate::{ProtocolError, MESSAGE_BUFFER_SIZE, SCRATCH_CAP};

/// OT correlation state, transferable between the passes of one party.
///
/// `choices` and `receipts` are the receiver's (Prover/Check) half;
/// `zeros` and `delta` are the sender's (Verify) half. The Check role
/// holds `choices`, `receipts` *and* `delta`, which is what lets it
/// replay both ends locally. `n_ots` indexes the next unconsumed
/// correlation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtState {
    pub delta: Seed,
    pub choices: Vec<Seed>,
    pub zeros: Vec<Seed>,
    pub receipts: Vec<Seed>,
    pub n_ots: usize,
}

impl OtState {
    /// Records the choice bit for the next OT instance.
    pub fn record_choice(&mut self, bit: bool) {
        if self.n_ots % 128 == 0 {
            self.choices.push([0u8; 16]);
        }
        if bit {
            let index = self.n_ots;
            self.choices[index / 128][(index % 128) / 8] |= 1 << (index % 8);
        }
        self.n_ots += 1;
    }

    /// The recorded choice bit of OT instance `index`.
    pub fn choice_bit(&self, index: usize) -> Result<bool, ProtocolError> {
        let block = self.choices.get(index / 128).ok_or_else(|| {
            ProtocolError::ProtocolViolation(format!("no recorded choice for OT {index}"))
        })?;
        Ok(block[(index % 128) / 8] >> (index % 8) & 1 == 1)
    }
}

/// All mutable state of one execution pass, under mode `M`.
pub struct Session<'a, M: Mode> {
    pub link: &'a mut dyn Link,
    pub ot: OtState,

    /// MAC spreading key; drawn nonzero from the seeded generator on
    /// the Verify/Check side, zero elsewhere.
    pub delta: Zp,

    messages: Vec<u8>,
    /// Cursor into the message buffer, in elements.
    pub n_messages: usize,
    /// Lifetime tally of channel operations, across flushes.
    pub total_messages: usize,
    /// For the Prove side: how many elements the peer will send in
    /// total. Set from the Input pre-pass tally before the body runs.
    pub expected_messages: usize,
    received_messages: usize,

    message_hash: Hash256,
    zero_hash: Hash256,
    pub prg: ZpPrg,

    _mode: std::marker::PhantomData<M>,
}

impl<'a, M: Mode> Session<'a, M> {
    /// Fresh session over `link`; every accumulator starts from its
    /// initial state.
    pub fn new(link: &'a mut dyn Link) -> Session<'a, M> {
        Session {
            link,
            ot: OtState::default(),
            delta: Zp::ZERO,
            messages: vec![0u8; MESSAGE_BUFFER_SIZE * WIRE_SIZE],
            n_messages: 0,
            total_messages: 0,
            expected_messages: 0,
            received_messages: 0,
            message_hash: Hash256::new(),
            zero_hash: Hash256::new(),
            prg: ZpPrg::default(),
            _mode: std::marker::PhantomData,
        }
    }

    /// Re-seeds the deterministic field generator.
    pub fn seed(&mut self, seed: Seed) {
        self.prg = ZpPrg::new(seed);
    }

    /// Next element of the seeded generator.
    pub fn draw(&mut self) -> Zp {
        self.prg.draw()
    }

    /// Draws the session MAC key, skipping zero.
    pub fn draw_delta(&mut self) {
        loop {
            let candidate = self.draw();
            if candidate != Zp::ZERO {
                self.delta = candidate;
                return;
            }
        }
    }

    /// Folds one zero authentication code into the zero-check digest.
    pub fn hash_zero(&mut self, code: Zp) {
        self.zero_hash.absorb(&code.data().to_le_bytes());
    }

    /// Digest over all zero codes claimed so far.
    #[must_use]
    pub fn zero_digest(&self) -> HashOutput {
        self.zero_hash.digest()
    }

    /// Digest over all channel traffic absorbed so far.
    #[must_use]
    pub fn channel_digest(&self) -> HashOutput {
        self.message_hash.digest()
    }

    // ------------------------------------------------------------------
    // The buffered channel.

    /// Appends `x` to the outgoing buffer, flushing a full buffer onto
    /// the wire first.
    pub fn send(&mut self, x: Zp) -> Result<(), ProtocolError> {
        if self.n_messages == MESSAGE_BUFFER_SIZE {
            self.flush_verify()?;
        }
        self.store(x);
        Ok(())
    }

    /// Reads the next buffered element, refilling from the wire when
    /// the cursor wraps to a buffer boundary.
    pub fn recv(&mut self) -> Result<Zp, ProtocolError> {
        if self.total_messages >= self.expected_messages {
            return Err(ProtocolError::ProtocolViolation(String::from(
                "recv beyond the announced message count",
            )));
        }
        if self.n_messages % MESSAGE_BUFFER_SIZE == 0 {
            self.flush_prove()?;
        }
        let offset = WIRE_SIZE * self.n_messages;
        let mut wire = [0u8; WIRE_SIZE];
        wire.copy_from_slice(&self.messages[offset..offset + WIRE_SIZE]);
        self.n_messages += 1;
        self.total_messages += 1;
        Ok(Zp::from_wire(wire))
    }

    /// Appends `x` exactly like `send`, but a full buffer is folded
    /// into the channel hash instead of hitting the wire.
    pub fn check(&mut self, x: Zp) -> Result<(), ProtocolError> {
        if self.n_messages == MESSAGE_BUFFER_SIZE {
            self.flush_check()?;
        }
        self.store(x);
        Ok(())
    }

    /// Input-mode stand-in for `send`/`recv`/`check`: advances the
    /// cursor and the tally without moving data.
    pub fn count_message(&mut self) {
        if self.n_messages == MESSAGE_BUFFER_SIZE {
            self.n_messages = 0;
        }
        self.n_messages += 1;
        self.total_messages += 1;
    }

    fn store(&mut self, x: Zp) {
        let offset = WIRE_SIZE * self.n_messages;
        self.messages[offset..offset + WIRE_SIZE].copy_from_slice(&x.to_wire());
        self.n_messages += 1;
        self.total_messages += 1;
    }

    /// Verify-side flush: the used prefix of the buffer goes onto the
    /// wire; buffer and cursor reset.
    fn flush_verify(&mut self) -> Result<(), ProtocolError> {
        let used = WIRE_SIZE * self.n_messages;
        self.link.send(&self.messages[..used])?;
        self.link.flush()?;
        self.messages[..used].fill(0);
        self.n_messages = 0;
        Ok(())
    }

    /// Prove-side flush: receive the peer's next batch, absorb it into
    /// the channel hash, reset the cursor. The buffer is *not* cleared;
    /// subsequent `recv` calls consume it in order.
    fn flush_prove(&mut self) -> Result<(), ProtocolError> {
        let outstanding = self
            .expected_messages
            .checked_sub(self.received_messages)
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                ProtocolError::ProtocolViolation(String::from(
                    "recv beyond the announced message count",
                ))
            })?;
        let count = outstanding.min(MESSAGE_BUFFER_SIZE);
        let used = WIRE_SIZE * count;
        self.link.recv(&mut self.messages[..used])?;
        self.message_hash.absorb(&self.messages[..used]);
        self.received_messages += count;
        self.n_messages = 0;
        Ok(())
    }

    /// Check-side flush: absorb the locally reconstructed buffer into
    /// the channel hash. No network traffic.
    fn flush_check(&mut self) -> Result<(), ProtocolError> {
        let used = WIRE_SIZE * self.n_messages;
        self.message_hash.absorb(&self.messages[..used]);
        self.messages[..used].fill(0);
        self.n_messages = 0;
        Ok(())
    }

    /// Flushes whatever the body left in the buffer. Drivers call this
    /// once, after the body returns. An empty buffer moves zero bytes.
    pub fn flush_remainder(&mut self) -> Result<(), ProtocolError> {
        use crate::protocols::share::Role;
        match M::ROLE {
            Role::Verify => {
                if self.n_messages > 0 {
                    self.flush_verify()?;
                }
                Ok(())
            }
            Role::Check => {
                if self.n_messages > 0 {
                    self.flush_check()?;
                }
                Ok(())
            }
            Role::Input | Role::Prove => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // The OT correlation generator.

    fn scratch_guard(width: usize) -> Result<(), ProtocolError> {
        if width > SCRATCH_CAP {
            return Err(ProtocolError::CapacityExceeded(format!(
                "OT batch of {width} elements exceeds the scratch capacity {SCRATCH_CAP}"
            )));
        }
        Ok(())
    }

    fn next_zero(&self) -> Result<Seed, ProtocolError> {
        self.ot.zeros.get(self.ot.n_ots).copied().ok_or_else(|| {
            ProtocolError::ProtocolViolation(String::from("sender OT correlations exhausted"))
        })
    }

    fn next_receipt(&self) -> Result<Seed, ProtocolError> {
        self.ot.receipts.get(self.ot.n_ots).copied().ok_or_else(|| {
            ProtocolError::ProtocolViolation(String::from("receiver OT correlations exhausted"))
        })
    }

    /// Sender side of one correlation: derives `low`/`high` pads from
    /// the zero seed and its `delta` offset, transmits the element-wise
    /// correction `low + corr - high`, and leaves `-low` behind as the
    /// sender's additive share.
    pub fn ot_send(&mut self, correction: &mut [Zp]) -> Result<(), ProtocolError> {
        let width = correction.len();
        Self::scratch_guard(width)?;

        let zero = self.next_zero()?;
        let mut lows = [Zp::ZERO; SCRATCH_CAP];
        let mut highs = [Zp::ZERO; SCRATCH_CAP];
        draw_batch(zero, &mut lows[..width]);
        draw_batch(xor_seed(zero, self.ot.delta), &mut highs[..width]);
        self.ot.n_ots += 1;

        for i in 0..width {
            self.send(lows[i] + correction[i] - highs[i])?;
            correction[i] = -lows[i];
        }
        Ok(())
    }

    /// Records the receiver's choice bit for the next OT instance. The
    /// `width` elements the instance will carry are tallied so the
    /// pre-pass message count matches the real traffic.
    pub fn ot_choose(&mut self, width: usize, bit: bool) {
        self.ot.record_choice(bit);
        for _ in 0..width {
            self.count_message();
        }
    }

    /// Receiver side of one correlation: derives pads from the receipt
    /// seed and folds in the sender's corrections when the recorded
    /// choice bit is set.
    pub fn ot_recv(&mut self, width: usize) -> Result<(bool, Vec<Zp>), ProtocolError> {
        Self::scratch_guard(width)?;

        let bit = self.ot.choice_bit(self.ot.n_ots)?;
        let receipt = self.next_receipt()?;
        let mut values = vec![Zp::ZERO; width];
        draw_batch(receipt, &mut values);
        self.ot.n_ots += 1;

        for value in &mut values {
            let diff = self.recv()?;
            if bit {
                *value += diff;
            }
        }
        Ok((bit, values))
    }

    /// Check side: re-derives *both* seeds locally (the check role
    /// holds the receipt, the choice bit and `delta`) and pushes the
    /// corrections through `check` instead of the wire.
    pub fn ot_check(&mut self, correction: &mut [Zp]) -> Result<(), ProtocolError> {
        let width = correction.len();
        Self::scratch_guard(width)?;

        let receipt = self.next_receipt()?;
        let mut zero = receipt;
        if self.ot.choice_bit(self.ot.n_ots)? {
            zero = xor_seed(zero, self.ot.delta);
        }
        let one = xor_seed(zero, self.ot.delta);

        let mut lows = [Zp::ZERO; SCRATCH_CAP];
        let mut highs = [Zp::ZERO; SCRATCH_CAP];
        draw_batch(zero, &mut lows[..width]);
        draw_batch(one, &mut highs[..width]);
        self.ot.n_ots += 1;

        for i in 0..width {
            self.check(lows[i] + correction[i] - highs[i])?;
            correction[i] = -lows[i];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::share::{Check, Prove, Verify};
    use crate::utilities::ferret::{ferret_recv, ferret_send, lsb, set_block_bit, Model};
    use crate::utilities::link::{MeasureLink, PipeLink};
    use crate::utilities::rng::rand_key;

    #[test]
    fn test_choice_recording() {
        let mut state = OtState::default();
        let pattern: Vec<bool> = (0..300).map(|i| i % 3 == 0).collect();
        for &bit in &pattern {
            state.record_choice(bit);
        }
        assert_eq!(state.choices.len(), 3);
        for (i, &bit) in pattern.iter().enumerate() {
            assert_eq!(state.choice_bit(i).unwrap(), bit);
        }
        assert!(state.choice_bit(300).is_err());
    }

    /// A sequence of Verify-side sends, flushed and transported, must
    /// reproduce the identical sequence of Prove-side recv results.
    #[test]
    fn test_channel_round_trip() {
        let (mut verifier_link, mut prover_link) = PipeLink::pair();
        let elements: Vec<Zp> = (0..1000u64).map(|i| Zp::from(i * i + 17)).collect();

        let sent_digest;
        {
            let mut session = Session::<Verify>::new(&mut verifier_link);
            for &x in &elements {
                session.send(x).unwrap();
            }
            session.flush_remainder().unwrap();
            sent_digest = session.zero_digest();
        }

        let mut session = Session::<Prove>::new(&mut prover_link);
        session.expected_messages = elements.len();
        for &x in &elements {
            assert_eq!(session.recv().unwrap(), x);
        }
        // One recv too many must fail rather than block.
        assert!(session.recv().is_err());
        // No zero codes were claimed on either side.
        assert_eq!(session.zero_digest(), sent_digest);
    }

    /// An empty session flushes zero bytes and leaves both digest
    /// accumulators at their freshly initialized value.
    #[test]
    fn test_empty_session_wire_format() {
        let (mut verifier_link, _prover_link) = PipeLink::pair();
        let mut measured = MeasureLink::new(&mut verifier_link);
        let mut session = Session::<Verify>::new(&mut measured);
        session.flush_remainder().unwrap();

        let fresh = Hash256::new().digest();
        assert_eq!(session.zero_digest(), fresh);
        assert_eq!(session.channel_digest(), fresh);
        assert_eq!(session.ot.n_ots, 0);
        drop(session);
        assert_eq!(measured.traffic(), 0);
    }

    /// Runs the dealer, the offset exchange and one `ot_send`/`ot_recv`
    /// pair per instance, and checks the additive correction algebra:
    /// sender share plus receiver share equals `bit * correction`.
    #[test]
    fn test_ot_correlation_algebra() {
        let n = 64;
        let width = 4;
        let wanted: Vec<bool> = (0..n).map(|i| i % 2 == 1).collect();
        let corrections: Vec<Vec<Zp>> = (0..n)
            .map(|i| (0..width).map(|j| Zp::from((i * 31 + j + 5) as u64)).collect())
            .collect();

        let (mut verifier_link, mut prover_link) = PipeLink::pair();
        let delta = rand_key();
        let mut zeros = ferret_send(&mut verifier_link, Model::Malicious, n, delta).unwrap();
        let receipts = ferret_recv(&mut prover_link, Model::Malicious, n).unwrap();

        // Offset exchange: align the random choice bits with `wanted`.
        let mut offsets = vec![[0u8; 16]; (n + 127) / 128];
        for i in 0..n {
            if wanted[i] != lsb(receipts[i]) {
                set_block_bit(&mut offsets, i);
            }
        }
        for i in 0..n {
            if offsets[i / 128][(i % 128) / 8] >> (i % 8) & 1 == 1 {
                zeros[i] = xor_seed(zeros[i], delta);
            }
        }

        // Verify side.
        let mut sender_shares = Vec::new();
        {
            let mut session = Session::<Verify>::new(&mut verifier_link);
            session.ot.delta = delta;
            session.ot.zeros = zeros;
            for correction in &corrections {
                let mut scratch = correction.clone();
                session.ot_send(&mut scratch).unwrap();
                sender_shares.push(scratch);
            }
            session.flush_remainder().unwrap();
        }

        // Prove side.
        let mut session = Session::<Prove>::new(&mut prover_link);
        session.expected_messages = n * width;
        for &bit in &wanted {
            session.ot.record_choice(bit);
        }
        session.ot.n_ots = 0;
        session.ot.receipts = receipts;

        for i in 0..n {
            let (bit, values) = session.ot_recv(width).unwrap();
            assert_eq!(bit, wanted[i]);
            for j in 0..width {
                let reconstructed = values[j] + sender_shares[i][j];
                let expected = if wanted[i] { corrections[i][j] } else { Zp::ZERO };
                assert_eq!(reconstructed, expected);
            }
        }
    }

    /// The Check role must reproduce, byte for byte, the traffic the
    /// Verify role put on the wire, given the same correlations.
    #[test]
    fn test_ot_check_replays_verify_traffic() {
        let n = 10;
        let width = 3;
        let wanted: Vec<bool> = (0..n).map(|i| i % 4 == 0).collect();
        let corrections: Vec<Vec<Zp>> = (0..n)
            .map(|i| (0..width).map(|j| Zp::from((i * 7 + j) as u64)).collect())
            .collect();

        let (mut verifier_link, mut prover_link) = PipeLink::pair();
        let delta = rand_key();
        let mut zeros = ferret_send(&mut verifier_link, Model::Malicious, n, delta).unwrap();
        let receipts = ferret_recv(&mut prover_link, Model::Malicious, n).unwrap();
        for i in 0..n {
            if wanted[i] != lsb(receipts[i]) {
                zeros[i] = xor_seed(zeros[i], delta);
            }
        }

        let mut sender_shares = Vec::new();
        let verify_traffic_digest;
        {
            let mut session = Session::<Verify>::new(&mut verifier_link);
            session.ot.delta = delta;
            session.ot.zeros = zeros;
            for correction in &corrections {
                let mut scratch = correction.clone();
                session.ot_send(&mut scratch).unwrap();
                sender_shares.push(scratch);
            }
            // Hash the outgoing traffic the same way Check will.
            let mut traffic = Hash256::new();
            for i in 0..n * width {
                let offset = WIRE_SIZE * i;
                traffic.absorb(&session.messages[offset..offset + WIRE_SIZE]);
            }
            verify_traffic_digest = traffic.digest();
            session.flush_remainder().unwrap();
        }

        let mut session = Session::<Check>::new(&mut prover_link);
        session.ot.delta = delta;
        session.ot.receipts = receipts;
        for &bit in &wanted {
            session.ot.record_choice(bit);
        }
        session.ot.n_ots = 0;

        for (i, correction) in corrections.iter().enumerate() {
            let mut scratch = correction.clone();
            session.ot_check(&mut scratch).unwrap();
            // Check ends with the same sender share as Verify.
            assert_eq!(scratch, sender_shares[i]);
        }
        session.flush_remainder().unwrap();
        assert_eq!(session.channel_digest(), verify_traffic_digest);
    }

    #[test]
    fn test_scratch_capacity_is_enforced() {
        let (mut link, _peer) = PipeLink::pair();
        let mut session = Session::<Verify>::new(&mut link);
        let mut oversized = vec![Zp::ZERO; SCRATCH_CAP + 1];
        assert!(matches!(
            session.ot_send(&mut oversized),
            Err(ProtocolError::CapacityExceeded(_))
        ));
    }
}
