//! Oblivious permuted memory.
//!
//! A [`Roram`] holds `n` fixed-width records, each lane protected by a
//! fresh authentication key. The per-slot key shares are permuted into
//! access order *once*, up front; afterwards both parties scan them
//! strictly sequentially through two monotonic cursors. Access-pattern
//! privacy comes entirely from that one-time permutation: the
//! Verify/Check side only ever touches key material and never learns
//! which physical write feeds which logical read.

use crate::protocols::session::Session;
use crate::protocols::share::{KeyShare, Mode, Role, Share};
use crate::utilities::field::Zp;
use crate::utilities::permute::permute;
use crate::ProtocolError;

pub struct Roram<M: Mode, const WIDTH: usize> {
    permutation: Vec<u32>,
    /// Raw slot keys; materialized on the Verify/Check side only.
    keys: Vec<[Zp; WIDTH]>,
    /// Per-slot key shares, reordered into access order.
    permuted_keys: Vec<[KeyShare<M>; WIDTH]>,
    /// Cleartext (Input) or masked (Prove) record storage.
    buffer: Vec<[Zp; WIDTH]>,
    /// Next write slot.
    w: usize,
    /// Next read position, in access order.
    r: usize,
}

impl<M: Mode, const WIDTH: usize> Roram<M, WIDTH> {
    /// Creates a memory of `n` records whose reads will surface in the
    /// order given by `permutation`.
    ///
    /// Draws the slot keys (Verify/Check), distributes one key share
    /// per lane through the OT correlation generator, and permutes the
    /// shares into access order.
    pub fn fresh(
        session: &mut Session<M>,
        n: usize,
        permutation: Vec<u32>,
    ) -> Result<Roram<M, WIDTH>, ProtocolError> {
        if permutation.len() != n {
            return Err(ProtocolError::CapacityExceeded(format!(
                "permutation of {} entries for a memory of {n} records",
                permutation.len()
            )));
        }

        let mut keys: Vec<[Zp; WIDTH]> = Vec::new();
        let mut permuted_keys: Vec<[KeyShare<M>; WIDTH]> = Vec::with_capacity(n);
        for _ in 0..n {
            let mut slot_keys = [Zp::ZERO; WIDTH];
            if matches!(M::ROLE, Role::Verify | Role::Check) {
                for key in &mut slot_keys {
                    *key = session.draw();
                }
            }

            let mut slot_shares = [KeyShare::new(Zp::ZERO); WIDTH];
            for lane in 0..WIDTH {
                slot_shares[lane] = KeyShare::fresh(session, slot_keys[lane])?;
            }
            permuted_keys.push(slot_shares);

            if matches!(M::ROLE, Role::Verify | Role::Check) {
                keys.push(slot_keys);
            }
        }

        permute(&permutation, &mut permuted_keys)?;

        let buffer = if matches!(M::ROLE, Role::Input | Role::Prove) {
            vec![[Zp::ZERO; WIDTH]; n]
        } else {
            Vec::new()
        };

        Ok(Roram {
            permutation,
            keys,
            permuted_keys,
            buffer,
            w: 0,
            r: 0,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.permutation.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permutation.is_empty()
    }

    /// Stores `record` in the next physical slot.
    pub fn write(
        &mut self,
        session: &mut Session<M>,
        record: [Share<M>; WIDTH],
    ) -> Result<(), ProtocolError> {
        if self.w == self.len() {
            return Err(ProtocolError::CapacityExceeded(format!(
                "write past the last of {} records",
                self.len()
            )));
        }

        for lane in 0..WIDTH {
            let (key, mask) = match M::ROLE {
                Role::Verify | Role::Check => (self.keys[self.w][lane], record[lane].data),
                Role::Input | Role::Prove => (Zp::ZERO, Zp::ZERO),
            };
            let key_share = KeyShare::input(session, key, mask)?;

            match M::ROLE {
                Role::Prove => {
                    self.buffer[self.w][lane] = record[lane].data - key_share.data;
                }
                Role::Input => {
                    self.buffer[self.w][lane] = record[lane].data;
                }
                Role::Verify | Role::Check => {}
            }
        }

        self.w += 1;
        Ok(())
    }

    /// Returns the record at the next position in access order.
    pub fn read(&mut self) -> Result<[Share<M>; WIDTH], ProtocolError> {
        if self.r == self.len() {
            return Err(ProtocolError::ProtocolViolation(format!(
                "read past the last of {} records",
                self.len()
            )));
        }
        let source = self.permutation[self.r] as usize;
        if matches!(M::ROLE, Role::Input | Role::Prove) && source >= self.w {
            return Err(ProtocolError::ProtocolViolation(format!(
                "read of slot {source} before its write"
            )));
        }

        let slot_shares = self.permuted_keys[self.r];
        let mut out = [Share::new(Zp::ZERO); WIDTH];
        for lane in 0..WIDTH {
            out[lane] = match M::ROLE {
                Role::Input => Share::new(self.buffer[source][lane]),
                Role::Prove => Share::new(self.buffer[source][lane] + slot_shares[lane].data),
                Role::Verify | Role::Check => Share::new(slot_shares[lane].data),
            };
        }

        self.r += 1;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::session::Session;
    use crate::protocols::share::{Input, Prove, Verify};
    use crate::utilities::ferret::{ferret_recv, ferret_send, lsb, xor_seed, Model};
    use crate::utilities::link::PipeLink;
    use crate::utilities::rng::rand_key;

    #[test]
    fn test_input_mode_round_trip() {
        let (mut link, _peer) = PipeLink::pair();
        let mut session = Session::<Input>::new(&mut link);
        let permutation = vec![3u32, 1, 0, 2];
        let mut ram = Roram::<Input, 2>::fresh(&mut session, 4, permutation.clone()).unwrap();

        for i in 0..4u64 {
            let value = Share::constant(&session, Zp::from(10 + i));
            let tag = Share::constant(&session, Zp::from(i));
            ram.write(&mut session, [value, tag]).unwrap();
        }

        for &source in &permutation {
            let record = ram.read().unwrap();
            assert_eq!(record[0].data, Zp::from(10 + u64::from(source)));
            assert_eq!(record[1].data, Zp::from(u64::from(source)));
        }
        assert!(ram.read().is_err());
    }

    #[test]
    fn test_permutation_length_must_match() {
        let (mut link, _peer) = PipeLink::pair();
        let mut session = Session::<Input>::new(&mut link);
        assert!(matches!(
            Roram::<Input, 1>::fresh(&mut session, 4, vec![0, 1]),
            Err(ProtocolError::CapacityExceeded(_))
        ));
    }

    #[test]
    fn test_read_before_write_is_rejected() {
        let (mut link, _peer) = PipeLink::pair();
        let mut session = Session::<Input>::new(&mut link);
        // Access order demands slot 1 first, but nothing is written.
        let mut ram = Roram::<Input, 1>::fresh(&mut session, 2, vec![1, 0]).unwrap();
        assert!(matches!(
            ram.read(),
            Err(ProtocolError::ProtocolViolation(_))
        ));
    }

    /// Paired Prove and Verify instances over one set of correlations:
    /// every lane of every record must reconstruct `value * delta`.
    #[test]
    fn test_prove_verify_reconstruction() {
        let n = 6;
        let permutation = vec![4u32, 0, 5, 2, 1, 3];
        let records: Vec<[Zp; 2]> = (0..n)
            .map(|i| [Zp::from(100 + i as u64), Zp::from(i as u64)])
            .collect();

        // Input pre-pass: count correlations and traffic.
        let (choices, n_ots, total_messages) = {
            let (mut link, _peer) = PipeLink::pair();
            let mut session = Session::<Input>::new(&mut link);
            let mut ram = Roram::<Input, 2>::fresh(&mut session, n, permutation.clone()).unwrap();
            for record in &records {
                let value = Share::constant(&session, record[0]);
                let tag = Share::constant(&session, record[1]);
                ram.write(&mut session, [value, tag]).unwrap();
            }
            for _ in 0..n {
                ram.read().unwrap();
            }
            (session.ot.choices.clone(), session.ot.n_ots, session.total_messages)
        };

        // Dealer plus offset alignment.
        let (mut verifier_link, mut prover_link) = PipeLink::pair();
        let ferret_delta = rand_key();
        let mut zeros =
            ferret_send(&mut verifier_link, Model::Malicious, n_ots, ferret_delta).unwrap();
        let receipts = ferret_recv(&mut prover_link, Model::Malicious, n_ots).unwrap();
        for i in 0..n_ots {
            let wanted = crate::utilities::ferret::block_bit(&choices, i);
            if wanted != lsb(receipts[i]) {
                zeros[i] = xor_seed(zeros[i], ferret_delta);
            }
        }

        // Verify side.
        let seed = rand_key();
        let mut verifier_outputs = Vec::new();
        let delta;
        {
            let mut session = Session::<Verify>::new(&mut verifier_link);
            session.ot.delta = ferret_delta;
            session.ot.zeros = zeros;
            session.seed(seed);
            session.draw_delta();
            delta = session.delta;

            let mut ram = Roram::<Verify, 2>::fresh(&mut session, n, permutation.clone()).unwrap();
            for record in &records {
                let value = Share::constant(&session, record[0]);
                let tag = Share::constant(&session, record[1]);
                ram.write(&mut session, [value, tag]).unwrap();
            }
            for _ in 0..n {
                verifier_outputs.push(ram.read().unwrap());
            }
            session.flush_remainder().unwrap();
        }

        // Prove side.
        let mut session = Session::<Prove>::new(&mut prover_link);
        session.ot.choices = choices;
        session.ot.receipts = receipts;
        session.expected_messages = total_messages;

        let mut ram = Roram::<Prove, 2>::fresh(&mut session, n, permutation.clone()).unwrap();
        for record in &records {
            let value = Share::constant(&session, record[0]);
            let tag = Share::constant(&session, record[1]);
            ram.write(&mut session, [value, tag]).unwrap();
        }
        for (position, &source) in permutation.iter().enumerate() {
            let prover_record = ram.read().unwrap();
            for lane in 0..2 {
                let reconstructed =
                    prover_record[lane].data + verifier_outputs[position][lane].data;
                assert_eq!(reconstructed, records[source as usize][lane] * delta);
            }
        }
    }
}
