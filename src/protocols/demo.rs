//! The demonstration protocol body: a stable partition of secret-
//! tagged values through the oblivious memory.
//!
//! The prover convinces the verifier that it partitioned a list of
//! values by a secret predicate without revealing the predicate. The
//! body is written once and instantiated under every mode; its claims
//! are settled entirely by zero checks, so the accept/reject outcome
//! falls out of the drivers' final digest comparison.

use crate::protocols::roram::Roram;
use crate::protocols::session::Session;
use crate::protocols::share::{Mode, Share};
use crate::protocols::ProtocolBody;
use crate::utilities::field::Zp;
use crate::utilities::permute::partition;
use crate::ProtocolError;

/// Partitions `values` by `predicate` inside the oblivious memory and
/// proves two aggregate facts: the multiset of records is preserved,
/// and the predicate selects exactly `true_count` elements.
#[derive(Debug, Clone)]
pub struct PartitionDemo {
    pub values: Vec<u64>,
    pub predicate: Vec<bool>,
}

impl PartitionDemo {
    /// The 8-element reference scenario.
    #[must_use]
    pub fn reference() -> PartitionDemo {
        PartitionDemo {
            values: (0..8).collect(),
            predicate: vec![false, true, false, false, false, true, false, false],
        }
    }
}

impl ProtocolBody for PartitionDemo {
    fn run<M: Mode>(&self, session: &mut Session<M>) -> Result<(), ProtocolError> {
        assert_eq!(self.values.len(), self.predicate.len());
        let n = self.values.len();

        let shares: Vec<Share<M>> = self
            .values
            .iter()
            .map(|&value| Share::constant(session, Zp::from(value)))
            .collect();

        // The predicate enters as authenticated prover bits.
        let mut bits = Vec::with_capacity(n);
        for &bit in &self.predicate {
            bits.push(Share::input_bit(session, bit)?);
        }

        // Group the shares by predicate value, stably.
        let mut grouped = shares.clone();
        let order = partition(&self.predicate, &mut grouped)?;

        // Pass everything through the oblivious memory: write in
        // original order, read back in partition order.
        let mut ram = Roram::<M, 2>::fresh(session, n, order)?;
        let mut written_sum = Share::constant(session, Zp::ZERO);
        for (index, share) in shares.iter().enumerate() {
            let tag = Share::constant(session, Zp::from(index as u64));
            ram.write(session, [*share, tag])?;
            written_sum = written_sum + *share;
        }

        let mut read_sum = Share::constant(session, Zp::ZERO);
        for position in 0..n {
            let record = ram.read()?;
            read_sum = read_sum + record[0];
            // The reads must surface the grouped order.
            (record[0] - grouped[position]).assert_zero(session)?;
        }

        // Multiset preservation.
        (read_sum - written_sum).assert_zero(session)?;

        // The predicate selects exactly the announced count.
        let true_count = self.predicate.iter().filter(|&&bit| bit).count() as u64;
        let mut bit_sum = Share::constant(session, Zp::ZERO);
        for bit in bits {
            bit_sum = bit_sum + bit;
        }
        (bit_sum - Share::constant(session, Zp::from(true_count))).assert_zero(session)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::share::Input;
    use crate::utilities::link::PipeLink;
    use crate::utilities::permute::partition_order;

    /// The reference scenario's partition, in the clear.
    #[test]
    fn test_reference_partition_is_stable() {
        let demo = PartitionDemo::reference();
        let order = partition_order(&demo.predicate);
        assert_eq!(order, vec![0, 2, 3, 4, 6, 7, 1, 5]);
    }

    /// The cleartext instantiation must satisfy all of its own checks.
    #[test]
    fn test_input_mode_accepts() {
        let demo = PartitionDemo::reference();
        let (mut link, _peer) = PipeLink::pair();
        let mut session = Session::<Input>::new(&mut link);
        demo.run(&mut session).unwrap();
        assert_eq!(session.ot.n_ots, 8 + 16);
    }

    /// A cleartext run with an inconsistent claim must fail its zero
    /// check immediately.
    #[test]
    fn test_input_mode_rejects_bad_claim() {
        let (mut link, _peer) = PipeLink::pair();
        let mut session = Session::<Input>::new(&mut link);
        let one = Share::<Input>::constant(&session, Zp::from(1));
        assert!(one.assert_zero(&mut session).is_err());
    }
}
