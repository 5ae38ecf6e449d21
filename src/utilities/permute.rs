//! Permutation of authenticated values.
//!
//! The oblivious memory derives its access-pattern privacy from a
//! one-time permutation of per-slot key shares, applied before any
//! access happens. In the full system this reordering is an oblivious
//! switching-network sub-protocol; this crate realizes the same
//! interface by applying the permutation literally, which keeps all
//! four modes in identical control flow and consumes no correlations.

use crate::ProtocolError;

/// Reorders `items` in place: position `i` receives the element that
/// was at `permutation[i]`.
pub fn permute<T: Copy>(permutation: &[u32], items: &mut [T]) -> Result<(), ProtocolError> {
    if permutation.len() != items.len() {
        return Err(ProtocolError::CapacityExceeded(format!(
            "permutation of {} entries applied to {} items",
            permutation.len(),
            items.len()
        )));
    }
    let source: Vec<T> = items.to_vec();
    for (slot, &origin) in items.iter_mut().zip(permutation) {
        *slot = source[origin as usize];
    }
    Ok(())
}

/// Computes the stable partition of `0..choices.len()` by predicate
/// value: indices with a false predicate first, then true, original
/// relative order preserved within each group.
#[must_use]
pub fn partition_order(choices: &[bool]) -> Vec<u32> {
    let mut order: Vec<u32> = Vec::with_capacity(choices.len());
    for (index, &chosen) in choices.iter().enumerate() {
        if !chosen {
            order.push(index as u32);
        }
    }
    for (index, &chosen) in choices.iter().enumerate() {
        if chosen {
            order.push(index as u32);
        }
    }
    order
}

/// Stable-partitions `items` by `choices` and returns the applied
/// permutation.
pub fn partition<T: Copy>(choices: &[bool], items: &mut [T]) -> Result<Vec<u32>, ProtocolError> {
    let order = partition_order(choices);
    permute(&order, items)?;
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permute_reorders() {
        let mut items = [10, 20, 30, 40];
        permute(&[3, 1, 0, 2], &mut items).unwrap();
        assert_eq!(items, [40, 20, 10, 30]);
    }

    #[test]
    fn test_permute_length_mismatch() {
        let mut items = [1, 2, 3];
        assert!(permute(&[0, 1], &mut items).is_err());
    }

    #[test]
    fn test_partition_is_stable() {
        let choices = [false, true, false, false, false, true, false, false];
        let mut items = [0u64, 1, 2, 3, 4, 5, 6, 7];
        let order = partition(&choices, &mut items).unwrap();
        assert_eq!(order, vec![0, 2, 3, 4, 6, 7, 1, 5]);
        assert_eq!(items, [0, 2, 3, 4, 6, 7, 1, 5]);
    }

    #[test]
    fn test_partition_all_same_is_identity() {
        let mut items = [5u64, 6, 7];
        let order = partition(&[false, false, false], &mut items).unwrap();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(items, [5, 6, 7]);
    }
}
