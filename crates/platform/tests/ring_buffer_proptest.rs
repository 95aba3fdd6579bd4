//! Property-based tests for the byte ring buffer.
//! Verifies FIFO and capacity invariants for arbitrary push/pop sequences,
//! not just fixed examples.

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;

use platform::ByteRing;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Push(Vec<u8>),
    PushEvicting(Vec<u8>),
    Pop(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..24).prop_map(Op::Push),
        proptest::collection::vec(any::<u8>(), 0..24).prop_map(Op::PushEvicting),
        (0usize..32).prop_map(Op::Pop),
    ]
}

proptest! {
    /// The ring behaves like an unbounded FIFO clipped to its capacity.
    #[test]
    fn ring_matches_reference_fifo(cap in 0usize..40, ops in proptest::collection::vec(op(), 0..64)) {
        let mut storage = vec![0u8; cap];
        let ring = ByteRing::new(&mut storage);
        let mut model: VecDeque<u8> = VecDeque::new();

        for op in ops {
            match op {
                Op::Push(data) => {
                    let fits = data.len() <= cap - model.len();
                    prop_assert_eq!(ring.push(&data).is_ok(), fits);
                    if fits {
                        model.extend(data);
                    }
                }
                Op::PushEvicting(data) => {
                    let result = ring.push_evicting(&data);
                    if data.len() > cap {
                        prop_assert!(result.is_err());
                    } else {
                        let overflow = (model.len() + data.len()).saturating_sub(cap);
                        prop_assert_eq!(result.ok(), Some(overflow));
                        model.drain(..overflow);
                        model.extend(data);
                    }
                }
                Op::Pop(n) => {
                    let mut out = vec![0u8; n];
                    let got = ring.pop_into(&mut out);
                    let expected: Vec<u8> = model.drain(..n.min(model.len())).collect();
                    prop_assert_eq!(&out[..got], &expected[..]);
                }
            }
            prop_assert_eq!(ring.len(), model.len());
            prop_assert!(ring.len() <= ring.capacity());
            prop_assert_eq!(ring.free(), cap - model.len());
        }
    }

    /// A rejected push never changes the queued bytes.
    #[test]
    fn rejected_push_leaves_ring_untouched(fill in 1usize..16, extra in 1usize..16) {
        let mut storage = vec![0u8; fill];
        let ring = ByteRing::new(&mut storage);
        let first: Vec<u8> = (0..fill).map(|i| i as u8).collect();
        ring.push(&first).unwrap();
        prop_assert!(ring.push(&vec![0xAA; extra]).is_err());
        let mut out = vec![0u8; fill];
        prop_assert_eq!(ring.pop_into(&mut out), fill);
        prop_assert_eq!(out, first);
    }
}
