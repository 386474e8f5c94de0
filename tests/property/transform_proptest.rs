//! Property-based tests for the transform engine

use convergedoc::shared::operation::{apply_all, char_len};
use convergedoc::shared::{transform_pair, transform_sequences, Operation};
use proptest::prelude::*;

use crate::common::{concurrent_pair_strategy, operation_strategy, text_strategy};

fn apply_seq(doc: &str, ops: &[Operation]) -> String {
    apply_all(doc, ops).expect("transformed operations must apply")
}

proptest! {
    #[test]
    fn test_pair_converges((doc, a, b) in concurrent_pair_strategy()) {
        let (a_prime, b_prime) = transform_pair(&a, &b);

        let via_b = apply_seq(&apply_seq(&doc, &[b]), &a_prime);
        let via_a = apply_seq(&apply_seq(&doc, &[a]), &b_prime);
        prop_assert_eq!(via_b, via_a);
    }

    #[test]
    fn test_transformed_operations_are_never_empty_edits((_doc, a, b) in concurrent_pair_strategy()) {
        let (a_prime, b_prime) = transform_pair(&a, &b);
        for op in a_prime.iter().chain(b_prime.iter()) {
            match op {
                Operation::Insert { text, .. } => prop_assert!(!text.is_empty()),
                Operation::Delete { length, .. } => prop_assert!(*length > 0),
            }
        }
        prop_assert!(a_prime.len() <= 2 && b_prime.len() <= 2);
    }

    #[test]
    fn test_inserts_survive_transformation((_doc, a, b) in concurrent_pair_strategy()) {
        // Inserted text is never lost, whatever it is transformed against.
        if let Operation::Insert { text, .. } = &a {
            let (a_prime, _) = transform_pair(&a, &b);
            let inserted: String = a_prime
                .iter()
                .filter_map(|op| match op {
                    Operation::Insert { text, .. } => Some(text.as_str()),
                    Operation::Delete { .. } => None,
                })
                .collect();
            prop_assert_eq!(&inserted, text);
        }
    }

    #[test]
    fn test_sequences_converge(
        (doc, left, right) in text_strategy(10).prop_flat_map(|doc| {
            let len = char_len(&doc);
            (Just(doc), operation_strategy(len), operation_strategy(len))
        }).prop_flat_map(|(doc, first_left, first_right)| {
            let after_left = char_len(&apply_seq(&doc, &[first_left.clone()]));
            let after_right = char_len(&apply_seq(&doc, &[first_right.clone()]));
            (
                Just(doc),
                operation_strategy(after_left).prop_map(move |second| vec![first_left.clone(), second]),
                operation_strategy(after_right).prop_map(move |second| vec![first_right.clone(), second]),
            )
        })
    ) {
        let (left_prime, right_prime) = transform_sequences(&left, &right);

        let via_right = apply_seq(&apply_seq(&doc, &right), &left_prime);
        let via_left = apply_seq(&apply_seq(&doc, &left), &right_prime);
        prop_assert_eq!(via_right, via_left);
    }
}
