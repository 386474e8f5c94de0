//! Proptest strategies for documents and operations

use convergedoc::shared::operation::char_len;
use convergedoc::shared::Operation;
use proptest::prelude::*;

/// Short text, including multi-byte characters
pub fn text_strategy(max_len: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(prop::sample::select(vec!['a', 'b', 'c', ' ', 'é', '字', '\n']), 0..=max_len)
        .prop_map(|chars| chars.into_iter().collect())
}

/// A non-empty insert or delete that is valid on a document of `len` chars
pub fn operation_strategy(len: usize) -> BoxedStrategy<Operation> {
    let insert = (0..=len, text_strategy(4).prop_filter("non-empty", |t| !t.is_empty()))
        .prop_map(|(position, text)| Operation::insert(position, text));

    if len == 0 {
        return insert.boxed();
    }

    let delete = (0..len)
        .prop_flat_map(move |position| (Just(position), 1..=len - position))
        .prop_map(|(position, length)| Operation::delete(position, length));

    prop_oneof![insert, delete].boxed()
}

/// A document and two operations generated concurrently against it
pub fn concurrent_pair_strategy() -> impl Strategy<Value = (String, Operation, Operation)> {
    text_strategy(12).prop_flat_map(|doc| {
        let len = char_len(&doc);
        (Just(doc), operation_strategy(len), operation_strategy(len))
    })
}

/// Raw material for one commit; turned into a valid operation once the
/// document length at the chosen base version is known
#[derive(Debug, Clone)]
pub struct CommitSeed {
    pub delete: bool,
    pub position: usize,
    pub length: usize,
    pub text: String,
    /// How many versions behind the head the submission is based
    pub lag: u64,
}

impl CommitSeed {
    /// An operation valid on a document of `len` chars
    pub fn operation(&self, len: usize) -> Operation {
        if self.delete && len > 0 {
            let position = self.position % len;
            let length = 1 + self.length % (len - position);
            Operation::delete(position, length)
        } else {
            Operation::insert(self.position % (len + 1), self.text.clone())
        }
    }
}

pub fn commit_seed_strategy() -> impl Strategy<Value = CommitSeed> {
    (
        any::<bool>(),
        any::<usize>(),
        any::<usize>(),
        text_strategy(4).prop_filter("non-empty", |t| !t.is_empty()),
        0u64..4,
    )
        .prop_map(|(delete, position, length, text, lag)| CommitSeed {
            delete,
            position,
            length,
            text,
            lag,
        })
}
