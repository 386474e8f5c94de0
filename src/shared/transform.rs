//! Operational Transformation
//!
//! Given two operations generated against the same document, the transform
//! functions produce equivalent operations that can be applied after the
//! other one. For an incoming operation `a` and an already-applied operation
//! `b`, [`transform_pair`] returns `(a', b')` such that
//!
//! ```text
//! apply(apply(doc, b), a') == apply(apply(doc, a), b')
//! ```
//!
//! The applied side always wins ties: two inserts at the same position keep
//! the applied insert first. The server commits operations in arrival order,
//! so the applied side is always the one that arrived earlier.
//!
//! A delete whose range straddles a concurrent insert is split into two
//! deletes around the inserted text, which is why every transform returns a
//! sequence. Pieces are emitted right to left, so each one is valid when the
//! sequence is applied in order.

use crate::shared::operation::{char_len, Operation};

/// Transform `incoming` against `applied`
///
/// Returns `(incoming', applied')`: `incoming'` applies after `applied`,
/// `applied'` applies after `incoming`. Either side may come back empty (a
/// delete that was fully covered) or split in two.
pub fn transform_pair(incoming: &Operation, applied: &Operation) -> (Vec<Operation>, Vec<Operation>) {
    use Operation::{Delete, Insert};

    match (incoming, applied) {
        (Insert { position: pa, text: ta }, Insert { position: pb, text: tb }) => {
            if pb <= pa {
                (
                    vec![Operation::insert(pa + char_len(tb), ta.clone())],
                    vec![applied.clone()],
                )
            } else {
                (
                    vec![incoming.clone()],
                    vec![Operation::insert(pb + char_len(ta), tb.clone())],
                )
            }
        }
        (Insert { position: pa, text }, Delete { position: pb, length: lb }) => {
            let (pa, pb, lb) = (*pa, *pb, *lb);
            let inserted = char_len(text);
            if pa <= pb {
                (vec![incoming.clone()], vec![Operation::delete(pb + inserted, lb)])
            } else if pa >= pb + lb {
                (vec![Operation::insert(pa - lb, text.clone())], vec![applied.clone()])
            } else {
                // The insert landed inside text that is gone: keep it at the
                // collapse point and delete around it.
                (
                    vec![Operation::insert(pb, text.clone())],
                    split_delete(pb, lb, pa, inserted),
                )
            }
        }
        (Delete { position: pa, length: la }, Insert { position: pb, text }) => {
            let (pa, la, pb) = (*pa, *la, *pb);
            let inserted = char_len(text);
            if pb <= pa {
                (vec![Operation::delete(pa + inserted, la)], vec![applied.clone()])
            } else if pb >= pa + la {
                (vec![incoming.clone()], vec![Operation::insert(pb - la, text.clone())])
            } else {
                (
                    split_delete(pa, la, pb, inserted),
                    vec![Operation::insert(pa, text.clone())],
                )
            }
        }
        (Delete { position: pa, length: la }, Delete { position: pb, length: lb }) => (
            shrink_delete(*pa, *la, *pb, *lb).into_iter().collect(),
            shrink_delete(*pb, *lb, *pa, *la).into_iter().collect(),
        ),
    }
}

/// Transform a sequence of incoming operations against a sequence of applied
/// operations
///
/// Both sequences are applied left to right. Returns `(incoming', applied')`
/// with the same meaning as [`transform_pair`].
pub fn transform_sequences(
    incoming: &[Operation],
    applied: &[Operation],
) -> (Vec<Operation>, Vec<Operation>) {
    if incoming.is_empty() || applied.is_empty() {
        return (incoming.to_vec(), applied.to_vec());
    }

    if incoming.len() > 1 {
        let (head, applied_after_head) = transform_sequences(&incoming[..1], applied);
        let (tail, applied_after_all) = transform_sequences(&incoming[1..], &applied_after_head);
        return ([head, tail].concat(), applied_after_all);
    }

    if applied.len() > 1 {
        let (after_first, first) = transform_sequences(incoming, &applied[..1]);
        let (after_all, rest) = transform_sequences(&after_first, &applied[1..]);
        return (after_all, [first, rest].concat());
    }

    transform_pair(&incoming[0], &applied[0])
}

/// Rewrite `incoming` so it applies after every operation in `committed`
pub fn transform_against<'a>(
    incoming: &[Operation],
    committed: impl IntoIterator<Item = &'a Operation>,
) -> Vec<Operation> {
    let committed: Vec<Operation> = committed.into_iter().cloned().collect();
    transform_sequences(incoming, &committed).0
}

/// Delete `[start, start + length)` after `inserted` characters were inserted
/// at `at`, with `start < at < start + length`
fn split_delete(start: usize, length: usize, at: usize, inserted: usize) -> Vec<Operation> {
    let left = at - start;
    vec![
        Operation::delete(at + inserted, length - left),
        Operation::delete(start, left),
    ]
}

/// What is left of deleting `[pos, pos + len)` once `[other, other + other_len)`
/// is already gone
fn shrink_delete(pos: usize, len: usize, other: usize, other_len: usize) -> Option<Operation> {
    let end = pos + len;
    let other_end = other + other_len;
    let overlap = end.min(other_end).saturating_sub(pos.max(other));
    let removed_before = if other < pos { other_end.min(pos) - other } else { 0 };
    let remaining = len - overlap;
    (remaining > 0).then(|| Operation::delete(pos - removed_before, remaining))
}
