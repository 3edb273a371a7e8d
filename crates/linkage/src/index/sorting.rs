//! Sorted neighbourhood: a sliding window over records sorted by key.

use super::{make_pair, Block, Side};
use crate::model::{CandidatePair, RecordId};

/// All entries sorted by `(key, side, record id)`. Blocks arrive in key order.
pub(crate) fn sorted_entries(blocks: &[Block]) -> Vec<(Side, RecordId)> {
    let mut out = Vec::with_capacity(blocks.iter().map(Block::len).sum());
    for block in blocks {
        let mut a = block.a.clone();
        let mut b = block.b.clone();
        a.sort_unstable();
        b.sort_unstable();
        out.extend(a.into_iter().map(|id| (Side::A, id)));
        out.extend(b.into_iter().map(|id| (Side::B, id)));
    }
    out
}

/// Every pair whose sorted positions differ by less than `window_size`.
pub(crate) fn window_pairs(
    entries: &[(Side, RecordId)],
    window_size: usize,
    link: bool,
) -> Box<dyn Iterator<Item = CandidatePair> + '_> {
    let n = entries.len();
    Box::new((0..n).flat_map(move |i| {
        let end = (i + window_size).min(n);
        (i + 1..end).filter_map(move |j| make_pair(entries[i], entries[j], link))
    }))
}
