//! Exact blocking: all pairs that share a block.

use super::{make_pair, Block, Side};
use crate::model::CandidatePair;

/// Pairs within one block.
pub(crate) fn block_pairs(block: &Block, link: bool) -> Box<dyn Iterator<Item = CandidatePair> + '_> {
    if link {
        Box::new(
            block
                .a
                .iter()
                .flat_map(move |&x| block.b.iter().map(move |&y| CandidatePair::new(x, y))),
        )
    } else {
        let ids = &block.a;
        Box::new((0..ids.len()).flat_map(move |i| {
            (i + 1..ids.len()).filter_map(move |j| make_pair((Side::A, ids[i]), (Side::A, ids[j]), false))
        }))
    }
}

/// Pairs across two different blocks.
pub(crate) fn cross_pairs<'a>(
    x: &'a Block,
    y: &'a Block,
    link: bool,
) -> Box<dyn Iterator<Item = CandidatePair> + 'a> {
    if link {
        let forward = x.a.iter().flat_map(move |&a| y.b.iter().map(move |&b| CandidatePair::new(a, b)));
        let backward = y.a.iter().flat_map(move |&a| x.b.iter().map(move |&b| CandidatePair::new(a, b)));
        Box::new(forward.chain(backward))
    } else {
        Box::new(x.a.iter().flat_map(move |&p| {
            y.a.iter()
                .filter_map(move |&q| make_pair((Side::A, p), (Side::A, q), false))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(key: &str, a: &[usize], b: &[usize]) -> Block {
        Block {
            key: key.into(),
            a: a.to_vec(),
            b: b.to_vec(),
        }
    }

    fn collect(it: impl Iterator<Item = CandidatePair>) -> Vec<(usize, usize)> {
        it.map(|p| (p.a, p.b)).collect()
    }

    #[test]
    fn dedup_block_yields_each_pair_once() {
        let b = block("k", &[7, 2, 5], &[]);
        assert_eq!(collect(block_pairs(&b, false)), vec![(2, 7), (5, 7), (2, 5)]);
    }

    #[test]
    fn singleton_block_yields_nothing() {
        assert_eq!(block_pairs(&block("k", &[1], &[]), false).count(), 0);
        assert_eq!(block_pairs(&block("k", &[1], &[]), true).count(), 0);
    }

    #[test]
    fn link_block_crosses_sides() {
        let b = block("k", &[0, 1], &[5]);
        assert_eq!(collect(block_pairs(&b, true)), vec![(0, 5), (1, 5)]);
    }

    #[test]
    fn cross_pairs_in_both_directions_when_linking() {
        let x = block("x", &[0], &[10]);
        let y = block("y", &[1], &[11]);
        assert_eq!(collect(cross_pairs(&x, &y, true)), vec![(0, 11), (1, 10)]);
        assert_eq!(collect(cross_pairs(&x, &y, false)), vec![(0, 1)]);
    }
}
