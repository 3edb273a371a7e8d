use std::cmp::Reverse;
use std::collections::HashSet;

use ordered_float::OrderedFloat;

use crate::config::LinkMode;
use crate::model::{ClassificationResult, Decision, RecordId};

/// Greedy one-to-one assignment over match decisions.
///
/// Matches are visited by descending score, ties by ascending `(a, b)`; a pair
/// is kept only when neither record has been assigned yet. In deduplication
/// both ids live in one id space, in linkage mode each data set has its own.
pub fn one_to_one(results: &[ClassificationResult], mode: LinkMode) -> Vec<ClassificationResult> {
    let mut matches: Vec<&ClassificationResult> =
        results.iter().filter(|r| r.decision == Decision::Match).collect();
    matches.sort_by_key(|r| (Reverse(OrderedFloat(r.score)), r.pair));

    let mut used_a: HashSet<RecordId> = HashSet::new();
    let mut used_b: HashSet<RecordId> = HashSet::new();
    let mut accepted = Vec::new();

    for r in matches {
        let (a, b) = (r.pair.a, r.pair.b);
        let free = match mode {
            LinkMode::Deduplicate => !used_a.contains(&a) && !used_a.contains(&b),
            LinkMode::Link => !used_a.contains(&a) && !used_b.contains(&b),
        };
        if !free {
            continue;
        }
        match mode {
            LinkMode::Deduplicate => {
                used_a.insert(a);
                used_a.insert(b);
            }
            LinkMode::Link => {
                used_a.insert(a);
                used_b.insert(b);
            }
        }
        accepted.push(r.clone());
    }
    accepted
}
