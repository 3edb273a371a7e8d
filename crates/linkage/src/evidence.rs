use std::collections::BTreeMap;

use crate::model::{ClassificationResult, Decision, Histogram, HistogramBin, LinkageSummary};

/// Per-decision counts over all classified candidate pairs.
///
/// `assigned` and `skipped_blocks` are left for the caller to fill in.
pub fn compute_summary(
    results: &[ClassificationResult],
    records_a: usize,
    records_b: Option<usize>,
) -> LinkageSummary {
    let mut matches = 0;
    let mut possible_matches = 0;
    let mut non_matches = 0;

    for r in results {
        match r.decision {
            Decision::Match => matches += 1,
            Decision::PossibleMatch => possible_matches += 1,
            Decision::NonMatch => non_matches += 1,
        }
    }

    LinkageSummary {
        records_a,
        records_b,
        candidate_pairs: results.len(),
        matches,
        possible_matches,
        non_matches,
        assigned: None,
        skipped_blocks: Vec::new(),
    }
}

/// Score histogram with bins `[k*w, (k+1)*w)`. Bins between the lowest and
/// highest occupied bin are listed even when empty.
pub fn score_histogram(results: &[ClassificationResult], bin_width: f64) -> Histogram {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for r in results.iter().filter(|r| r.score.is_finite()) {
        *counts.entry((r.score / bin_width).floor() as i64).or_insert(0) += 1;
    }

    let bins = match (counts.keys().next(), counts.keys().next_back()) {
        (Some(&lo), Some(&hi)) => (lo..=hi)
            .map(|k| HistogramBin {
                lower: k as f64 * bin_width,
                count: counts.get(&k).copied().unwrap_or(0),
            })
            .collect(),
        _ => Vec::new(),
    };

    Histogram { bin_width, bins }
}
