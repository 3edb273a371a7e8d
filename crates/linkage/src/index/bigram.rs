//! Bigram indexing: keys are linked when their bigram sets are similar.

use std::collections::{BTreeMap, HashMap};

use super::Block;

/// Distinct bigrams of `key`, sorted. A one-character key is its own bigram.
pub(crate) fn bigrams(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 2 {
        return if key.is_empty() { Vec::new() } else { vec![key.to_string()] };
    }
    let mut grams: Vec<String> = chars.windows(2).map(|w| w.iter().collect()).collect();
    grams.sort_unstable();
    grams.dedup();
    grams
}

/// Block links `(i, j)`, `i <= j`, whose keys reach `threshold`. Every block
/// is linked to itself. Similar keys are found through an inverted bigram
/// index, so unrelated keys are never scored.
pub(crate) fn link_keys(blocks: &[Block], threshold: f64) -> Vec<(usize, usize)> {
    let grams: Vec<Vec<String>> = blocks.iter().map(|b| bigrams(&b.key)).collect();
    let mut inverted: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, set) in grams.iter().enumerate() {
        for gram in set {
            inverted.entry(gram.as_str()).or_default().push(i);
        }
    }

    let mut links = Vec::with_capacity(blocks.len());
    for (i, set) in grams.iter().enumerate() {
        links.push((i, i));
        let mut shared: BTreeMap<usize, usize> = BTreeMap::new();
        for gram in set {
            for &j in inverted.get(gram.as_str()).into_iter().flatten() {
                if j > i {
                    *shared.entry(j).or_default() += 1;
                }
            }
        }
        for (j, common) in shared {
            // Dice coefficient 2|A∩B| / (|A|+|B|)
            let score = 2.0 * common as f64 / (set.len() + grams[j].len()) as f64;
            if score >= threshold {
                links.push((i, j));
            }
        }
    }
    links
}
