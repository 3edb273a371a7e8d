use crate::config::ApproxMethod;
use crate::encode::KeyEncoder;

pub(super) fn exact(x: &str, y: &str) -> f64 {
    if x == y {
        0.0
    } else {
        1.0
    }
}

pub(super) fn truncated(x: &str, y: &str, len: usize) -> f64 {
    if x.chars().take(len).eq(y.chars().take(len)) {
        0.0
    } else {
        1.0
    }
}

/// Codes of both values; an empty code (nothing encodable) counts as missing.
pub(super) fn encoded(
    encoder: &dyn KeyEncoder,
    x: &str,
    y: &str,
    max_code_length: Option<usize>,
    reverse: bool,
) -> Option<f64> {
    let code = |value: &str| {
        if reverse {
            let reversed: String = value.chars().rev().collect();
            encoder.encode(&reversed, max_code_length)
        } else {
            encoder.encode(value, max_code_length)
        }
    };
    let (cx, cy) = (code(x), code(y));
    if cx.is_empty() || cy.is_empty() {
        return None;
    }
    Some(exact(&cx, &cy))
}

/// Similarity in `[0, 1]`, 1 for identical strings.
pub fn approx_similarity(method: ApproxMethod, x: &str, y: &str) -> f64 {
    if x == y {
        return 1.0;
    }
    // Greedy Jaro matching depends on argument order.
    let (x, y) = if x <= y { (x, y) } else { (y, x) };
    match method {
        ApproxMethod::Jaro => strsim::jaro(x, y),
        ApproxMethod::Winkler => strsim::jaro_winkler(x, y),
        ApproxMethod::Bigram => strsim::sorensen_dice(x, y),
        ApproxMethod::Editdist => strsim::normalized_levenshtein(x, y),
        ApproxMethod::Damerau => strsim::normalized_damerau_levenshtein(x, y),
    }
}

pub(super) fn approx(method: ApproxMethod, x: &str, y: &str, min: f64) -> f64 {
    let s = approx_similarity(method, x, y);
    if s >= 1.0 {
        0.0
    } else if s < min {
        1.0
    } else {
        (1.0 - s) / (1.0 - min)
    }
}

/// Differing character positions plus the length difference.
pub fn key_difference(x: &str, y: &str) -> usize {
    let (xs, ys): (Vec<char>, Vec<char>) = (x.chars().collect(), y.chars().collect());
    let positional = xs.iter().zip(&ys).filter(|(p, q)| p != q).count();
    positional + xs.len().abs_diff(ys.len())
}

pub(super) fn key_diff(x: &str, y: &str, max: usize) -> f64 {
    match key_difference(x, y) {
        0 => 0.0,
        d if d > max => 1.0,
        d => d as f64 / (max + 1) as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::soundex;

    #[test]
    fn exact_and_truncated() {
        assert_eq!(exact("peter", "peter"), 0.0);
        assert_eq!(exact("peter", "pete"), 1.0);
        assert_eq!(truncated("christine", "christina", 6), 0.0);
        assert_eq!(truncated("christine", "kristine", 6), 1.0);
        assert_eq!(truncated("jo", "joanne", 2), 0.0);
    }

    #[test]
    fn encoded_reverse_compares_suffixes() {
        let enc: &dyn KeyEncoder = &soundex;
        assert_eq!(encoded(enc, "smith", "smyth", None, false), Some(0.0));
        assert_eq!(encoded(enc, "miller", "muller", None, true), Some(0.0));
        assert_eq!(encoded(enc, "miller", "smith", None, true), Some(1.0));
        assert_eq!(encoded(enc, "123", "smith", None, false), None);
    }

    #[test]
    fn approx_thresholds() {
        assert_eq!(approx(ApproxMethod::Jaro, "martha", "martha", 0.8), 0.0);
        assert_eq!(approx(ApproxMethod::Editdist, "abcd", "wxyz", 0.5), 1.0);
        let f = approx(ApproxMethod::Editdist, "peter", "petra", 0.5);
        // levenshtein 2 over 5 chars: s = 0.6
        assert!((f - 0.8).abs() < 1e-9);
    }

    #[test]
    fn approx_methods_are_symmetric() {
        let words = [("dwayne", "duane"), ("martha", "marhta"), ("jones", "johnson"), ("a", "")];
        for method in [
            ApproxMethod::Jaro,
            ApproxMethod::Winkler,
            ApproxMethod::Bigram,
            ApproxMethod::Editdist,
            ApproxMethod::Damerau,
        ] {
            for (x, y) in words {
                let (s1, s2) = (approx_similarity(method, x, y), approx_similarity(method, y, x));
                assert!((s1 - s2).abs() < 1e-12, "{method:?} {x} {y}");
                assert!((0.0..=1.0).contains(&s1));
            }
        }
    }

    #[test]
    fn key_difference_counts_positions_and_length() {
        assert_eq!(key_difference("2600", "2600"), 0);
        assert_eq!(key_difference("2600", "2601"), 1);
        assert_eq!(key_difference("2600", "26001"), 1);
        assert_eq!(key_difference("1234", "2143"), 4);
        assert_eq!(key_diff("2600", "2601", 2), 1.0 / 3.0);
        assert_eq!(key_diff("2600", "2611", 2), 2.0 / 3.0);
        assert_eq!(key_diff("2600", "2711", 2), 1.0);
    }
}
