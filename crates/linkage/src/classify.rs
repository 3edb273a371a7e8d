use crate::config::ClassifierConfig;
use crate::model::{ClassificationResult, Decision, EvidenceVector};

/// Turns an evidence vector into a scored decision.
pub trait Classifier: Send + Sync {
    fn classify(&self, vector: &EvidenceVector) -> ClassificationResult;
}

/// Sums the evidence and thresholds the total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FellegiSunter {
    pub lower: f64,
    pub upper: f64,
}

impl FellegiSunter {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn decide(&self, score: f64) -> Decision {
        if score >= self.upper {
            Decision::Match
        } else if score <= self.lower {
            Decision::NonMatch
        } else {
            Decision::PossibleMatch
        }
    }
}

impl Classifier for FellegiSunter {
    fn classify(&self, vector: &EvidenceVector) -> ClassificationResult {
        let score = vector.total();
        ClassificationResult {
            pair: vector.pair,
            score,
            decision: self.decide(score),
            weights: vector.weights.clone(),
        }
    }
}

pub fn from_config(config: &ClassifierConfig) -> Box<dyn Classifier> {
    match config {
        ClassifierConfig::FellegiSunter {
            lower_threshold,
            upper_threshold,
        } => Box::new(FellegiSunter::new(*lower_threshold, *upper_threshold)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidatePair;

    fn vector(weights: &[f64]) -> EvidenceVector {
        EvidenceVector {
            pair: CandidatePair::new(1, 4),
            weights: weights.to_vec(),
        }
    }

    #[test]
    fn thresholds_are_inclusive() {
        let fs = FellegiSunter::new(0.0, 10.0);
        assert_eq!(fs.decide(10.0), Decision::Match);
        assert_eq!(fs.decide(0.0), Decision::NonMatch);
        assert_eq!(fs.decide(5.0), Decision::PossibleMatch);
        assert_eq!(fs.decide(-3.0), Decision::NonMatch);
    }

    #[test]
    fn classify_sums_weights() {
        let fs = from_config(&ClassifierConfig::FellegiSunter {
            lower_threshold: 0.0,
            upper_threshold: 10.0,
        });
        let r = fs.classify(&vector(&[6.2, 4.5, -0.5]));
        assert!((r.score - 10.2).abs() < 1e-9);
        assert_eq!(r.decision, Decision::Match);
        assert_eq!(r.pair, CandidatePair::new(1, 4));
        assert_eq!(r.weights, vec![6.2, 4.5, -0.5]);
    }

    #[test]
    fn symmetric_thresholds() {
        let fs = FellegiSunter::new(-20.0, 20.0);
        assert_eq!(fs.decide(25.0), Decision::Match);
        assert_eq!(fs.decide(-25.0), Decision::NonMatch);
        assert_eq!(fs.decide(0.0), Decision::PossibleMatch);
    }

    #[test]
    fn raising_the_score_never_lowers_the_decision() {
        let rank = |d: Decision| match d {
            Decision::NonMatch => 0,
            Decision::PossibleMatch => 1,
            Decision::Match => 2,
        };
        let fs = FellegiSunter::new(-5.0, 12.5);
        let scores: Vec<f64> = (-40..=40).map(|s| s as f64 * 0.5).collect();
        for w in scores.windows(2) {
            assert!(rank(fs.decide(w[0])) <= rank(fs.decide(w[1])));
        }
    }

    #[test]
    fn equal_thresholds_leave_no_possible_band() {
        let fs = FellegiSunter::new(3.0, 3.0);
        assert_eq!(fs.decide(3.0), Decision::Match);
        assert_eq!(fs.decide(2.999), Decision::NonMatch);
    }
}
