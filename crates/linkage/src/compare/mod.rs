//! Field comparison: attribute differences → log-likelihood evidence.
//!
//! Every comparator maps two attribute values to a disagreement fraction
//! `f` in `[0, 1]` (or "missing"), and the fraction to a weight between the
//! agreement weight `log2(m/u)` and the disagreement weight
//! `log2((1-m)/(1-u))`.

mod age;
mod geo;
mod numeric;
mod string;

use std::sync::Arc;

pub use age::AgeComparator;
pub use geo::haversine_km;
pub use string::{approx_similarity, key_difference};

use crate::config::{ApproxMethod, ComparatorConfig, ComparatorMethod};
use crate::encode::{EncoderRegistry, KeyEncoder};
use crate::error::LinkageError;
use crate::model::{CandidatePair, EvidenceVector, StandardizedRecord};
use crate::resources::{GeocodeTable, Resources};

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub agree: f64,
    pub disagree: f64,
    pub missing: f64,
}

impl Weights {
    pub fn from_probabilities(m: f64, u: f64, missing: f64) -> Self {
        Self {
            agree: (m / u).log2(),
            disagree: ((1.0 - m) / (1.0 - u)).log2(),
            missing,
        }
    }

    /// Weight for disagreement fraction `f`: `f <= 0` agrees, `f >= 1`
    /// disagrees, anything between interpolates linearly.
    pub fn partial(&self, f: f64) -> f64 {
        if f <= 0.0 {
            self.agree
        } else if f >= 1.0 {
            self.disagree
        } else {
            self.agree - f * (self.agree + self.disagree.abs())
        }
    }
}

// ---------------------------------------------------------------------------
// Field comparators
// ---------------------------------------------------------------------------

/// A key encoder together with the name it was registered under.
#[derive(Clone)]
pub struct NamedEncoder {
    pub name: String,
    pub encoder: Arc<dyn KeyEncoder>,
}

impl std::fmt::Debug for NamedEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NamedEncoder({})", self.name)
    }
}

#[derive(Debug, Clone)]
pub enum Method {
    ExactString,
    TruncateString {
        max_string_length: usize,
    },
    EncodeString {
        encoder: NamedEncoder,
        max_code_length: Option<usize>,
        reverse: bool,
    },
    ApproxString {
        method: ApproxMethod,
        min_approx_value: f64,
    },
    KeyDiff {
        max_key_diff: usize,
    },
    NumericPerc {
        max_perc_diff: f64,
    },
    NumericAbs {
        max_abs_diff: f64,
    },
    Distance {
        table: Arc<GeocodeTable>,
        max_distance: f64,
    },
    Age(AgeComparator),
}

impl Method {
    /// Disagreement fraction of two present values; `None` when a value
    /// cannot be interpreted and the pair counts as missing.
    fn disagreement(&self, x: &str, y: &str) -> Option<f64> {
        match self {
            Self::ExactString => Some(string::exact(x, y)),
            Self::TruncateString { max_string_length } => Some(string::truncated(x, y, *max_string_length)),
            Self::EncodeString {
                encoder,
                max_code_length,
                reverse,
            } => string::encoded(encoder.encoder.as_ref(), x, y, *max_code_length, *reverse),
            Self::ApproxString {
                method,
                min_approx_value,
            } => Some(string::approx(*method, x, y, *min_approx_value)),
            Self::KeyDiff { max_key_diff } => Some(string::key_diff(x, y, *max_key_diff)),
            Self::NumericPerc { max_perc_diff } => numeric::percentage(x, y, *max_perc_diff),
            Self::NumericAbs { max_abs_diff } => numeric::absolute(x, y, *max_abs_diff),
            Self::Distance { table, max_distance } => geo::distance(table, x, y, *max_distance),
            Self::Age(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldComparator {
    label: String,
    fields_a: Vec<String>,
    fields_b: Vec<String>,
    weights: Weights,
    method: Method,
}

impl FieldComparator {
    pub fn new(label: impl Into<String>, field_a: &str, field_b: &str, weights: Weights, method: Method) -> Self {
        Self::with_fields(label, vec![field_a.to_string()], vec![field_b.to_string()], weights, method)
    }

    /// Several fields per side, as the age comparator's day/month/year.
    pub fn with_fields(
        label: impl Into<String>,
        fields_a: Vec<String>,
        fields_b: Vec<String>,
        weights: Weights,
        method: Method,
    ) -> Self {
        Self {
            label: label.into(),
            fields_a,
            fields_b,
            weights,
            method,
        }
    }

    pub fn assemble(
        config: &ComparatorConfig,
        resources: &Resources,
        registry: &EncoderRegistry,
    ) -> Result<Self, LinkageError> {
        let missing = config.missing_weight;
        let method = match &config.method {
            ComparatorMethod::ExactString => Method::ExactString,
            ComparatorMethod::TruncateString { max_string_length } => Method::TruncateString {
                max_string_length: *max_string_length,
            },
            ComparatorMethod::EncodeString {
                encode_method,
                max_code_length,
                reverse,
            } => Method::EncodeString {
                encoder: NamedEncoder {
                    name: encode_method.clone(),
                    encoder: registry.get(encode_method)?,
                },
                max_code_length: *max_code_length,
                reverse: *reverse,
            },
            ComparatorMethod::ApproxString {
                compare_method,
                min_approx_value,
            } => Method::ApproxString {
                method: *compare_method,
                min_approx_value: *min_approx_value,
            },
            ComparatorMethod::KeyDiff { max_key_diff } => Method::KeyDiff {
                max_key_diff: *max_key_diff,
            },
            ComparatorMethod::NumericPerc { max_perc_diff } => Method::NumericPerc {
                max_perc_diff: *max_perc_diff,
            },
            ComparatorMethod::NumericAbs { max_abs_diff } => Method::NumericAbs {
                max_abs_diff: *max_abs_diff,
            },
            ComparatorMethod::Distance {
                geocode_table,
                max_distance,
            } => Method::Distance {
                table: resources.geocode_table(geocode_table)?,
                max_distance: *max_distance,
            },
            ComparatorMethod::Age { .. } => Method::Age(AgeComparator::from_config(&config.method, missing)?),
        };

        let weights = match &method {
            Method::Age(age) => age.weights(),
            _ => {
                let (Some(m), Some(u)) = (config.m_prob, config.u_prob) else {
                    return Err(LinkageError::ConfigValidation(format!(
                        "comparator '{}': m_prob and u_prob are required",
                        config.label()
                    )));
                };
                Weights::from_probabilities(m, u, missing)
            }
        };

        Ok(Self {
            label: config.label(),
            fields_a: config.fields_a.as_slice().to_vec(),
            fields_b: config.fields_b.as_slice().to_vec(),
            weights,
            method,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    /// Weight of one attribute comparison. Missing on either side yields
    /// exactly the missing weight.
    pub fn compare(&self, a: &StandardizedRecord, b: &StandardizedRecord) -> f64 {
        if let Method::Age(age) = &self.method {
            let values = |rec: &StandardizedRecord, fields: &[String]| -> Vec<Option<String>> {
                fields.iter().map(|f| rec.get(f).map(str::to_string)).collect()
            };
            return age.compare(&values(a, &self.fields_a), &values(b, &self.fields_b));
        }

        let (Some(x), Some(y)) = (self.value(a, &self.fields_a), self.value(b, &self.fields_b)) else {
            return self.weights.missing;
        };
        match self.method.disagreement(x, y) {
            Some(f) => self.weights.partial(f),
            None => self.weights.missing,
        }
    }

    fn value<'r>(&self, rec: &'r StandardizedRecord, fields: &[String]) -> Option<&'r str> {
        fields.first().and_then(|f| rec.get(f))
    }
}

// ---------------------------------------------------------------------------
// Record comparator
// ---------------------------------------------------------------------------

/// All configured field comparators, in declared order.
#[derive(Debug, Clone)]
pub struct RecordComparator {
    comparators: Vec<FieldComparator>,
}

impl RecordComparator {
    pub fn new(comparators: Vec<FieldComparator>) -> Self {
        Self { comparators }
    }

    pub fn assemble(
        configs: &[ComparatorConfig],
        resources: &Resources,
        registry: &EncoderRegistry,
    ) -> Result<Self, LinkageError> {
        let comparators = configs
            .iter()
            .map(|c| FieldComparator::assemble(c, resources, registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(comparators))
    }

    pub fn compare(&self, pair: CandidatePair, a: &StandardizedRecord, b: &StandardizedRecord) -> EvidenceVector {
        EvidenceVector {
            pair,
            weights: self.comparators.iter().map(|c| c.compare(a, b)).collect(),
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.comparators.iter().map(|c| c.label().to_string()).collect()
    }

    pub fn comparators(&self) -> &[FieldComparator] {
        &self.comparators
    }

    pub fn len(&self) -> usize {
        self.comparators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::dmetaphone;

    fn rec(pairs: &[(&str, &str)]) -> StandardizedRecord {
        let mut r = StandardizedRecord::new(0);
        for (k, v) in pairs {
            r.set(k, *v);
        }
        r
    }

    fn weights() -> Weights {
        Weights::from_probabilities(0.95, 0.01, -0.5)
    }

    #[test]
    fn weights_from_probabilities() {
        let w = Weights::from_probabilities(0.9, 0.1, 0.0);
        assert!((w.agree - 3.169925).abs() < 1e-6);
        assert!((w.disagree + 3.169925).abs() < 1e-6);
    }

    #[test]
    fn partial_agreement_interpolates() {
        let w = Weights::from_probabilities(0.9, 0.1, 0.0);
        assert_eq!(w.partial(0.0), w.agree);
        assert_eq!(w.partial(1.0), w.disagree);
        assert_eq!(w.partial(3.0), w.disagree);
        assert!((w.partial(0.5) - 0.0).abs() < 1e-12);
        let q = w.partial(0.25);
        assert!(q < w.agree && q > w.disagree);
    }

    #[test]
    fn missing_either_side_is_exactly_missing_weight() {
        let c = FieldComparator::new("surname", "surname", "surname", weights(), Method::ExactString);
        let full = rec(&[("surname", "smith")]);
        let empty = rec(&[]);
        assert_eq!(c.compare(&full, &empty), -0.5);
        assert_eq!(c.compare(&empty, &full), -0.5);
        assert_eq!(c.compare(&empty, &empty), -0.5);
    }

    #[test]
    fn encoded_surnames_agree() {
        let c = FieldComparator::new(
            "surname",
            "surname",
            "surname",
            weights(),
            Method::EncodeString {
                encoder: NamedEncoder {
                    name: "dmetaphone".into(),
                    encoder: Arc::new(dmetaphone),
                },
                max_code_length: Some(4),
                reverse: false,
            },
        );
        let w = c.compare(&rec(&[("surname", "smith")]), &rec(&[("surname", "smyth")]));
        assert_eq!(w, weights().agree);
        assert!(w > 0.0);
    }

    #[test]
    fn record_comparator_keeps_declared_order() {
        let cmp = RecordComparator::new(vec![
            FieldComparator::new("given", "given_name", "given_name", weights(), Method::ExactString),
            FieldComparator::new(
                "surname",
                "surname",
                "surname",
                weights(),
                Method::ApproxString {
                    method: ApproxMethod::Winkler,
                    min_approx_value: 0.7,
                },
            ),
        ]);
        let a = rec(&[("given_name", "peter"), ("surname", "smith")]);
        let b = rec(&[("given_name", "paul"), ("surname", "smith")]);
        let v = cmp.compare(CandidatePair::new(0, 1), &a, &b);
        assert_eq!(v.weights.len(), 2);
        assert_eq!(v.weights[0], weights().disagree);
        assert_eq!(v.weights[1], weights().agree);
        assert_eq!(cmp.labels(), vec!["given", "surname"]);
    }
}
