use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::config::{IndexKind, LinkMode};

/// Zero-based row number of a record within its data set.
pub type RecordId = usize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single raw row from an input data set.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub id: RecordId,
    pub fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(id: RecordId, fields: HashMap<String, String>) -> Self {
        Self { id, fields }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Pre-loaded records. `dataset_b` is only present in linkage mode.
pub struct LinkageInput {
    pub dataset_a: Vec<RawRecord>,
    pub dataset_b: Option<Vec<RawRecord>>,
}

// ---------------------------------------------------------------------------
// Standardized records
// ---------------------------------------------------------------------------

/// Canonical attributes derived from exactly one raw record.
///
/// Missing attributes are simply absent; empty values are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StandardizedRecord {
    pub id: RecordId,
    attributes: BTreeMap<String, String>,
}

impl StandardizedRecord {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            attributes: BTreeMap::new(),
        }
    }

    /// Attribute value, `None` when missing.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Store an attribute. Empty values are treated as missing and dropped.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.attributes.remove(name);
        } else {
            self.attributes.insert(name.to_string(), value);
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Candidate pairs + evidence
// ---------------------------------------------------------------------------

/// Two record ids to be compared.
///
/// Deduplication pairs are canonical (`a < b`); linkage pairs hold `a` from
/// data set A and `b` from data set B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CandidatePair {
    pub a: RecordId,
    pub b: RecordId,
}

impl CandidatePair {
    pub fn new(a: RecordId, b: RecordId) -> Self {
        Self { a, b }
    }

    /// `(min, max)` ordering used for deduplication.
    pub fn canonical(x: RecordId, y: RecordId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }
}

/// One weight per configured field comparator, in declared order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceVector {
    pub pair: CandidatePair,
    pub weights: Vec<f64>,
}

impl EvidenceVector {
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Match,
    PossibleMatch,
    NonMatch,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "match"),
            Self::PossibleMatch => write!(f, "possible_match"),
            Self::NonMatch => write!(f, "non_match"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub pair: CandidatePair,
    pub score: f64,
    pub decision: Decision,
    pub weights: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// A block that exceeded `max_block_size` and was not compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBlock {
    pub definition: usize,
    pub key: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    /// Inclusive lower edge of the bin.
    pub lower: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub bin_width: f64,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageSummary {
    pub records_a: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_b: Option<usize>,
    pub candidate_pairs: usize,
    pub matches: usize,
    pub possible_matches: usize,
    pub non_matches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned: Option<usize>,
    pub skipped_blocks: Vec<SkippedBlock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageMeta {
    pub config_name: String,
    pub mode: LinkMode,
    pub index: IndexKind,
    pub comparators: Vec<String>,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageResult {
    pub meta: LinkageMeta,
    pub summary: LinkageSummary,
    /// Results with a score at or above the output threshold, sorted by pair.
    pub results: Vec<ClassificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<Vec<ClassificationResult>>,
    pub histogram: Histogram,
}
