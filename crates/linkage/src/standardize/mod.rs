//! Raw record → standardized record.
//!
//! A [`RecordStandardizer`] runs an ordered list of field standardizers. Each
//! one reads a few raw input fields and writes canonical attributes. Missing
//! inputs are passed as empty strings so positional field roles survive.

mod address;
mod date;
mod name;
mod tokens;

use std::collections::HashSet;

use rayon::prelude::*;

pub use address::AddressStandardizer;
pub use date::DateStandardizer;
pub use name::{NameMethod, NameStandardizer};
pub use tokens::{TagScheme, Token, TokenPipeline, FIELD_BOUNDARY};

use crate::config::{DatasetConfig, StandardizerConfig};
use crate::error::LinkageError;
use crate::hmm::HmmModel;
use crate::model::{RawRecord, StandardizedRecord};
use crate::resources::{Resources, UNKNOWN_TAG};

/// Name output slots, in `output_fields` order.
pub const NAME_SLOTS: [&str; 6] = [
    "title",
    "gender_guess",
    "given_name",
    "alt_given_name",
    "surname",
    "alt_surname",
];

/// Address output slots, in `output_fields` order.
pub const ADDRESS_SLOTS: [&str; 16] = [
    "wayfare_number",
    "wayfare_name",
    "wayfare_qualifier",
    "wayfare_type",
    "unit_number",
    "unit_type",
    "property_name",
    "institution_name",
    "institution_type",
    "postaddress_number",
    "postaddress_type",
    "locality_name",
    "locality_qualifier",
    "postcode",
    "territory",
    "country",
];

/// Upper bound on tag combinations decoded per field.
pub const MAX_TAG_COMBINATIONS: usize = 1024;

/// One field standardizer: reads `input_fields`, writes attributes.
pub trait Standardize {
    fn input_fields(&self) -> &[String];

    /// `values` holds one entry per input field, `""` for missing ones.
    fn standardize(&self, values: &[&str], out: &mut StandardizedRecord);
}

#[derive(Debug, Clone)]
pub enum FieldStandardizer {
    Date(DateStandardizer),
    Name(NameStandardizer),
    Address(AddressStandardizer),
}

impl FieldStandardizer {
    pub fn assemble(config: &StandardizerConfig, resources: &Resources) -> Result<Self, LinkageError> {
        Ok(match config {
            StandardizerConfig::Date(c) => Self::Date(DateStandardizer::new(c)),
            StandardizerConfig::NameRules(c) => {
                Self::Name(NameStandardizer::assemble(c, NameMethod::Rules, resources)?)
            }
            StandardizerConfig::NameHmm(c) => {
                let hmm_name = c.hmm.as_deref().ok_or_else(|| {
                    LinkageError::ConfigValidation("name_hmm standardizer: 'hmm' is required".into())
                })?;
                let method = NameMethod::Hmm(resources.hmm(hmm_name)?);
                Self::Name(NameStandardizer::assemble(c, method, resources)?)
            }
            StandardizerConfig::AddressHmm(c) => Self::Address(AddressStandardizer::assemble(c, resources)?),
        })
    }
}

impl Standardize for FieldStandardizer {
    fn input_fields(&self) -> &[String] {
        match self {
            Self::Date(s) => s.input_fields(),
            Self::Name(s) => s.input_fields(),
            Self::Address(s) => s.input_fields(),
        }
    }

    fn standardize(&self, values: &[&str], out: &mut StandardizedRecord) {
        match self {
            Self::Date(s) => s.standardize(values, out),
            Self::Name(s) => s.standardize(values, out),
            Self::Address(s) => s.standardize(values, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Record standardizer
// ---------------------------------------------------------------------------

/// All field standardizers for one data set.
#[derive(Debug, Clone)]
pub struct RecordStandardizer {
    missing_values: HashSet<String>,
    standardizers: Vec<FieldStandardizer>,
}

impl RecordStandardizer {
    pub fn new(missing_values: &[String], standardizers: Vec<FieldStandardizer>) -> Self {
        Self {
            missing_values: missing_values.iter().map(|m| m.trim().to_string()).collect(),
            standardizers,
        }
    }

    pub fn assemble(
        configs: &[StandardizerConfig],
        dataset: &DatasetConfig,
        resources: &Resources,
    ) -> Result<Self, LinkageError> {
        let standardizers = configs
            .iter()
            .map(|c| FieldStandardizer::assemble(c, resources))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(&dataset.missing_values, standardizers))
    }

    /// Every raw field name some standardizer reads.
    pub fn input_fields(&self) -> impl Iterator<Item = &str> {
        self.standardizers
            .iter()
            .flat_map(|s| s.input_fields().iter().map(String::as_str))
    }

    fn is_missing(&self, value: &str) -> bool {
        value.is_empty() || self.missing_values.contains(value)
    }

    pub fn standardize(&self, raw: &RawRecord) -> StandardizedRecord {
        let mut out = StandardizedRecord::new(raw.id);
        for field in &self.standardizers {
            let values: Vec<&str> = field
                .input_fields()
                .iter()
                .map(|f| {
                    let v = raw.field(f).unwrap_or("").trim();
                    if self.is_missing(v) {
                        ""
                    } else {
                        v
                    }
                })
                .collect();
            field.standardize(&values, &mut out);
        }

        let missing: Vec<String> = out
            .attributes()
            .filter(|(_, v)| self.missing_values.contains(*v))
            .map(|(k, _)| k.to_string())
            .collect();
        for name in missing {
            out.set(&name, "");
        }
        out
    }

    /// Standardize a whole data set in parallel, keeping input order.
    pub fn standardize_all(&self, records: &[RawRecord]) -> Vec<StandardizedRecord> {
        records.par_iter().map(|r| self.standardize(r)).collect()
    }
}

// ---------------------------------------------------------------------------
// HMM helpers shared by the name and address standardizers
// ---------------------------------------------------------------------------

/// Best decoding over the tag combinations of a token sequence.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Decoded {
    pub states: Vec<usize>,
    /// Index into each token's `entries` of the tag that was decoded.
    pub choice: Vec<usize>,
    pub log_probability: f64,
}

pub(crate) fn decode(hmm: &HmmModel, tokens: &[Token]) -> Decoded {
    let mut radix = Vec::with_capacity(tokens.len());
    let mut combos = 1usize;
    let mut capped = false;
    for t in tokens {
        let k = t.entries.len().max(1);
        if !capped && combos.saturating_mul(k) <= MAX_TAG_COMBINATIONS {
            combos *= k;
            radix.push(k);
        } else {
            capped = true;
            radix.push(1);
        }
    }

    let mut best = Decoded {
        states: Vec::new(),
        choice: vec![0; tokens.len()],
        log_probability: f64::NEG_INFINITY,
    };
    let mut choice = vec![0usize; tokens.len()];
    for _ in 0..combos {
        let tags: Vec<&str> = tokens
            .iter()
            .zip(&choice)
            .map(|(t, &c)| t.entries.get(c).map_or(UNKNOWN_TAG, |e| e.tag.as_str()))
            .collect();
        let path = hmm.viterbi(&tags);
        if best.states.is_empty() || path.log_probability > best.log_probability {
            best = Decoded {
                states: path.states,
                choice: choice.clone(),
                log_probability: path.log_probability,
            };
        }
        for (c, &r) in choice.iter_mut().zip(&radix) {
            *c += 1;
            if *c < r {
                break;
            }
            *c = 0;
        }
    }
    best
}

/// Where a decoded token goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Slot(usize),
    Rubbish,
    Drop,
}

/// Collects token texts per slot. A `-` token glues its neighbours when both
/// land in the same slot; field boundaries are never written.
pub(crate) struct SlotWriter {
    parts: Vec<Vec<String>>,
    last: Option<usize>,
    glue: bool,
}

impl SlotWriter {
    pub fn new(slots: usize) -> Self {
        Self {
            parts: vec![Vec::new(); slots + 1],
            last: None,
            glue: false,
        }
    }

    fn rubbish_index(&self) -> usize {
        self.parts.len() - 1
    }

    pub fn push(&mut self, target: Target, text: &str) {
        if text == "-" {
            self.glue = true;
            return;
        }
        let target = if text == FIELD_BOUNDARY { Target::Drop } else { target };
        let slot = match target {
            Target::Slot(s) => s,
            Target::Rubbish => self.rubbish_index(),
            Target::Drop => {
                self.last = None;
                self.glue = false;
                return;
            }
        };
        match self.parts[slot].last_mut() {
            Some(prev) if self.glue && self.last == Some(slot) => {
                prev.push('-');
                prev.push_str(text);
            }
            _ => self.parts[slot].push(text.to_string()),
        }
        self.last = Some(slot);
        self.glue = false;
    }

    pub fn slot(&self, index: usize, separator: &str) -> String {
        self.parts[index].join(separator)
    }

    pub fn rubbish(&self, separator: &str) -> String {
        self.parts[self.rubbish_index()].join(separator)
    }
}

/// Write slot values to their configured output attributes; `""` drops a slot.
pub(crate) fn write_outputs(
    out: &mut StandardizedRecord,
    outputs: &[String],
    values: impl IntoIterator<Item = String>,
) {
    for (name, value) in outputs.iter().zip(values) {
        if !name.is_empty() {
            out.set(name, value);
        }
    }
}
