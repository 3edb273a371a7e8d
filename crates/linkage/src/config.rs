use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LinkageError;
use crate::standardize::{ADDRESS_SLOTS, NAME_SLOTS};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LinkageConfig {
    pub name: String,
    #[serde(default)]
    pub mode: LinkMode,
    /// Candidate pairs compared per parallel chunk.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    pub dataset_a: DatasetConfig,
    #[serde(default)]
    pub dataset_b: Option<DatasetConfig>,
    #[serde(default)]
    pub lookup_tables: BTreeMap<String, LookupTableConfig>,
    #[serde(default)]
    pub correction_lists: BTreeMap<String, ResourceFile>,
    #[serde(default)]
    pub geocode_tables: BTreeMap<String, ResourceFile>,
    #[serde(default)]
    pub hmms: BTreeMap<String, ResourceFile>,
    #[serde(default)]
    pub standardizers: Vec<StandardizerConfig>,
    pub index: IndexConfig,
    pub comparators: Vec<ComparatorConfig>,
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_block_size() -> usize {
    1000
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// Find duplicates within data set A.
    #[default]
    Deduplicate,
    /// Link records of data set A to records of data set B.
    Link,
}

impl std::fmt::Display for LinkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deduplicate => write!(f, "deduplicate"),
            Self::Link => write!(f, "link"),
        }
    }
}

// ---------------------------------------------------------------------------
// Data sets + resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub file: String,
    /// Literal tokens that mean "no value".
    #[serde(default = "default_missing_values")]
    pub missing_values: Vec<String>,
    #[serde(default)]
    pub first_record: usize,
    #[serde(default)]
    pub number_records: Option<usize>,
}

fn default_missing_values() -> Vec<String> {
    vec![String::new()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupTableConfig {
    pub files: Vec<String>,
    /// Tag for tokens not found in the table. Empty means "UN".
    #[serde(default)]
    pub default: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceFile {
    pub file: String,
}

/// One field name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct FieldList(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for FieldList {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => Self(vec![s]),
            OneOrMany::Many(v) => Self(v),
        }
    }
}

impl FieldList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Standardizers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StandardizerConfig {
    Date(DateStandardizerConfig),
    NameRules(NameStandardizerConfig),
    NameHmm(NameStandardizerConfig),
    AddressHmm(AddressStandardizerConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateStandardizerConfig {
    pub input_fields: FieldList,
    /// `[day, month, year]`.
    pub output_fields: Vec<String>,
    #[serde(default = "default_date_formats")]
    pub parse_formats: Vec<String>,
}

pub fn default_date_formats() -> Vec<String> {
    [
        "%d %m %Y", "%d %B %Y", "%m %d %Y", "%B %d %Y", "%Y %m %d", "%Y %B %d", "%Y%m%d",
        "%d%m%Y", "%m%d%Y", "%d %m %y", "%d %B %y", "%y %m %d", "%y %B %d", "%m %d %y",
        "%B %d %y", "%y%m%d", "%d%m%y", "%m%d%y",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameStandardizerConfig {
    pub input_fields: FieldList,
    /// `[title, gender_guess, given_name, alt_given_name, surname, alt_surname]`.
    pub output_fields: Vec<String>,
    pub lookup_table: String,
    #[serde(default)]
    pub correction_list: Option<String>,
    /// Required for `name_hmm`, ignored by `name_rules`.
    #[serde(default)]
    pub hmm: Option<String>,
    #[serde(default)]
    pub male_titles: Vec<String>,
    #[serde(default)]
    pub female_titles: Vec<String>,
    #[serde(default = "default_field_separator")]
    pub field_separator: String,
    #[serde(default)]
    pub check_word_spill: bool,
    #[serde(default)]
    pub rubbish_field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressStandardizerConfig {
    pub input_fields: FieldList,
    /// The sixteen address slots, in `ADDRESS_SLOTS` order.
    pub output_fields: Vec<String>,
    pub lookup_table: String,
    #[serde(default)]
    pub correction_list: Option<String>,
    pub hmm: String,
    #[serde(default = "default_field_separator")]
    pub field_separator: String,
    #[serde(default)]
    pub check_word_spill: bool,
    #[serde(default)]
    pub rubbish_field: Option<String>,
    /// Receives the Viterbi path probability.
    #[serde(default)]
    pub prob_field: Option<String>,
}

fn default_field_separator() -> String {
    " ".into()
}

impl StandardizerConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Date(_) => "date",
            Self::NameRules(_) => "name_rules",
            Self::NameHmm(_) => "name_hmm",
            Self::AddressHmm(_) => "address_hmm",
        }
    }

    pub fn input_fields(&self) -> &FieldList {
        match self {
            Self::Date(c) => &c.input_fields,
            Self::NameRules(c) | Self::NameHmm(c) => &c.input_fields,
            Self::AddressHmm(c) => &c.input_fields,
        }
    }

    /// Every attribute this standardizer can write.
    pub fn produced(&self) -> Vec<&str> {
        let (outputs, extra): (&[String], Vec<&Option<String>>) = match self {
            Self::Date(c) => (&c.output_fields, vec![]),
            Self::NameRules(c) | Self::NameHmm(c) => (&c.output_fields, vec![&c.rubbish_field]),
            Self::AddressHmm(c) => (&c.output_fields, vec![&c.rubbish_field, &c.prob_field]),
        };
        outputs
            .iter()
            .map(String::as_str)
            .chain(extra.into_iter().filter_map(|o| o.as_deref()))
            .filter(|s| !s.is_empty())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Blocking,
    Sorting,
    Bigram,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocking => write!(f, "blocking"),
            Self::Sorting => write!(f, "sorting"),
            Self::Bigram => write!(f, "bigram"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    pub kind: IndexKind,
    /// Sorted-neighbourhood window, counted in records.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Minimum bigram Dice similarity between two keys.
    #[serde(default = "default_bigram_threshold")]
    pub threshold: f64,
    /// Blocks larger than this are skipped with a warning.
    #[serde(default)]
    pub max_block_size: Option<usize>,
    /// Alternative key definitions ("OR of ANDs").
    pub definitions: Vec<Vec<KeyPartConfig>>,
}

fn default_window_size() -> usize {
    3
}

fn default_bigram_threshold() -> f64 {
    0.75
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyPartConfig {
    pub field: String,
    pub encode: String,
    #[serde(default)]
    pub param: Option<usize>,
}

// ---------------------------------------------------------------------------
// Comparators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ComparatorConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub fields_a: FieldList,
    pub fields_b: FieldList,
    #[serde(default)]
    pub m_prob: Option<f64>,
    #[serde(default)]
    pub u_prob: Option<f64>,
    #[serde(default)]
    pub missing_weight: f64,
    #[serde(flatten)]
    pub method: ComparatorMethod,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparatorMethod {
    ExactString,
    TruncateString {
        max_string_length: usize,
    },
    EncodeString {
        encode_method: String,
        #[serde(default)]
        max_code_length: Option<usize>,
        #[serde(default)]
        reverse: bool,
    },
    ApproxString {
        compare_method: ApproxMethod,
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
        geocode_table: String,
        max_distance: f64,
    },
    Age {
        m_probability_day: f64,
        u_probability_day: f64,
        m_probability_month: f64,
        u_probability_month: f64,
        m_probability_year: f64,
        u_probability_year: f64,
        max_perc_diff: f64,
        #[serde(default)]
        fix_date: FixDate,
    },
}

impl ComparatorMethod {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExactString => "exact_string",
            Self::TruncateString { .. } => "truncate_string",
            Self::EncodeString { .. } => "encode_string",
            Self::ApproxString { .. } => "approx_string",
            Self::KeyDiff { .. } => "key_diff",
            Self::NumericPerc { .. } => "numeric_perc",
            Self::NumericAbs { .. } => "numeric_abs",
            Self::Distance { .. } => "distance",
            Self::Age { .. } => "age",
        }
    }
}

impl ComparatorConfig {
    /// Display label: explicit name, else `kind(field)`.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => {
                let fields = if self.fields_a.is_empty() { &self.fields_b } else { &self.fields_a };
                format!("{}({})", self.method.kind(), fields.as_slice().join("+"))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproxMethod {
    Jaro,
    Winkler,
    Bigram,
    Editdist,
    Damerau,
}

/// Reference date ages are computed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum FixDate {
    #[default]
    Today,
    Date(NaiveDate),
}

impl TryFrom<String> for FixDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.eq_ignore_ascii_case("today") {
            return Ok(Self::Today);
        }
        NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .map(Self::Date)
            .map_err(|_| format!("fix_date must be \"today\" or YYYY-MM-DD, got \"{value}\""))
    }
}

impl FixDate {
    pub fn resolve(&self) -> NaiveDate {
        match self {
            Self::Today => chrono::Local::now().date_naive(),
            Self::Date(d) => *d,
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierConfig {
    FellegiSunter {
        lower_threshold: f64,
        upper_threshold: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AssignmentMode {
    #[serde(rename = "one2one")]
    OneToOne,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    /// Only results scoring at least this much are reported.
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub assignment: Option<AssignmentMode>,
    #[serde(default = "default_bin_width")]
    pub histogram_bin_width: f64,
}

fn default_bin_width() -> f64 {
    1.0
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: None,
            threshold: None,
            assignment: None,
            histogram_bin_width: default_bin_width(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkageConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkageError> {
        let config: LinkageConfig =
            toml::from_str(input).map_err(|e| LinkageError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// All attributes the configured standardizers can produce.
    pub fn produced_attributes(&self) -> BTreeSet<&str> {
        self.standardizers.iter().flat_map(|s| s.produced()).collect()
    }

    pub fn validate(&self) -> Result<(), LinkageError> {
        match (self.mode, &self.dataset_b) {
            (LinkMode::Link, None) => {
                return Err(invalid("mode = \"link\" requires a [dataset_b] section"));
            }
            (LinkMode::Deduplicate, Some(_)) => {
                return Err(invalid("[dataset_b] is only used with mode = \"link\""));
            }
            _ => {}
        }
        if self.block_size == 0 {
            return Err(invalid("block_size must be at least 1"));
        }

        for (i, std) in self.standardizers.iter().enumerate() {
            self.validate_standardizer(i + 1, std)?;
        }

        let produced = self.produced_attributes();
        self.validate_index(&produced)?;

        if self.comparators.is_empty() {
            return Err(invalid("at least one comparator is required"));
        }
        for (i, cmp) in self.comparators.iter().enumerate() {
            self.validate_comparator(i + 1, cmp, &produced)?;
        }

        match self.classifier {
            ClassifierConfig::FellegiSunter {
                lower_threshold,
                upper_threshold,
            } => {
                if lower_threshold > upper_threshold {
                    return Err(invalid(format!(
                        "classifier: lower_threshold ({lower_threshold}) exceeds upper_threshold ({upper_threshold})"
                    )));
                }
            }
        }

        if !(self.output.histogram_bin_width > 0.0) {
            return Err(invalid("output.histogram_bin_width must be positive"));
        }

        Ok(())
    }

    fn validate_standardizer(&self, n: usize, std: &StandardizerConfig) -> Result<(), LinkageError> {
        let ctx = format!("standardizer {n} ({})", std.kind());
        if std.input_fields().is_empty() {
            return Err(invalid(format!("{ctx}: input_fields is empty")));
        }
        match std {
            StandardizerConfig::Date(c) => {
                expect_slots(&ctx, &c.output_fields, 3)?;
                if c.parse_formats.is_empty() {
                    return Err(invalid(format!("{ctx}: parse_formats is empty")));
                }
            }
            StandardizerConfig::NameRules(c) | StandardizerConfig::NameHmm(c) => {
                expect_slots(&ctx, &c.output_fields, NAME_SLOTS.len())?;
                self.expect_lookup(&c.lookup_table, c.correction_list.as_deref())?;
                if let StandardizerConfig::NameHmm(_) = std {
                    let hmm = c
                        .hmm
                        .as_deref()
                        .ok_or_else(|| invalid(format!("{ctx}: 'hmm' is required")))?;
                    self.expect_hmm(hmm)?;
                }
            }
            StandardizerConfig::AddressHmm(c) => {
                expect_slots(&ctx, &c.output_fields, ADDRESS_SLOTS.len())?;
                self.expect_lookup(&c.lookup_table, c.correction_list.as_deref())?;
                self.expect_hmm(&c.hmm)?;
            }
        }
        Ok(())
    }

    fn expect_lookup(&self, table: &str, corrections: Option<&str>) -> Result<(), LinkageError> {
        if !self.lookup_tables.contains_key(table) {
            return Err(LinkageError::UnknownResource {
                kind: "lookup table",
                name: table.into(),
            });
        }
        if let Some(list) = corrections {
            if !self.correction_lists.contains_key(list) {
                return Err(LinkageError::UnknownResource {
                    kind: "correction list",
                    name: list.into(),
                });
            }
        }
        Ok(())
    }

    fn expect_hmm(&self, name: &str) -> Result<(), LinkageError> {
        if self.hmms.contains_key(name) {
            Ok(())
        } else {
            Err(LinkageError::UnknownResource {
                kind: "hmm",
                name: name.into(),
            })
        }
    }

    fn validate_index(&self, produced: &BTreeSet<&str>) -> Result<(), LinkageError> {
        let index = &self.index;
        if index.definitions.is_empty() {
            return Err(invalid("index: at least one key definition is required"));
        }
        for (i, def) in index.definitions.iter().enumerate() {
            if def.is_empty() {
                return Err(invalid(format!("index definition {}: is empty", i + 1)));
            }
            for part in def {
                if !produced.contains(part.field.as_str()) {
                    return Err(LinkageError::UnknownAttribute {
                        context: format!("index definition {}", i + 1),
                        attribute: part.field.clone(),
                    });
                }
            }
        }
        match index.kind {
            IndexKind::Sorting if index.window_size < 2 => {
                Err(invalid("index: window_size must be at least 2"))
            }
            IndexKind::Bigram if !(index.threshold > 0.0 && index.threshold <= 1.0) => Err(invalid(
                format!("index: threshold must be in (0, 1], got {}", index.threshold),
            )),
            _ if index.max_block_size.is_some_and(|m| m < 2) => {
                Err(invalid("index: max_block_size must be at least 2"))
            }
            _ => Ok(()),
        }
    }

    fn validate_comparator(
        &self,
        n: usize,
        cmp: &ComparatorConfig,
        produced: &BTreeSet<&str>,
    ) -> Result<(), LinkageError> {
        let ctx = format!("comparator {n} ({})", cmp.method.kind());

        let is_age = matches!(cmp.method, ComparatorMethod::Age { .. });
        let arity = if is_age { 3 } else { 1 };
        if is_age && cmp.fields_a.is_empty() && cmp.fields_b.is_empty() {
            return Err(invalid(format!("{ctx}: at least one side needs day, month and year fields")));
        }
        for fields in [&cmp.fields_a, &cmp.fields_b] {
            // an age side without fields stands for fix_date
            if is_age && fields.is_empty() {
                continue;
            }
            if fields.len() != arity {
                return Err(invalid(format!(
                    "{ctx}: expected {arity} field(s) per side, got {}",
                    fields.len()
                )));
            }
            for f in fields.as_slice() {
                if !produced.contains(f.as_str()) {
                    return Err(LinkageError::UnknownAttribute {
                        context: ctx.clone(),
                        attribute: f.clone(),
                    });
                }
            }
        }

        match &cmp.method {
            ComparatorMethod::Age {
                m_probability_day,
                u_probability_day,
                m_probability_month,
                u_probability_month,
                m_probability_year,
                u_probability_year,
                max_perc_diff,
                ..
            } => {
                check_probabilities(&format!("{ctx} day"), *m_probability_day, *u_probability_day)?;
                check_probabilities(
                    &format!("{ctx} month"),
                    *m_probability_month,
                    *u_probability_month,
                )?;
                check_probabilities(&format!("{ctx} year"), *m_probability_year, *u_probability_year)?;
                check_positive(&ctx, "max_perc_diff", *max_perc_diff)?;
                return Ok(());
            }
            ComparatorMethod::TruncateString { max_string_length } if *max_string_length == 0 => {
                return Err(invalid(format!("{ctx}: max_string_length must be at least 1")));
            }
            ComparatorMethod::ApproxString { min_approx_value, .. }
                if !(0.0..1.0).contains(min_approx_value) =>
            {
                return Err(invalid(format!(
                    "{ctx}: min_approx_value must be in [0, 1), got {min_approx_value}"
                )));
            }
            ComparatorMethod::NumericPerc { max_perc_diff } => {
                check_positive(&ctx, "max_perc_diff", *max_perc_diff)?
            }
            ComparatorMethod::NumericAbs { max_abs_diff } => {
                check_positive(&ctx, "max_abs_diff", *max_abs_diff)?
            }
            ComparatorMethod::Distance {
                geocode_table,
                max_distance,
            } => {
                check_positive(&ctx, "max_distance", *max_distance)?;
                if !self.geocode_tables.contains_key(geocode_table) {
                    return Err(LinkageError::UnknownResource {
                        kind: "geocode table",
                        name: geocode_table.clone(),
                    });
                }
            }
            _ => {}
        }

        let m = cmp
            .m_prob
            .ok_or_else(|| invalid(format!("{ctx}: m_prob is required")))?;
        let u = cmp
            .u_prob
            .ok_or_else(|| invalid(format!("{ctx}: u_prob is required")))?;
        check_probabilities(&ctx, m, u)
    }
}

fn invalid(msg: impl Into<String>) -> LinkageError {
    LinkageError::ConfigValidation(msg.into())
}

fn expect_slots(ctx: &str, outputs: &[String], expected: usize) -> Result<(), LinkageError> {
    if outputs.len() != expected {
        return Err(invalid(format!(
            "{ctx}: output_fields needs {expected} entries, got {}",
            outputs.len()
        )));
    }
    Ok(())
}

fn check_positive(ctx: &str, what: &str, value: f64) -> Result<(), LinkageError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{ctx}: {what} must be positive, got {value}")))
    }
}

/// `0 < u < m < 1`; anything else would make the log-likelihood weights meaningless.
pub fn check_probabilities(ctx: &str, m: f64, u: f64) -> Result<(), LinkageError> {
    if !(m > 0.0 && m < 1.0 && u > 0.0 && u < 1.0) {
        return Err(invalid(format!(
            "{ctx}: m and u must lie strictly between 0 and 1 (m={m}, u={u})"
        )));
    }
    if m <= u {
        return Err(invalid(format!("{ctx}: m ({m}) must be greater than u ({u})")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "MDC dedup"

[dataset_a]
file = "mdc.csv"
missing_values = ["", "missing"]

[lookup_tables.name]
files = ["name.tbl"]

[correction_lists.name]
file = "name_corr.lst"

[hmms.name]
file = "name.hmm.json"

[[standardizers]]
kind = "date"
input_fields = "omdob"
output_fields = ["mother_day", "mother_month", "mother_year"]

[[standardizers]]
kind = "name_hmm"
input_fields = ["gname", "sname"]
output_fields = ["title", "gender_guess", "given_name", "alt_given_name", "surname", "alt_surname"]
lookup_table = "name"
correction_list = "name"
hmm = "name"
male_titles = ["mr"]
female_titles = ["ms"]
check_word_spill = true

[index]
kind = "blocking"
definitions = [
  [{ field = "surname", encode = "dmetaphone", param = 4 }, { field = "mother_year", encode = "direct" }],
  [{ field = "given_name", encode = "truncate", param = 3 }],
]

[[comparators]]
kind = "encode_string"
fields_a = "surname"
fields_b = "surname"
m_prob = 0.95
u_prob = 0.001
encode_method = "dmetaphone"

[[comparators]]
kind = "age"
fields_a = ["mother_day", "mother_month", "mother_year"]
fields_b = ["mother_day", "mother_month", "mother_year"]
m_probability_day = 0.95
u_probability_day = 0.03333
m_probability_month = 0.95
u_probability_month = 0.083
m_probability_year = 0.95
u_probability_year = 0.01
max_perc_diff = 10.0
fix_date = "2002-06-30"

[classifier]
kind = "fellegi_sunter"
lower_threshold = -20.0
upper_threshold = 20.0

[output]
assignment = "one2one"
"#;

    #[test]
    fn parse_valid_config() {
        let config = LinkageConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "MDC dedup");
        assert_eq!(config.mode, LinkMode::Deduplicate);
        assert_eq!(config.block_size, 1000);
        assert_eq!(config.dataset_a.missing_values, vec!["", "missing"]);
        assert_eq!(config.standardizers.len(), 2);
        assert_eq!(config.standardizers[0].input_fields().as_slice(), &["omdob"]);
        assert_eq!(config.index.kind, IndexKind::Blocking);
        assert_eq!(config.index.window_size, 3);
        assert_eq!(config.index.definitions[0][0].param, Some(4));
        assert_eq!(config.index.definitions[0][1].param, None);
        assert_eq!(config.comparators.len(), 2);
        assert_eq!(
            config.comparators[0].method,
            ComparatorMethod::EncodeString {
                encode_method: "dmetaphone".into(),
                max_code_length: None,
                reverse: false,
            }
        );
        assert_eq!(config.comparators[0].missing_weight, 0.0);
        match &config.comparators[1].method {
            ComparatorMethod::Age { fix_date, .. } => {
                assert_eq!(*fix_date, FixDate::Date(NaiveDate::from_ymd_opt(2002, 6, 30).unwrap()));
            }
            other => panic!("expected age comparator, got {other:?}"),
        }
        assert_eq!(config.output.assignment, Some(AssignmentMode::OneToOne));
        assert_eq!(config.output.histogram_bin_width, 1.0);
    }

    #[test]
    fn produced_attributes_skip_empty_slots() {
        let config = LinkageConfig::from_toml(VALID).unwrap();
        let produced = config.produced_attributes();
        assert!(produced.contains("surname"));
        assert!(produced.contains("mother_year"));
        assert!(!produced.contains(""));
    }

    #[test]
    fn reject_m_not_above_u() {
        let input = VALID.replacen("u_prob = 0.001", "u_prob = 0.95", 1);
        let err = LinkageConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("must be greater than u"), "{err}");
        assert!(err.is_config_error());
    }

    #[test]
    fn reject_unknown_blocking_attribute() {
        let input = VALID.replacen(
            "{ field = \"given_name\", encode = \"truncate\", param = 3 }",
            "{ field = \"postcode\", encode = \"direct\" }",
            1,
        );
        let err = LinkageConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, LinkageError::UnknownAttribute { ref attribute, .. } if attribute == "postcode"));
    }

    #[test]
    fn reject_threshold_order() {
        let input = VALID.replacen("lower_threshold = -20.0", "lower_threshold = 30.0", 1);
        let err = LinkageConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("exceeds upper_threshold"));
    }

    #[test]
    fn reject_link_without_second_dataset() {
        let input = VALID.replacen("name = \"MDC dedup\"", "name = \"x\"\nmode = \"link\"", 1);
        let err = LinkageConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("dataset_b"));
    }

    #[test]
    fn reject_wrong_slot_count() {
        let input = VALID.replacen(
            "output_fields = [\"mother_day\", \"mother_month\", \"mother_year\"]",
            "output_fields = [\"mother_day\", \"mother_year\"]",
            1,
        );
        let err = LinkageConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("needs 3 entries"));
    }

    #[test]
    fn reject_undeclared_hmm() {
        let input = VALID.replacen("hmm = \"name\"", "hmm = \"address\"", 1);
        let err = LinkageConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, LinkageError::UnknownResource { kind: "hmm", .. }));
    }

    #[test]
    fn reject_bad_fix_date() {
        let input = VALID.replacen("fix_date = \"2002-06-30\"", "fix_date = \"yesterday\"", 1);
        let err = LinkageConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, LinkageError::ConfigParse(_)));
    }

    const AGE_FIELDS_B: &str = "fields_b = [\"mother_day\", \"mother_month\", \"mother_year\"]";

    #[test]
    fn age_side_may_be_left_to_fix_date() {
        let input = VALID.replacen(AGE_FIELDS_B, "fields_b = []", 1);
        let config = LinkageConfig::from_toml(&input).unwrap();
        assert!(config.comparators[1].fields_b.is_empty());
        assert_eq!(config.comparators[1].label(), "age(mother_day+mother_month+mother_year)");
    }

    #[test]
    fn reject_age_without_any_fields() {
        let input = VALID
            .replacen(AGE_FIELDS_B, "fields_b = []", 1)
            .replacen("fields_a = [\"mother_day\", \"mother_month\", \"mother_year\"]", "fields_a = []", 1);
        let err = LinkageConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("at least one side"), "{err}");
    }

    #[test]
    fn reject_partial_age_side() {
        let input = VALID.replacen(AGE_FIELDS_B, "fields_b = [\"mother_day\", \"mother_year\"]", 1);
        let err = LinkageConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("expected 3 field(s)"), "{err}");
    }

    #[test]
    fn probabilities_must_be_open_interval() {
        assert!(check_probabilities("c", 0.9, 0.1).is_ok());
        assert!(check_probabilities("c", 1.0, 0.1).is_err());
        assert!(check_probabilities("c", 0.9, 0.0).is_err());
        assert!(check_probabilities("c", 0.5, 0.5).is_err());
    }
}
