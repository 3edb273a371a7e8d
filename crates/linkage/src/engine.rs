use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use crate::assignment::one_to_one;
use crate::classify::{self, Classifier};
use crate::compare::RecordComparator;
use crate::config::{AssignmentMode, DatasetConfig, IndexKind, LinkMode, LinkageConfig, OutputConfig};
use crate::encode::EncoderRegistry;
use crate::error::LinkageError;
use crate::evidence::{compute_summary, score_histogram};
use crate::index::IndexSpec;
use crate::model::{
    ClassificationResult, LinkageInput, LinkageMeta, LinkageResult, RawRecord, RecordId, StandardizedRecord,
};
use crate::resources::Resources;
use crate::standardize::RecordStandardizer;

/// A configuration resolved against its resources, ready to process records.
pub struct Pipeline {
    config_name: String,
    mode: LinkMode,
    index_kind: IndexKind,
    block_size: usize,
    standardizer_a: RecordStandardizer,
    standardizer_b: Option<RecordStandardizer>,
    index: IndexSpec,
    comparator: RecordComparator,
    classifier: Box<dyn Classifier>,
    output: OutputConfig,
}

impl Pipeline {
    pub fn assemble(config: &LinkageConfig, resources: &Resources) -> Result<Self, LinkageError> {
        Self::assemble_with(config, resources, &EncoderRegistry::default())
    }

    /// Like [`Pipeline::assemble`] with a caller-supplied encoder registry.
    pub fn assemble_with(
        config: &LinkageConfig,
        resources: &Resources,
        registry: &EncoderRegistry,
    ) -> Result<Self, LinkageError> {
        let standardizer_a = RecordStandardizer::assemble(&config.standardizers, &config.dataset_a, resources)?;
        let standardizer_b = config
            .dataset_b
            .as_ref()
            .map(|ds| RecordStandardizer::assemble(&config.standardizers, ds, resources))
            .transpose()?;

        Ok(Self {
            config_name: config.name.clone(),
            mode: config.mode,
            index_kind: config.index.kind,
            block_size: config.block_size,
            standardizer_a,
            standardizer_b,
            index: IndexSpec::assemble(&config.index, registry)?,
            comparator: RecordComparator::assemble(&config.comparators, resources, registry)?,
            classifier: classify::from_config(&config.classifier),
            output: config.output.clone(),
        })
    }

    /// Raw columns the standardizers read, in first-use order.
    pub fn required_columns(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.standardizer_a
            .input_fields()
            .filter(|f| seen.insert(*f))
            .map(str::to_string)
            .collect()
    }

    pub fn run(&self, input: &LinkageInput) -> Result<LinkageResult, LinkageError> {
        let records_b = match (self.mode, &input.dataset_b, &self.standardizer_b) {
            (LinkMode::Link, Some(b), Some(std_b)) => Some((b, std_b)),
            (LinkMode::Link, _, _) => {
                return Err(LinkageError::ConfigValidation(
                    "link mode requires records for dataset_b".into(),
                ));
            }
            (LinkMode::Deduplicate, _, _) => None,
        };

        let started = Instant::now();
        let std_a = self.standardizer_a.standardize_all(&input.dataset_a);
        let std_b = records_b.map(|(raw, standardizer)| standardizer.standardize_all(raw));
        info!(
            records_a = std_a.len(),
            records_b = ?std_b.as_ref().map(Vec::len),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "standardization finished"
        );

        let started = Instant::now();
        let index = self.index.build(&std_a, std_b.as_deref());
        info!(
            skipped_blocks = index.skipped_blocks().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index built"
        );

        let lookup_a = by_id(&std_a);
        let lookup_b = match &std_b {
            Some(b) => by_id(b),
            None => lookup_a.clone(),
        };

        let started = Instant::now();
        let mut results: Vec<ClassificationResult> = Vec::new();
        let mut candidates = index.candidates();
        loop {
            let chunk: Vec<_> = candidates.by_ref().take(self.block_size).collect();
            if chunk.is_empty() {
                break;
            }
            results.par_extend(chunk.par_iter().filter_map(|pair| {
                let (a, b) = (lookup_a.get(&pair.a)?, lookup_b.get(&pair.b)?);
                Some(self.classifier.classify(&self.comparator.compare(*pair, a, b)))
            }));
        }
        results.sort_by_key(|r| r.pair);
        info!(
            candidate_pairs = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "comparison finished"
        );

        let mut summary = compute_summary(&results, std_a.len(), std_b.as_ref().map(Vec::len));
        summary.skipped_blocks = index.skipped_blocks().to_vec();

        let assignment = self.output.assignment.map(|mode| match mode {
            AssignmentMode::OneToOne => one_to_one(&results, self.mode),
        });
        summary.assigned = assignment.as_ref().map(Vec::len);

        let histogram = score_histogram(&results, self.output.histogram_bin_width);
        if let Some(threshold) = self.output.threshold {
            results.retain(|r| r.score >= threshold);
        }

        info!(
            matches = summary.matches,
            possible_matches = summary.possible_matches,
            non_matches = summary.non_matches,
            "classification finished"
        );

        Ok(LinkageResult {
            meta: LinkageMeta {
                config_name: self.config_name.clone(),
                mode: self.mode,
                index: self.index_kind,
                comparators: self.comparator.labels(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            summary,
            results,
            assignment,
            histogram,
        })
    }
}

fn by_id(records: &[StandardizedRecord]) -> HashMap<RecordId, &StandardizedRecord> {
    records.iter().map(|r| (r.id, r)).collect()
}

/// Assemble the pipeline for `config` and run it over `input`.
pub fn run(config: &LinkageConfig, resources: &Resources, input: &LinkageInput) -> Result<LinkageResult, LinkageError> {
    Pipeline::assemble(config, resources)?.run(input)
}

/// Load CSV rows into raw records. The id of a record is its zero-based row
/// number in the file; `first_record` and `number_records` select a window.
pub fn load_csv_records(
    dataset_name: &str,
    csv_data: &str,
    dataset: &DatasetConfig,
    required_columns: &[String],
) -> Result<Vec<RawRecord>, LinkageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LinkageError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if let Some(column) = required_columns.iter().find(|c| !headers.contains(*c)) {
        return Err(LinkageError::MissingColumn {
            dataset: dataset_name.into(),
            column: column.clone(),
        });
    }

    let mut records = Vec::new();
    let limit = dataset.number_records.unwrap_or(usize::MAX);
    for (row, record) in reader.records().enumerate().skip(dataset.first_record).take(limit) {
        let record = record.map_err(|e| LinkageError::Io(format!("{dataset_name}: {e}")))?;
        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        records.push(RawRecord::new(row, fields));
    }

    info!(dataset = dataset_name, records = records.len(), "data set loaded");
    Ok(records)
}
