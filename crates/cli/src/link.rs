//! `relink run` / `relink validate` - config-driven record linkage.

use std::path::{Path, PathBuf};

use relink_linkage::config::DatasetConfig;
use relink_linkage::engine::{load_csv_records, Pipeline};
use relink_linkage::model::{LinkageInput, LinkageResult, RawRecord};
use relink_linkage::{LinkageConfig, LinkageError, Resources};

use crate::exit_codes::{linkage_exit_code, EXIT_CONFIG, EXIT_INPUT, EXIT_OUTPUT};
use crate::CliError;

fn link_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn engine_err(err: LinkageError) -> CliError {
    let hint = match &err {
        LinkageError::MissingColumn { .. } => Some("check the header row of the data set".to_string()),
        LinkageError::ResourceLoad { .. } => Some("reference file paths are relative to the config file".to_string()),
        _ => None,
    };
    CliError { code: linkage_exit_code(&err), message: err.to_string(), hint }
}

/// Parsed config plus the directory its relative paths resolve against.
struct LoadedConfig {
    config: LinkageConfig,
    base_dir: PathBuf,
}

fn load_config(config_path: &Path) -> Result<LoadedConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| link_err(EXIT_CONFIG, format!("cannot read config {}: {e}", config_path.display())))?;
    let config = LinkageConfig::from_toml(&config_str).map_err(engine_err)?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!(config = %config_path.display(), base_dir = %base_dir.display(), "config parsed");
    Ok(LoadedConfig { config, base_dir })
}

fn assemble(loaded: &LoadedConfig) -> Result<Pipeline, CliError> {
    let resources = Resources::load(&loaded.config, &loaded.base_dir).map_err(engine_err)?;
    Pipeline::assemble(&loaded.config, &resources).map_err(engine_err)
}

fn read_dataset(
    loaded: &LoadedConfig,
    pipeline: &Pipeline,
    name: &str,
    dataset: &DatasetConfig,
) -> Result<Vec<RawRecord>, CliError> {
    let path = loaded.base_dir.join(&dataset.file);
    let csv_data = std::fs::read_to_string(&path)
        .map_err(|e| link_err(EXIT_INPUT, format!("cannot read {}: {e}", path.display())))?;
    load_csv_records(name, &csv_data, dataset, &pipeline.required_columns()).map_err(engine_err)
}

pub fn cmd_run(config_path: PathBuf, json_output: bool, output_file: Option<PathBuf>) -> Result<(), CliError> {
    let loaded = load_config(&config_path)?;
    let pipeline = assemble(&loaded)?;

    let config = &loaded.config;
    let input = LinkageInput {
        dataset_a: read_dataset(&loaded, &pipeline, "dataset_a", &config.dataset_a)?,
        dataset_b: config
            .dataset_b
            .as_ref()
            .map(|ds| read_dataset(&loaded, &pipeline, "dataset_b", ds))
            .transpose()?,
    };

    let result = pipeline.run(&input).map_err(engine_err)?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| link_err(EXIT_OUTPUT, format!("JSON serialization error: {e}")))?;

    // --output wins over the config's [output] json path
    let target = output_file.or_else(|| config.output.json.as_ref().map(|p| loaded.base_dir.join(p)));
    if let Some(ref path) = target {
        std::fs::write(path, &json_str)
            .map_err(|e| link_err(EXIT_OUTPUT, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    eprintln!("{}", summary_line(&result));
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let loaded = load_config(&config_path)?;
    assemble(&loaded)?;
    let config = &loaded.config;
    eprintln!(
        "valid: {} '{}' with {} standardizer(s), {} key definition(s), {} comparator(s)",
        config.mode,
        config.name,
        config.standardizers.len(),
        config.index.definitions.len(),
        config.comparators.len(),
    );
    Ok(())
}

fn summary_line(result: &LinkageResult) -> String {
    let s = &result.summary;
    let records = match s.records_b {
        Some(b) => format!("{} x {} records", s.records_a, b),
        None => format!("{} records", s.records_a),
    };
    let mut line = format!(
        "{} ({}): {records}, {} candidate pairs: {} matches, {} possible, {} non-matches",
        result.meta.mode, result.meta.index, s.candidate_pairs, s.matches, s.possible_matches, s.non_matches,
    );
    if let Some(assigned) = s.assigned {
        line.push_str(&format!(", {assigned} assigned"));
    }
    if !s.skipped_blocks.is_empty() {
        line.push_str(&format!(", {} oversized block(s) skipped", s.skipped_blocks.len()));
    }
    line
}
