//! Read-only reference data: tag tables, correction lists, geocodes, HMMs.
//!
//! Everything is loaded once, before any record is read, and shared through
//! `Arc` with the pipeline stages that need it.

mod correction;
mod geocode;
mod lookup;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub use correction::CorrectionList;
pub use geocode::GeocodeTable;
pub use lookup::{LookupTable, TagEntry, UNKNOWN_TAG};

use crate::config::LinkageConfig;
use crate::error::LinkageError;
use crate::hmm::HmmModel;

#[derive(Debug, Clone, Default)]
pub struct Resources {
    lookup_tables: BTreeMap<String, Arc<LookupTable>>,
    correction_lists: BTreeMap<String, Arc<CorrectionList>>,
    geocode_tables: BTreeMap<String, Arc<GeocodeTable>>,
    hmms: BTreeMap<String, Arc<HmmModel>>,
}

impl Resources {
    /// Load every resource the config declares. Paths are relative to `base_dir`.
    /// Any failure aborts: the pipeline never runs on partial reference data.
    pub fn load(config: &LinkageConfig, base_dir: &Path) -> Result<Self, LinkageError> {
        let mut res = Self::default();

        for (name, table) in &config.lookup_tables {
            let files: Vec<_> = table.files.iter().map(|f| base_dir.join(f)).collect();
            res.add_lookup_table(name, LookupTable::load(name.as_str(), files.as_slice(), table.default.as_str())?);
        }
        for (name, file) in &config.correction_lists {
            res.add_correction_list(name, CorrectionList::load(name.as_str(), &base_dir.join(&file.file))?);
        }
        for (name, file) in &config.geocode_tables {
            res.add_geocode_table(name, GeocodeTable::load(name.as_str(), &base_dir.join(&file.file))?);
        }
        for (name, file) in &config.hmms {
            res.add_hmm(name, HmmModel::load(&base_dir.join(&file.file))?);
        }

        tracing::info!(
            lookup_tables = res.lookup_tables.len(),
            correction_lists = res.correction_lists.len(),
            geocode_tables = res.geocode_tables.len(),
            hmms = res.hmms.len(),
            "reference data loaded"
        );
        Ok(res)
    }

    pub fn add_lookup_table(&mut self, name: &str, table: LookupTable) {
        self.lookup_tables.insert(name.to_string(), Arc::new(table));
    }

    pub fn add_correction_list(&mut self, name: &str, list: CorrectionList) {
        self.correction_lists.insert(name.to_string(), Arc::new(list));
    }

    pub fn add_geocode_table(&mut self, name: &str, table: GeocodeTable) {
        self.geocode_tables.insert(name.to_string(), Arc::new(table));
    }

    pub fn add_hmm(&mut self, name: &str, hmm: HmmModel) {
        self.hmms.insert(name.to_string(), Arc::new(hmm));
    }

    pub fn lookup_table(&self, name: &str) -> Result<Arc<LookupTable>, LinkageError> {
        fetch(&self.lookup_tables, "lookup table", name)
    }

    pub fn correction_list(&self, name: &str) -> Result<Arc<CorrectionList>, LinkageError> {
        fetch(&self.correction_lists, "correction list", name)
    }

    pub fn geocode_table(&self, name: &str) -> Result<Arc<GeocodeTable>, LinkageError> {
        fetch(&self.geocode_tables, "geocode table", name)
    }

    pub fn hmm(&self, name: &str) -> Result<Arc<HmmModel>, LinkageError> {
        fetch(&self.hmms, "hmm", name)
    }
}

fn fetch<T>(
    map: &BTreeMap<String, Arc<T>>,
    kind: &'static str,
    name: &str,
) -> Result<Arc<T>, LinkageError> {
    map.get(name)
        .cloned()
        .ok_or_else(|| LinkageError::UnknownResource {
            kind,
            name: name.to_string(),
        })
}
