use std::collections::HashMap;
use std::path::Path;

use crate::error::LinkageError;

/// Key (postcode, locality, ...) → `(latitude, longitude)` in degrees.
///
/// Loaded from a CSV file with a header row: `key,latitude,longitude`.
#[derive(Debug, Clone, Default)]
pub struct GeocodeTable {
    name: String,
    entries: HashMap<String, (f64, f64)>,
}

impl GeocodeTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self, LinkageError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LinkageError::resource(path.display().to_string(), e))?;
        Self::parse_csv(name, &path.display().to_string(), &content)
    }

    pub fn parse_csv(name: impl Into<String>, source: &str, content: &str) -> Result<Self, LinkageError> {
        let mut table = Self::new(name);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|e| LinkageError::resource(source, e))?;
            let row = i + 2;
            let key = record.get(0).unwrap_or("");
            let lat = parse_coord(source, row, record.get(1), 90.0)?;
            let lon = parse_coord(source, row, record.get(2), 180.0)?;
            if key.is_empty() {
                return Err(LinkageError::resource(source, format!("row {row}: empty key")));
            }
            table.insert(key, lat, lon);
        }
        Ok(table)
    }

    pub fn insert(&mut self, key: &str, latitude: f64, longitude: f64) {
        self.entries
            .insert(key.trim().to_lowercase(), (latitude, longitude));
    }

    pub fn get(&self, key: &str) -> Option<(f64, f64)> {
        self.entries.get(&key.trim().to_lowercase()).copied()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_coord(source: &str, row: usize, value: Option<&str>, limit: f64) -> Result<f64, LinkageError> {
    let raw = value.unwrap_or("");
    let v: f64 = raw
        .parse()
        .map_err(|_| LinkageError::resource(source, format!("row {row}: bad coordinate '{raw}'")))?;
    if v.abs() > limit {
        return Err(LinkageError::resource(
            source,
            format!("row {row}: coordinate {v} out of range"),
        ));
    }
    Ok(v)
}
