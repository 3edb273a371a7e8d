use std::collections::HashMap;
use std::path::Path;

use crate::error::LinkageError;

/// Tag used for unknown words when a table has no configured default.
pub const UNKNOWN_TAG: &str = "UN";

/// One meaning of a word or phrase: its tag and its corrected spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub tag: String,
    pub canonical: String,
}

/// Word / phrase → tags dictionary.
///
/// File format, one entry per line (`#` starts a comment):
///
/// ```text
/// TI:doctor:dr, doc
/// SN:smith
/// PR:van der
/// ```
///
/// The canonical form and every listed variant map to `(TAG, canonical)`.
/// A phrase may carry several tags when it appears in more than one line.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    name: String,
    entries: HashMap<String, Vec<TagEntry>>,
    max_words: usize,
    default_tag: String,
}

impl LookupTable {
    pub fn new(name: impl Into<String>, default_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            max_words: 0,
            default_tag: default_tag.into(),
        }
    }

    /// Load and merge several table files, in order.
    pub fn load(
        name: impl Into<String>,
        files: &[impl AsRef<Path>],
        default_tag: impl Into<String>,
    ) -> Result<Self, LinkageError> {
        let mut table = Self::new(name, default_tag);
        for file in files {
            let path = file.as_ref();
            let content = std::fs::read_to_string(path)
                .map_err(|e| LinkageError::resource(path.display().to_string(), e))?;
            table.parse_into(&path.display().to_string(), &content)?;
        }
        tracing::debug!(table = %table.name, entries = table.len(), "lookup table loaded");
        Ok(table)
    }

    /// Parse table text and merge it into this table.
    pub fn parse_into(&mut self, source: &str, content: &str) -> Result<(), LinkageError> {
        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(3, ':');
            let tag = parts.next().unwrap_or("").trim().to_uppercase();
            let canonical = normalize_phrase(parts.next().unwrap_or(""));
            if tag.is_empty() || canonical.is_empty() {
                return Err(LinkageError::resource(
                    source,
                    format!("line {}: expected TAG:canonical[:variants]", lineno + 1),
                ));
            }
            self.insert(&canonical, &tag, &canonical);
            if let Some(variants) = parts.next() {
                for variant in variants.split(',') {
                    let variant = normalize_phrase(variant);
                    if !variant.is_empty() {
                        self.insert(&variant, &tag, &canonical);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, phrase: &str, tag: &str, canonical: &str) {
        let key = normalize_phrase(phrase);
        if key.is_empty() {
            return;
        }
        self.max_words = self.max_words.max(key.split(' ').count());
        let entry = TagEntry {
            tag: tag.to_string(),
            canonical: canonical.to_string(),
        };
        let list = self.entries.entry(key).or_default();
        if !list.contains(&entry) {
            list.push(entry);
        }
    }

    pub fn get(&self, phrase: &str) -> Option<&[TagEntry]> {
        self.entries.get(phrase).map(Vec::as_slice)
    }

    pub fn contains(&self, phrase: &str) -> bool {
        self.entries.contains_key(phrase)
    }

    /// Longest phrase length, in words.
    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn default_tag(&self) -> &str {
        if self.default_tag.is_empty() {
            UNKNOWN_TAG
        } else {
            &self.default_tag
        }
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

fn normalize_phrase(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
