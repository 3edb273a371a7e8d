//! Blocking / indexing: which record pairs get compared at all.
//!
//! Each key definition is built into its own partition. Candidates from all
//! partitions are unioned lazily through a visited set, so every pair is
//! emitted once no matter how many definitions or windows produce it.

mod bigram;
mod blocking;
mod sorting;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::{IndexConfig, IndexKind, KeyPartConfig};
use crate::encode::{EncoderRegistry, KeyEncoder};
use crate::error::LinkageError;
use crate::model::{CandidatePair, RecordId, SkippedBlock, StandardizedRecord};

// ---------------------------------------------------------------------------
// Key definitions
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct KeyPart {
    field: String,
    encoder: Arc<dyn KeyEncoder>,
    param: Option<usize>,
}

impl std::fmt::Debug for KeyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPart")
            .field("field", &self.field)
            .field("param", &self.param)
            .finish_non_exhaustive()
    }
}

/// One blocking key: the concatenation of its parts' encodings.
#[derive(Debug, Clone)]
pub struct KeyDefinition {
    parts: Vec<KeyPart>,
}

impl KeyDefinition {
    pub fn assemble(parts: &[KeyPartConfig], registry: &EncoderRegistry) -> Result<Self, LinkageError> {
        let parts = parts
            .iter()
            .map(|p| {
                Ok(KeyPart {
                    field: p.field.clone(),
                    encoder: registry.get(&p.encode)?,
                    param: p.param,
                })
            })
            .collect::<Result<Vec<_>, LinkageError>>()?;
        Ok(Self { parts })
    }

    /// Blocking key of `record`; `None` when every part encodes to nothing.
    pub fn key(&self, record: &StandardizedRecord) -> Option<String> {
        let key: String = self
            .parts
            .iter()
            .filter_map(|p| record.get(&p.field).map(|v| p.encoder.encode(v, p.param)))
            .collect();
        (!key.is_empty()).then_some(key)
    }
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexMethod {
    Blocking,
    Sorting { window_size: usize },
    Bigram { threshold: f64 },
}

/// Everything needed to index records, resolved against the encoder registry.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub method: IndexMethod,
    pub definitions: Vec<KeyDefinition>,
    pub max_block_size: Option<usize>,
}

impl IndexSpec {
    pub fn assemble(config: &IndexConfig, registry: &EncoderRegistry) -> Result<Self, LinkageError> {
        let method = match config.kind {
            IndexKind::Blocking => IndexMethod::Blocking,
            IndexKind::Sorting => IndexMethod::Sorting {
                window_size: config.window_size,
            },
            IndexKind::Bigram => IndexMethod::Bigram {
                threshold: config.threshold,
            },
        };
        let definitions = config
            .definitions
            .iter()
            .map(|d| KeyDefinition::assemble(d, registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            method,
            definitions,
            max_block_size: config.max_block_size,
        })
    }

    /// Index data set A alone (deduplication) or A against B (linkage).
    pub fn build(&self, a: &[StandardizedRecord], b: Option<&[StandardizedRecord]>) -> Index {
        let link = b.is_some();
        let mut partitions = Vec::with_capacity(self.definitions.len());
        let mut skipped = Vec::new();

        for (d, def) in self.definitions.iter().enumerate() {
            let groups = group_by_key(def, a, b);
            let keyed = groups.len();
            let (blocks, too_big) = split_oversized(d, groups, self.max_block_size);
            skipped.extend(too_big);

            let partition = match self.method {
                IndexMethod::Blocking => Partition::Blocks(blocks),
                IndexMethod::Sorting { window_size } => Partition::Sorted {
                    entries: sorting::sorted_entries(&blocks),
                    window_size,
                },
                IndexMethod::Bigram { threshold } => Partition::Bigram {
                    links: bigram::link_keys(&blocks, threshold),
                    blocks,
                },
            };
            tracing::info!(definition = d + 1, keys = keyed, "index partition built");
            partitions.push(partition);
        }

        Index {
            link,
            partitions,
            skipped,
        }
    }
}

/// Which data set a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Side {
    A,
    B,
}

/// A record under one key. A block holds the ids of both sides.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Block {
    pub key: String,
    pub a: Vec<RecordId>,
    pub b: Vec<RecordId>,
}

impl Block {
    pub fn len(&self) -> usize {
        self.a.len() + self.b.len()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Partition {
    Blocks(Vec<Block>),
    Sorted {
        entries: Vec<(Side, RecordId)>,
        window_size: usize,
    },
    Bigram {
        blocks: Vec<Block>,
        /// `(i, j)` with `i <= j`; `(i, i)` means pairs within block `i`.
        links: Vec<(usize, usize)>,
    },
}

/// Built index for one run.
#[derive(Debug, Clone)]
pub struct Index {
    link: bool,
    partitions: Vec<Partition>,
    skipped: Vec<SkippedBlock>,
}

impl Index {
    /// Lazily yields every candidate pair once.
    pub fn candidates(&self) -> impl Iterator<Item = CandidatePair> + '_ {
        let link = self.link;
        let mut visited: HashSet<CandidatePair> = HashSet::new();
        self.partitions
            .iter()
            .flat_map(move |p| partition_pairs(p, link))
            .filter(move |pair| visited.insert(*pair))
    }

    /// Blocks that exceeded `max_block_size` and were never compared.
    pub fn skipped_blocks(&self) -> &[SkippedBlock] {
        &self.skipped
    }
}

fn partition_pairs(partition: &Partition, link: bool) -> Box<dyn Iterator<Item = CandidatePair> + '_> {
    match partition {
        Partition::Blocks(blocks) => Box::new(blocks.iter().flat_map(move |b| blocking::block_pairs(b, link))),
        Partition::Sorted { entries, window_size } => sorting::window_pairs(entries, *window_size, link),
        Partition::Bigram { blocks, links } => Box::new(links.iter().flat_map(move |&(i, j)| {
            if i == j {
                blocking::block_pairs(&blocks[i], link)
            } else {
                blocking::cross_pairs(&blocks[i], &blocks[j], link)
            }
        })),
    }
}

/// Turn two indexed entries into a candidate pair, if they may be compared.
pub(crate) fn make_pair(x: (Side, RecordId), y: (Side, RecordId), link: bool) -> Option<CandidatePair> {
    match (link, x.0, y.0) {
        (false, _, _) if x.1 != y.1 => Some(CandidatePair::canonical(x.1, y.1)),
        (true, Side::A, Side::B) => Some(CandidatePair::new(x.1, y.1)),
        (true, Side::B, Side::A) => Some(CandidatePair::new(y.1, x.1)),
        _ => None,
    }
}

/// Keys computed in parallel, then reduced into one map by a single writer.
fn group_by_key(
    def: &KeyDefinition,
    a: &[StandardizedRecord],
    b: Option<&[StandardizedRecord]>,
) -> BTreeMap<String, Block> {
    let keys = |records: &[StandardizedRecord]| -> Vec<(String, RecordId)> {
        records
            .par_iter()
            .filter_map(|r| def.key(r).map(|k| (k, r.id)))
            .collect()
    };

    let mut groups: BTreeMap<String, Block> = BTreeMap::new();
    for (key, id) in keys(a) {
        groups
            .entry(key.clone())
            .or_insert_with(|| Block { key, ..Block::default() })
            .a
            .push(id);
    }
    if let Some(b) = b {
        for (key, id) in keys(b) {
            groups
                .entry(key.clone())
                .or_insert_with(|| Block { key, ..Block::default() })
                .b
                .push(id);
        }
    }
    groups
}

fn split_oversized(
    definition: usize,
    groups: BTreeMap<String, Block>,
    max: Option<usize>,
) -> (Vec<Block>, Vec<SkippedBlock>) {
    let mut kept = Vec::with_capacity(groups.len());
    let mut skipped = Vec::new();
    for block in groups.into_values() {
        match max {
            Some(max) if block.len() > max => {
                let size = block.len();
                tracing::warn!(
                    definition = definition + 1,
                    key = %block.key,
                    size,
                    max_block_size = max,
                    "block too large, skipped"
                );
                skipped.push(SkippedBlock {
                    definition: definition + 1,
                    key: block.key,
                    size,
                });
            }
            _ => kept.push(block),
        }
    }
    (kept, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyPartConfig;

    fn rec(id: RecordId, surname: &str, year: &str) -> StandardizedRecord {
        let mut r = StandardizedRecord::new(id);
        r.set("surname", surname);
        r.set("year", year);
        r
    }

    fn part(field: &str, encode: &str, param: Option<usize>) -> KeyPartConfig {
        KeyPartConfig {
            field: field.into(),
            encode: encode.into(),
            param,
        }
    }

    fn spec(method: IndexMethod, defs: Vec<Vec<KeyPartConfig>>, max: Option<usize>) -> IndexSpec {
        let registry = EncoderRegistry::default();
        IndexSpec {
            method,
            definitions: defs
                .iter()
                .map(|d| KeyDefinition::assemble(d, &registry).unwrap())
                .collect(),
            max_block_size: max,
        }
    }

    fn pairs(index: &Index) -> Vec<(RecordId, RecordId)> {
        let mut v: Vec<_> = index.candidates().map(|p| (p.a, p.b)).collect();
        v.sort();
        v
    }

    #[test]
    fn key_concatenates_encodings() {
        let registry = EncoderRegistry::default();
        let def = KeyDefinition::assemble(
            &[part("surname", "dmetaphone", Some(4)), part("year", "direct", None)],
            &registry,
        )
        .unwrap();
        assert_eq!(def.key(&rec(0, "smith", "1960")), Some("SM01960".to_string()));
        assert_eq!(def.key(&rec(0, "", "1960")), Some("1960".to_string()));
        assert_eq!(def.key(&StandardizedRecord::new(0)), None);
    }

    #[test]
    fn unknown_encoding_fails_assembly() {
        let registry = EncoderRegistry::default();
        let err = KeyDefinition::assemble(&[part("surname", "metaphone3", None)], &registry).unwrap_err();
        assert!(matches!(err, LinkageError::UnknownEncoding(_)));
    }

    #[test]
    fn pairs_from_several_definitions_are_emitted_once() {
        let records = vec![
            rec(0, "smith", "1960"),
            rec(1, "smyth", "1960"),
            rec(2, "jones", "1960"),
            rec(3, "smith", "1971"),
        ];
        let s = spec(
            IndexMethod::Blocking,
            vec![
                vec![part("surname", "dmetaphone", Some(4))],
                vec![part("year", "direct", None)],
            ],
            None,
        );
        let index = s.build(&records, None);
        assert_eq!(pairs(&index), vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3)]);
    }

    #[test]
    fn link_mode_only_crosses_data_sets() {
        let a = vec![rec(0, "smith", "1960"), rec(1, "smith", "1960")];
        let b = vec![rec(0, "smith", "1960"), rec(1, "jones", "1960")];
        let s = spec(IndexMethod::Blocking, vec![vec![part("surname", "direct", None)]], None);
        let index = s.build(&a, Some(&b));
        assert_eq!(pairs(&index), vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn oversized_blocks_are_skipped_and_reported() {
        let records: Vec<_> = (0..5).map(|i| rec(i, "smith", &format!("19{i}0"))).collect();
        let s = spec(IndexMethod::Blocking, vec![vec![part("surname", "direct", None)]], Some(4));
        let index = s.build(&records, None);
        assert_eq!(index.candidates().count(), 0);
        assert_eq!(
            index.skipped_blocks(),
            &[SkippedBlock {
                definition: 1,
                key: "smith".into(),
                size: 5
            }]
        );
    }

    #[test]
    fn make_pair_rules() {
        assert_eq!(make_pair((Side::A, 4), (Side::A, 2), false), Some(CandidatePair::new(2, 4)));
        assert_eq!(make_pair((Side::A, 4), (Side::A, 4), false), None);
        assert_eq!(make_pair((Side::B, 4), (Side::A, 2), true), Some(CandidatePair::new(2, 4)));
        assert_eq!(make_pair((Side::A, 4), (Side::A, 2), true), None);
    }
}
