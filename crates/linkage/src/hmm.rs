//! Hidden Markov model used to segment tagged tokens into output attributes.
//!
//! Models are decode-only. Parameters come from a JSON file:
//!
//! ```json
//! {
//!   "name": "name-hmm",
//!   "states": ["titl", "gname1", "sname1"],
//!   "observations": ["TI", "GF", "GM", "SN"],
//!   "start": { "titl": 0.3, "gname1": 0.6, "sname1": 0.1 },
//!   "transitions": { "titl": { "gname1": 0.9, "sname1": 0.1 } },
//!   "emissions": { "titl": { "TI": 1.0 } }
//! }
//! ```
//!
//! Absent entries are zero. Zero probabilities are floored to
//! [`MIN_PROBABILITY`] at decode time so every tag sequence has a path.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::error::LinkageError;

/// Floor for unseen starts, transitions and emissions.
pub const MIN_PROBABILITY: f64 = 1e-10;

#[derive(Debug, Deserialize)]
struct HmmFile {
    name: String,
    states: Vec<String>,
    observations: Vec<String>,
    #[serde(default)]
    start: BTreeMap<String, f64>,
    #[serde(default)]
    transitions: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    emissions: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Clone)]
pub struct HmmModel {
    name: String,
    states: Vec<String>,
    observations: Vec<String>,
    obs_index: HashMap<String, usize>,
    log_start: Vec<f64>,
    /// `[from][to]`
    log_trans: Vec<Vec<f64>>,
    /// `[state][observation]`
    log_emit: Vec<Vec<f64>>,
}

/// Most probable state sequence for one observation sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ViterbiPath {
    pub states: Vec<usize>,
    pub log_probability: f64,
}

impl ViterbiPath {
    pub fn probability(&self) -> f64 {
        self.log_probability.exp()
    }
}

impl HmmModel {
    pub fn load(path: &Path) -> Result<Self, LinkageError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LinkageError::resource(path.display().to_string(), e))?;
        Self::from_json(&path.display().to_string(), &content)
    }

    pub fn from_json(source: &str, content: &str) -> Result<Self, LinkageError> {
        let file: HmmFile =
            serde_json::from_str(content).map_err(|e| LinkageError::resource(source, e))?;
        Self::from_tables(source, file)
    }

    fn from_tables(source: &str, file: HmmFile) -> Result<Self, LinkageError> {
        let err = |msg: String| LinkageError::resource(source, msg);

        if file.states.is_empty() || file.observations.is_empty() {
            return Err(err("model needs at least one state and one observation".into()));
        }
        let state_index = index_of(&file.states).map_err(|d| err(format!("duplicate state '{d}'")))?;
        let obs_index =
            index_of(&file.observations).map_err(|d| err(format!("duplicate observation '{d}'")))?;

        let n = file.states.len();
        let m = file.observations.len();
        let state = |s: &str| {
            state_index
                .get(s)
                .copied()
                .ok_or_else(|| err(format!("unknown state '{s}'")))
        };
        let prob = |p: f64, what: String| {
            if (0.0..=1.0).contains(&p) {
                Ok(p.max(MIN_PROBABILITY).ln())
            } else {
                Err(err(format!("{what}: probability {p} outside [0, 1]")))
            }
        };
        let floor = MIN_PROBABILITY.ln();

        let mut log_start = vec![floor; n];
        for (s, p) in &file.start {
            log_start[state(s.as_str())?] = prob(*p, format!("start[{s}]"))?;
        }

        let mut log_trans = vec![vec![floor; n]; n];
        for (from, row) in &file.transitions {
            let i = state(from.as_str())?;
            for (to, p) in row {
                log_trans[i][state(to.as_str())?] = prob(*p, format!("transition[{from}][{to}]"))?;
            }
        }

        let mut log_emit = vec![vec![floor; m]; n];
        for (s, row) in &file.emissions {
            let i = state(s.as_str())?;
            for (obs, p) in row {
                let o = obs_index
                    .get(obs.as_str())
                    .copied()
                    .ok_or_else(|| err(format!("unknown observation '{obs}'")))?;
                log_emit[i][o] = prob(*p, format!("emission[{s}][{obs}]"))?;
            }
        }

        let obs_index = obs_index.into_iter().map(|(k, v)| (k.to_string(), v)).collect();

        Ok(Self {
            name: file.name,
            states: file.states,
            observations: file.observations,
            obs_index,
            log_start,
            log_trans,
            log_emit,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn observations(&self) -> &[String] {
        &self.observations
    }

    pub fn state_name(&self, index: usize) -> &str {
        &self.states[index]
    }

    fn emission(&self, state: usize, tag: &str) -> f64 {
        match self.obs_index.get(tag) {
            Some(&o) => self.log_emit[state][o],
            None => MIN_PROBABILITY.ln(),
        }
    }

    /// Viterbi decoding in log space.
    ///
    /// Unknown tags emit with the floor probability. Ties resolve to the lowest
    /// state index, so the result is a pure function of `tags`.
    pub fn viterbi<S: AsRef<str>>(&self, tags: &[S]) -> ViterbiPath {
        let Some(first) = tags.first() else {
            return ViterbiPath {
                states: Vec::new(),
                log_probability: f64::NEG_INFINITY,
            };
        };
        let n = self.states.len();

        let mut delta: Vec<f64> = (0..n)
            .map(|s| self.log_start[s] + self.emission(s, first.as_ref()))
            .collect();
        let mut back: Vec<Vec<usize>> = Vec::with_capacity(tags.len().saturating_sub(1));

        for tag in &tags[1..] {
            let mut next = vec![f64::NEG_INFINITY; n];
            let mut ptr = vec![0usize; n];
            for (s, slot) in next.iter_mut().enumerate() {
                let (best_prev, best) = argmax((0..n).map(|p| delta[p] + self.log_trans[p][s]));
                *slot = best + self.emission(s, tag.as_ref());
                ptr[s] = best_prev;
            }
            back.push(ptr);
            delta = next;
        }

        let (mut state, log_probability) = argmax(delta.iter().copied());
        let mut states = vec![state; tags.len()];
        for (t, ptr) in back.iter().enumerate().rev() {
            state = ptr[state];
            states[t] = state;
        }

        ViterbiPath {
            states,
            log_probability,
        }
    }
}

/// Index and value of the first maximum.
fn argmax(values: impl Iterator<Item = f64>) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, v) in values.enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}

fn index_of(names: &[String]) -> Result<HashMap<&str, usize>, String> {
    let mut map = HashMap::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        if map.insert(name.as_str(), i).is_some() {
            return Err(name.clone());
        }
    }
    Ok(map)
}
