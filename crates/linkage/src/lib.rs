//! `relink-linkage` - probabilistic record linkage engine.
//!
//! Pure engine crate: receives pre-loaded records and reference data,
//! standardizes them, builds candidate pairs, weighs field agreement and
//! classifies each pair. No CLI dependencies.

pub mod assignment;
pub mod classify;
pub mod compare;
pub mod config;
pub mod encode;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod hmm;
pub mod index;
pub mod model;
pub mod resources;
pub mod standardize;

pub use config::LinkageConfig;
pub use engine::{load_csv_records, run, Pipeline};
pub use error::LinkageError;
pub use model::{LinkageInput, LinkageResult, RawRecord, StandardizedRecord};
pub use resources::Resources;
