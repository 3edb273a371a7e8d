//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts rely on these values; never renumber an existing code.
//!
//! | Code | Description                                              |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error (unspecified)                              |
//! | 2    | CLI usage error (bad args)                               |
//! | 3    | Invalid configuration (parse, validation, references)    |
//! | 4    | Reference data could not be loaded                       |
//! | 5    | Input data unreadable or missing a required column       |
//! | 6    | Result could not be written                              |

use relink_linkage::LinkageError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments. clap exits with this code on its own.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

/// Config file unreadable, malformed or failing validation.
pub const EXIT_CONFIG: u8 = 3;

/// Lookup table, correction list, geocode table or HMM failed to load.
pub const EXIT_RESOURCE: u8 = 4;

/// Data set file unreadable or missing a column a standardizer reads.
pub const EXIT_INPUT: u8 = 5;

/// JSON output could not be serialized or written.
pub const EXIT_OUTPUT: u8 = 6;

/// Map an engine error to its exit code.
pub fn linkage_exit_code(err: &LinkageError) -> u8 {
    match err {
        e if e.is_config_error() => EXIT_CONFIG,
        LinkageError::ResourceLoad { .. } => EXIT_RESOURCE,
        LinkageError::MissingColumn { .. } | LinkageError::Io(_) => EXIT_INPUT,
        _ => EXIT_ERROR,
    }
}
