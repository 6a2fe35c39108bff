//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part
//! of the shell contract; audit pipelines gate on them.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success, all lines matched                          |
//! | 1    | General error (unspecified)                         |
//! | 2    | Usage error (bad args, unreadable config path)      |
//! | 3    | Config invalid (parse or validation failure)        |
//! | 4    | Schema mismatch (configured column not found)       |
//! | 5    | Runtime error (unreadable data file, bad CSV)       |
//! | 6    | Completed, but one or more lines did not match      |

/// Success - verification completed and every line matched.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure. Prefer a specific code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable config path.
pub const EXIT_USAGE: u8 = 2;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A configured column role matched nothing in its file; the config is
/// wrong for this source.
pub const EXIT_SCHEMA_MISMATCH: u8 = 4;

/// Runtime failure reading or parsing data files.
pub const EXIT_RUNTIME: u8 = 5;

/// Verification ran to completion but found unmatched lines.
pub const EXIT_MISMATCHES: u8 = 6;
