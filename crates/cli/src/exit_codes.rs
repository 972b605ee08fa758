//! CLI Exit Code Registry
//!
//! Single source of truth for `leasex` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments, bad `--params`)          |
//! | 3    | I/O error (cannot read input, cannot write report)   |
//! | 4    | Invalid field configuration                          |
//! | 5    | Parse error in gold or prediction documents          |
//! | 6    | Evaluation ran but accuracy is below `--min-accuracy` |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Cannot read an input file or write a report.
pub const EXIT_IO: u8 = 3;

/// Field configuration failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// Gold or prediction documents are not valid JSON of the expected shape.
pub const EXIT_PARSE: u8 = 5;

/// Overall accuracy below the `--min-accuracy` gate.
pub const EXIT_BELOW_THRESHOLD: u8 = 6;
