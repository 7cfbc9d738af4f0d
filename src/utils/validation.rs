//! Input validation utilities
//!
//! Checks applied to caller-supplied command arguments before they reach the
//! control connection.

/// Longest argument the client will put on a command line.
pub const MAX_ARGUMENT_LENGTH: usize = 512;

/// An argument must fit on a single command line: no CR, LF or NUL.
pub fn is_valid_argument(input: &str) -> bool {
    input.len() <= MAX_ARGUMENT_LENGTH && !input.contains(['\0', '\r', '\n'])
}
