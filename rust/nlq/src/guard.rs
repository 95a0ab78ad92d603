//! Input shape limits applied before any pattern matching runs.

use thiserror::Error;
use tracing::warn;

pub const MAX_INPUT_LEN: usize = 200;
pub const MAX_SPACES: usize = 50;
pub const MAX_DASHES: usize = 20;

/// Why an input was refused by [`check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("input is {0} characters long (limit {})", MAX_INPUT_LEN)]
    TooLong(usize),
    #[error("input contains {0} spaces (limit {})", MAX_SPACES)]
    TooManySpaces(usize),
    #[error("input contains {0} dashes (limit {})", MAX_DASHES)]
    TooManyDashes(usize),
}

pub fn check(input: &str) -> Result<(), Rejection> {
    let len = input.chars().count();
    if len > MAX_INPUT_LEN {
        return Err(Rejection::TooLong(len));
    }

    let spaces = input.chars().filter(|ch| *ch == ' ').count();
    if spaces > MAX_SPACES {
        return Err(Rejection::TooManySpaces(spaces));
    }

    let dashes = input.chars().filter(|ch| *ch == '-').count();
    if dashes > MAX_DASHES {
        return Err(Rejection::TooManyDashes(dashes));
    }

    Ok(())
}

/// Returns `false` for inputs whose shape could make the regex passes expensive.
/// Callers treat `false` exactly like "no match".
pub fn validate(input: &str) -> bool {
    match check(input) {
        Ok(()) => true,
        Err(rejection) => {
            warn!(%rejection, "input rejected before pattern matching");
            false
        }
    }
}

/// Lower-cases, trims and collapses runs of whitespace.
pub fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
