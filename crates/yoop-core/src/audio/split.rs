//! Time windows for splitting audio into equal parts.

use std::time::Duration;

use crate::error::{Result, ValidationError};

/// One part's window, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitWindow {
    /// Offset of the window from the start.
    pub start: u64,
    /// Window length. The last window may run past the end.
    pub length: u64,
}

/// Windows for `parts` equal parts of `duration`.
///
/// Part `n` starts at `floor(duration / parts * n)` and lasts
/// `ceil(duration / parts)` seconds.
///
/// # Errors
///
/// Returns a validation error if `parts` is zero.
pub fn split_windows(duration: Duration, parts: usize) -> Result<Vec<SplitWindow>> {
    if parts == 0 {
        return Err(ValidationError::SplitCount(parts).into());
    }

    let share = duration.as_secs_f64() / parts as f64;
    let length = share.ceil() as u64;
    Ok((0..parts)
        .map(|n| SplitWindow {
            start: (share * n as f64).floor() as u64,
            length,
        })
        .collect())
}
