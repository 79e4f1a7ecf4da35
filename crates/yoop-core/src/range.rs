//! Slice ranges over playlist entries.
//!
//! A [`SliceRange`] follows the usual slice conventions: 0-based, exclusive
//! stop, negative bounds counted from the end, non-zero step. It can either
//! be resolved against a known length ([`SliceRange::indices`]) or rendered
//! as the media-fetching tool's 1-based inclusive `--playlist-items`
//! selection ([`SliceRange::playlist_items`]).

use std::fmt;

use crate::error::{Error, Result, ValidationError};

/// A `start:stop:step` selection of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    start: Option<isize>,
    stop: Option<isize>,
    step: isize,
}

impl SliceRange {
    /// Create a range.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `step` is zero.
    pub fn new(start: Option<isize>, stop: Option<isize>, step: isize) -> Result<Self> {
        if step == 0 {
            return Err(ValidationError::ZeroStep.into());
        }
        Ok(Self { start, stop, step })
    }

    /// Every entry, front to back.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            start: None,
            stop: None,
            step: 1,
        }
    }

    /// A one-element range selecting `index`; negative indices walk backward
    /// from the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for `isize::MAX` and `isize::MIN`,
    /// which no collection can hold.
    pub const fn single(index: isize) -> Result<Self> {
        let (stop, step) = if index >= 0 {
            (index.checked_add(1), 1)
        } else {
            (index.checked_sub(1), -1)
        };
        match stop {
            Some(stop) => Ok(Self {
                start: Some(index),
                stop: Some(stop),
                step,
            }),
            None => Err(Error::IndexOutOfRange { index }),
        }
    }

    /// Start bound.
    #[must_use]
    pub const fn start(&self) -> Option<isize> {
        self.start
    }

    /// Stop bound (exclusive).
    #[must_use]
    pub const fn stop(&self) -> Option<isize> {
        self.stop
    }

    /// Step.
    #[must_use]
    pub const fn step(&self) -> isize {
        self.step
    }

    /// Resolve against a collection of `len` entries.
    #[must_use]
    pub fn indices(&self, len: usize) -> Vec<usize> {
        let len = len as isize;
        let step = self.step;
        let mut out = Vec::new();

        if step > 0 {
            let clamp = |bound: isize| {
                if bound < 0 {
                    (bound + len).max(0)
                } else {
                    bound.min(len)
                }
            };
            let start = self.start.map_or(0, clamp);
            let stop = self.stop.map_or(len, clamp);
            let mut i = start;
            while i < stop {
                out.push(i as usize);
                let Some(next) = i.checked_add(step) else {
                    break;
                };
                i = next;
            }
        } else {
            let clamp = |bound: isize| {
                if bound < 0 {
                    (bound + len).max(-1)
                } else {
                    bound.min(len - 1)
                }
            };
            let start = self.start.map_or(len - 1, clamp);
            let stop = self.stop.map_or(-1, clamp);
            let mut i = start;
            while i > stop {
                out.push(i as usize);
                let Some(next) = i.checked_add(step) else {
                    break;
                };
                i = next;
            }
        }

        out
    }

    /// Render as a `--playlist-items` value, or `None` when the range is
    /// empty for every collection length.
    ///
    /// Unset bounds render as empty strings.
    #[must_use]
    pub fn playlist_items(&self) -> Option<String> {
        let start = self.start.map(|s| if s >= 0 { s.saturating_add(1) } else { s });

        let stop = match self.stop {
            None => None,
            Some(stop) if self.step > 0 => {
                if stop == 0 {
                    return None;
                }
                Some(if stop > 0 { stop } else { stop.saturating_sub(1) })
            }
            Some(stop) => {
                if stop == -1 {
                    return None;
                }
                Some(if stop >= 0 { stop.saturating_add(2) } else { stop + 1 })
            }
        };

        let render = |bound: Option<isize>| bound.map_or_else(String::new, |b| b.to_string());
        Some(format!("{}:{}:{}", render(start), render(stop), self.step))
    }
}

impl Default for SliceRange {
    fn default() -> Self {
        Self::full()
    }
}

impl fmt::Display for SliceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |bound: Option<isize>| bound.map_or_else(String::new, |b| b.to_string());
        write!(f, "[{}:{}:{}]", render(self.start), render(self.stop), self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: Option<isize>, stop: Option<isize>, step: isize) -> SliceRange {
        SliceRange::new(start, stop, step).expect("non-zero step")
    }

    #[test]
    fn test_zero_step_rejected() {
        assert!(matches!(
            SliceRange::new(None, None, 0),
            Err(Error::Validation(ValidationError::ZeroStep))
        ));
    }

    #[test]
    fn test_full_range_items() {
        assert_eq!(SliceRange::full().playlist_items().as_deref(), Some("::1"));
        assert_eq!(SliceRange::full().indices(3), vec![0, 1, 2]);
    }

    #[test]
    fn test_single_positive_index() {
        let r = SliceRange::single(0).expect("Should build");
        assert_eq!(r.playlist_items().as_deref(), Some("1:1:1"));
        assert_eq!(r.indices(3), vec![0]);

        let r = SliceRange::single(2).expect("Should build");
        assert_eq!(r.playlist_items().as_deref(), Some("3:3:1"));
        assert_eq!(r.indices(3), vec![2]);
        assert!(r.indices(2).is_empty());
    }

    #[test]
    fn test_single_negative_index() {
        let r = SliceRange::single(-1).expect("Should build");
        assert_eq!(r.playlist_items().as_deref(), Some("-1:-1:-1"));
        assert_eq!(r.indices(3), vec![2]);

        let r = SliceRange::single(-3).expect("Should build");
        assert_eq!(r.playlist_items().as_deref(), Some("-3:-3:-1"));
        assert_eq!(r.indices(3), vec![0]);
        assert!(
            SliceRange::single(-4)
                .expect("Should build")
                .indices(3)
                .is_empty()
        );
    }

    #[test]
    fn test_single_at_extremes() {
        assert!(matches!(
            SliceRange::single(isize::MIN),
            Err(Error::IndexOutOfRange { index: isize::MIN })
        ));
        assert!(matches!(
            SliceRange::single(isize::MAX),
            Err(Error::IndexOutOfRange { index: isize::MAX })
        ));

        let r = SliceRange::single(isize::MAX - 1).expect("Should build");
        assert!(r.indices(3).is_empty());
        assert!(r.playlist_items().is_some());
    }

    #[test]
    fn test_huge_step_stops() {
        assert_eq!(range(None, None, isize::MAX).indices(3), vec![0]);
        assert_eq!(range(None, None, isize::MIN).indices(3), vec![2]);
        assert_eq!(
            range(Some(isize::MAX), None, 1).playlist_items().as_deref(),
            Some(&*format!("{}::1", isize::MAX))
        );
    }

    #[test]
    fn test_forward_bounds_translation() {
        // [1:3] selects the second and third entries: 1-based 2..=3.
        assert_eq!(range(Some(1), Some(3), 1).playlist_items().as_deref(), Some("2:3:1"));
        // [:-1] drops the last entry: 1-based up to -2.
        assert_eq!(range(None, Some(-1), 1).playlist_items().as_deref(), Some(":-2:1"));
        // [-2:] keeps the last two.
        assert_eq!(range(Some(-2), None, 1).playlist_items().as_deref(), Some("-2::1"));
        assert_eq!(range(Some(0), None, 2).playlist_items().as_deref(), Some("1::2"));
    }

    #[test]
    fn test_backward_bounds_translation() {
        assert_eq!(range(None, None, -1).playlist_items().as_deref(), Some("::-1"));
        // [3:0:-1] walks 3, 2, 1: 1-based 4 down to 2.
        assert_eq!(range(Some(3), Some(0), -1).playlist_items().as_deref(), Some("4:2:-1"));
        // [::-1] stopping before -3 keeps the last two.
        assert_eq!(range(None, Some(-3), -1).playlist_items().as_deref(), Some(":-2:-1"));
    }

    #[test]
    fn test_statically_empty_ranges() {
        assert_eq!(range(None, Some(0), 1).playlist_items(), None);
        assert_eq!(range(Some(2), Some(-1), -1).playlist_items(), None);
    }

    #[test]
    fn test_indices_match_slice_semantics() {
        assert_eq!(range(Some(1), None, 1).indices(4), vec![1, 2, 3]);
        assert_eq!(range(None, None, -1).indices(4), vec![3, 2, 1, 0]);
        assert_eq!(range(None, None, 2).indices(5), vec![0, 2, 4]);
        assert_eq!(range(Some(-2), None, 1).indices(4), vec![2, 3]);
        assert_eq!(range(Some(10), None, 1).indices(4), Vec::<usize>::new());
        assert_eq!(range(Some(3), Some(0), -1).indices(5), vec![3, 2, 1]);
        assert_eq!(range(Some(-100), Some(100), 1).indices(2), vec![0, 1]);
        assert!(range(None, None, 1).indices(0).is_empty());
        assert!(range(None, None, -1).indices(0).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(range(Some(1), None, -2).to_string(), "[1::-2]");
    }
}
