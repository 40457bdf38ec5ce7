//! Sequence sets for message ranges.
//!
//! One `SequenceSet` type serves both numbering schemes; whether its
//! numbers are message sequence numbers or UIDs is decided by the command
//! that carries it (`FETCH` vs `UID FETCH`).

use super::SeqNum;

/// Sequence set for specifying message ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSet {
    /// Single number.
    Single(SeqNum),
    /// Inclusive range.
    Range(SeqNum, SeqNum),
    /// Range from start to the end of the mailbox.
    RangeFrom(SeqNum),
    /// All messages (`*`).
    All,
    /// Multiple specifications.
    Set(Vec<Self>),
}

impl SequenceSet {
    /// Creates a sequence set from a single number. Returns `None` for 0.
    #[must_use]
    pub fn single(n: u32) -> Option<Self> {
        SeqNum::new(n).map(Self::Single)
    }

    /// Creates a range sequence set. Returns `None` if either bound is 0.
    #[must_use]
    pub fn range(start: u32, end: u32) -> Option<Self> {
        Some(Self::Range(SeqNum::new(start)?, SeqNum::new(end)?))
    }

    /// Builds a compact set from a list of identifiers, collapsing
    /// consecutive runs into ranges.
    ///
    /// Zeroes are skipped; an empty input yields `None`.
    #[must_use]
    pub fn from_numbers(numbers: &[u32]) -> Option<Self> {
        let mut sorted: Vec<u32> = numbers.iter().copied().filter(|&n| n != 0).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut items = Vec::new();
        let mut iter = sorted.into_iter();
        let mut run_start = iter.next()?;
        let mut run_end = run_start;

        for n in iter {
            if n == run_end + 1 {
                run_end = n;
            } else {
                items.push(Self::run(run_start, run_end)?);
                run_start = n;
                run_end = n;
            }
        }
        items.push(Self::run(run_start, run_end)?);

        if items.len() == 1 {
            items.pop()
        } else {
            Some(Self::Set(items))
        }
    }

    fn run(start: u32, end: u32) -> Option<Self> {
        if start == end {
            Self::single(start)
        } else {
            Self::range(start, end)
        }
    }
}

impl std::fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => write!(f, "*"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", s.join(","))
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_range() {
        assert_eq!(SequenceSet::single(42).unwrap().to_string(), "42");
        assert_eq!(SequenceSet::range(1, 100).unwrap().to_string(), "1:100");
        assert!(SequenceSet::single(0).is_none());
        assert!(SequenceSet::range(0, 10).is_none());
    }

    #[test]
    fn test_display_set() {
        let set = SequenceSet::Set(vec![
            SequenceSet::single(1).unwrap(),
            SequenceSet::range(5, 10).unwrap(),
        ]);
        assert_eq!(set.to_string(), "1,5:10");
    }

    #[test]
    fn test_display_range_from_and_all() {
        assert_eq!(
            SequenceSet::RangeFrom(SeqNum::new(50).unwrap()).to_string(),
            "50:*"
        );
        assert_eq!(SequenceSet::All.to_string(), "*");
    }

    #[test]
    fn test_from_numbers_collapses_runs() {
        let set = SequenceSet::from_numbers(&[1, 2, 3, 7, 9, 10]).unwrap();
        assert_eq!(set.to_string(), "1:3,7,9:10");
    }

    #[test]
    fn test_from_numbers_single_run() {
        let set = SequenceSet::from_numbers(&[11, 12, 13, 14]).unwrap();
        assert_eq!(set.to_string(), "11:14");
    }

    #[test]
    fn test_from_numbers_unsorted_with_duplicates() {
        let set = SequenceSet::from_numbers(&[5, 3, 4, 3]).unwrap();
        assert_eq!(set.to_string(), "3:5");
    }

    #[test]
    fn test_from_numbers_empty() {
        assert!(SequenceSet::from_numbers(&[]).is_none());
        assert!(SequenceSet::from_numbers(&[0]).is_none());
    }
}
