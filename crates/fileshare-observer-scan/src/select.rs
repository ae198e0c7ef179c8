//! Bounded top-K selection by modification time.
//!
//! Each selection keeps at most K candidates in a binary heap whose top is
//! the current worst keeper, so a new candidate costs one comparison when
//! rejected and `O(log K)` when accepted. Memory stays `O(K)` however large
//! the tree is.
//!
//! Ties on modification time are broken by arrival order: a later entry
//! never displaces an earlier one with the same time, which keeps results
//! deterministic for a given traversal order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::path::PathBuf;
use std::time::SystemTime;

use fileshare_observer_core::FileStamp;

/// Retains the K entries with the smallest `K` keys seen so far.
///
/// Use `SystemTime` as the key to keep the oldest files and
/// `Reverse<SystemTime>` to keep the newest.
#[derive(Debug)]
pub struct TopK<K: Ord> {
    capacity: usize,
    next_seq: u64,
    heap: BinaryHeap<Candidate<K>>,
}

#[derive(Debug)]
struct Candidate<K> {
    key: K,
    seq: u64,
    stamp: FileStamp,
}

impl<K: Ord> Candidate<K> {
    fn rank(&self) -> (&K, u64) {
        (&self.key, self.seq)
    }
}

impl<K: Ord> PartialEq for Candidate<K> {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl<K: Ord> Eq for Candidate<K> {}

impl<K: Ord> PartialOrd for Candidate<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for Candidate<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl<K: Ord> TopK<K> {
    /// Create a selection retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_seq: 0,
            heap: BinaryHeap::with_capacity(capacity.min(1024)),
        }
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently retained.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offer an entry. Returns `true` if it was retained.
    ///
    /// The path is only materialized when the entry is accepted.
    pub fn offer(
        &mut self,
        key: K,
        path: impl FnOnce() -> PathBuf,
        modified: SystemTime,
        size: u64,
    ) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;

        if self.heap.len() < self.capacity {
            self.heap.push(Candidate {
                key,
                seq,
                stamp: FileStamp::new(path(), modified, size),
            });
            return true;
        }

        // `seq` is larger than every retained sequence number, so an equal key
        // ranks behind the incumbent and is rejected.
        let beats_worst = self
            .heap
            .peek()
            .is_some_and(|worst| (&key, seq) < worst.rank());
        if !beats_worst {
            return false;
        }

        if let Some(mut worst) = self.heap.peek_mut() {
            *worst = Candidate {
                key,
                seq,
                stamp: FileStamp::new(path(), modified, size),
            };
        }
        true
    }

    /// Consume the selection, best entry first.
    pub fn into_sorted(self) -> Vec<FileStamp> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|candidate| candidate.stamp)
            .collect()
    }
}

/// Oldest-first selection.
pub type OldestFiles = TopK<SystemTime>;

/// Newest-first selection.
pub type NewestFiles = TopK<Reverse<SystemTime>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn offer_oldest(top: &mut OldestFiles, name: &str, secs: u64) -> bool {
        top.offer(at(secs), || PathBuf::from(name), at(secs), 0)
    }

    fn offer_newest(top: &mut NewestFiles, name: &str, secs: u64) -> bool {
        top.offer(Reverse(at(secs)), || PathBuf::from(name), at(secs), 0)
    }

    fn names(stamps: &[FileStamp]) -> Vec<&str> {
        stamps.iter().map(|s| s.path.to_str().unwrap()).collect()
    }

    #[test]
    fn test_keeps_smallest_keys() {
        let mut top = OldestFiles::new(2);
        for (name, secs) in [("c", 30), ("a", 10), ("d", 40), ("b", 20)] {
            offer_oldest(&mut top, name, secs);
        }
        assert_eq!(names(&top.into_sorted()), vec!["a", "b"]);
    }

    #[test]
    fn test_reverse_keeps_largest_keys() {
        let mut top = NewestFiles::new(2);
        for (name, secs) in [("c", 30), ("a", 10), ("d", 40), ("b", 20)] {
            offer_newest(&mut top, name, secs);
        }
        assert_eq!(names(&top.into_sorted()), vec!["d", "c"]);
    }

    #[test]
    fn test_zero_capacity_never_retains() {
        let mut top = OldestFiles::new(0);
        let mut materialized = false;
        let kept = top.offer(
            at(1),
            || {
                materialized = true;
                PathBuf::from("a")
            },
            at(1),
            0,
        );
        assert!(!kept);
        assert!(!materialized);
        assert!(top.into_sorted().is_empty());
    }

    #[test]
    fn test_ties_keep_first_encountered() {
        let mut oldest = OldestFiles::new(1);
        assert!(offer_oldest(&mut oldest, "first", 10));
        assert!(!offer_oldest(&mut oldest, "second", 10));
        assert_eq!(names(&oldest.into_sorted()), vec!["first"]);

        let mut newest = NewestFiles::new(1);
        assert!(offer_newest(&mut newest, "first", 10));
        assert!(!offer_newest(&mut newest, "second", 10));
        assert_eq!(names(&newest.into_sorted()), vec!["first"]);
    }

    #[test]
    fn test_ties_ordered_by_arrival_in_output() {
        let mut top = NewestFiles::new(3);
        offer_newest(&mut top, "x", 5);
        offer_newest(&mut top, "y", 9);
        offer_newest(&mut top, "z", 5);
        assert_eq!(names(&top.into_sorted()), vec!["y", "x", "z"]);
    }

    #[test]
    fn test_rejected_offer_skips_path_allocation() {
        let mut top = OldestFiles::new(1);
        offer_oldest(&mut top, "keep", 1);
        let mut materialized = false;
        top.offer(
            at(99),
            || {
                materialized = true;
                PathBuf::from("drop")
            },
            at(99),
            0,
        );
        assert!(!materialized);
        assert_eq!(top.len(), 1);
    }
}
