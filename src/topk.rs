//! Bounded top-K selection over a stream of scored candidates.
//!
//! A min-oriented heap of capacity K: below capacity every candidate is
//! accepted; at capacity a newcomer must beat the worst retained candidate
//! to displace it. Memory and per-offer cost stay O(K) / O(log K) no matter
//! how many candidates the query produces.

use crate::types::EntityId;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A candidate produced and consumed within a single query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate {
    pub id: EntityId,
    /// Composite score in [0, 1], higher is better
    pub score: f64,
    /// Distance to the query reference point, kept for result resolution
    pub distance: f64,
}

impl ScoredCandidate {
    pub fn new(id: EntityId, score: f64, distance: f64) -> Self {
        Self {
            id,
            score,
            distance,
        }
    }
}

/// Ranking order: higher score first; equal scores prefer the lower id.
///
/// `total_cmp` keeps the order deterministic, and the id tie-break is the
/// same one applied during eviction, so the drained sequence is
/// reproducible bit-for-bit across runs and rebuilds. `distance` does not
/// participate in the ordering.
impl Ord for ScoredCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for ScoredCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScoredCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredCandidate {}

/// Bounded-capacity selector retaining the K best candidates seen so far.
#[derive(Debug)]
pub struct TopKSelector {
    capacity: usize,
    heap: BinaryHeap<Reverse<ScoredCandidate>>,
}

impl TopKSelector {
    /// Create a selector that retains at most `capacity` candidates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1)),
        }
    }

    /// Offer a candidate; returns whether it was retained.
    ///
    /// Retaining a candidate at capacity evicts the current worst one.
    pub fn offer(&mut self, candidate: ScoredCandidate) -> bool {
        if self.capacity == 0 {
            return false;
        }

        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(candidate));
            return true;
        }

        // `peek` is the minimum under ranking order: the lowest score, and
        // among equal scores the highest id, which is exactly the entry
        // that must yield first.
        match self.heap.peek() {
            Some(Reverse(worst)) if candidate > *worst => {
                self.heap.pop();
                self.heap.push(Reverse(candidate));
                true
            }
            _ => false,
        }
    }

    /// Number of candidates currently retained.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Consume the selector, returning candidates in descending score order
    /// (ties ascending by id).
    pub fn drain_sorted(self) -> Vec<ScoredCandidate> {
        // Ascending in Reverse order is descending in ranking order.
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(candidate)| candidate)
            .collect()
    }
}
