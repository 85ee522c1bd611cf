// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Statistics and search observation.
//!
//! Statistics are a flat counter block owned by the search driver and
//! incremented from the hot loop; observers are a pluggable callback handle
//! for progress reporting, so tests can run silently and callers can attach
//! whatever reporting they need.

use strum::EnumCount;
use strum_macros::EnumCount as EnumCountMacro;

/// Counters maintained across one search.
#[derive(EnumCountMacro, Copy, Clone, Debug)]
#[repr(u8)]
pub enum Counter {
    /// Calls to the queue's `select`.
    NodeSelections,
    /// Expanded parents (one per `evaluate_children` call).
    ChildrenEvaluations,
    /// Candidate lower bounds computed.
    LowerBoundComputations,
    /// Candidate objectives computed.
    ObjectiveComputations,
    /// Nodes attached to the trie.
    TreeInsertions,
    /// Nodes pushed onto the work queue.
    QueueInsertions,
    /// Symmetry-map lookups.
    MapInsertions,
    /// Candidates rejected because a permutation with a bound at least as
    /// good was already cached.
    MapDominated,
    /// Cached witnesses demolished by a strictly better permutation.
    MapDemolished,
    /// Nodes reclaimed by `select` (tombstoned or bound-obsolete pops).
    LazyReclaims,
    /// Garbage-collection sweeps of the trie.
    GarbageCollections,
}

/// Flat counter block, indexed by [`Counter`].
#[derive(Debug, Default)]
pub struct Statistics {
    stats: [u64; Counter::COUNT],
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    /// Increment the specified counter by 1.
    pub fn increment(&mut self, counter: Counter) {
        self.stats[counter as usize] += 1;
    }

    /// Get the current value of the specified counter.
    pub fn get(&self, counter: Counter) -> u64 {
        self.stats[counter as usize]
    }
}

/// Callback handle for search progress.
///
/// All methods have empty defaults; implement only what you care about.
/// The driver guarantees callbacks fire on the single search thread, between
/// primitive operations.
pub trait SearchObserver {
    /// A strictly better rule list was found.
    fn incumbent_updated(&mut self, _objective: f64, _prefix_len: usize, _num_nodes: usize) {}

    /// The trie was garbage collected, shrinking from `before` to `after` nodes.
    fn garbage_collected(&mut self, _before: usize, _after: usize) {}

    /// A non-fatal input problem was detected and worked around.
    fn warning(&mut self, _message: &str) {}
}

/// Observer that ignores everything. The default for tests.
#[derive(Debug, Default)]
pub struct NullObserver;

impl SearchObserver for NullObserver {}

/// Observer that reports progress on stderr.
#[derive(Debug, Default)]
pub struct StderrObserver;

impl SearchObserver for StderrObserver {
    fn incumbent_updated(&mut self, objective: f64, prefix_len: usize, num_nodes: usize) {
        eprintln!(
            "[search] min(objective) -> {:.5}, length: {}, cache size: {}",
            objective, prefix_len, num_nodes
        );
    }

    fn garbage_collected(&mut self, before: usize, after: usize) {
        eprintln!("[search] garbage collect: {} -> {} nodes", before, after);
    }

    fn warning(&mut self, message: &str) {
        eprintln!("[search] warning: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = Statistics::new();
        assert_eq!(stats.get(Counter::NodeSelections), 0);
        assert_eq!(stats.get(Counter::MapDominated), 0);
    }

    #[test]
    fn test_increment() {
        let mut stats = Statistics::new();
        stats.increment(Counter::TreeInsertions);
        stats.increment(Counter::TreeInsertions);
        stats.increment(Counter::LazyReclaims);

        assert_eq!(stats.get(Counter::TreeInsertions), 2);
        assert_eq!(stats.get(Counter::LazyReclaims), 1);
        assert_eq!(stats.get(Counter::QueueInsertions), 0);
    }

    #[test]
    fn test_null_observer_is_silent() {
        let mut obs = NullObserver;
        obs.incumbent_updated(0.5, 1, 10);
        obs.garbage_collected(10, 5);
        obs.warning("nothing happens");
    }
}
