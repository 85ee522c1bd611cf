// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The priority work queue over live trie leaves.
//!
//! The queue decides which prefix the search expands next. Its ordering is
//! picked at construction from five policies; the heap itself stores
//! non-owning [`NodeId`]s with a priority score snapshotted at push time
//! (a queued node's depth, bounds, and curiosity never change, so the
//! snapshot stays accurate).
//!
//! # Lazy deletion
//!
//! Trie pruning can invalidate queued nodes long before they reach the top
//! of the heap. Rather than removing them from the middle (expensive in a
//! binary heap), invalidated leaves carry a tombstone and stay queued;
//! [`SearchQueue::select`] is the single place they are reclaimed. `select`
//! also destroys popped nodes whose effective lower bound has been overtaken
//! by the incumbent since they were pushed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::bitvec::BitVec;
use crate::catalog::{RuleId, RuleSet};
use crate::stats::{Counter, Statistics};
use crate::trie::{NodeId, Trie};

/// Expansion-order policy. Larger score = expanded sooner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueuePolicy {
    /// Shallowest prefix first.
    Bfs,
    /// Deepest prefix first.
    Dfs,
    /// Smallest curiosity score first.
    Curious,
    /// Smallest lower bound first.
    LowerBound,
    /// Smallest objective first.
    Objective,
}

impl QueuePolicy {
    /// Decode the conventional integer encoding: 0 BFS, 1 curious, 2 lower
    /// bound, 3 objective, 4 DFS.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(QueuePolicy::Bfs),
            1 => Some(QueuePolicy::Curious),
            2 => Some(QueuePolicy::LowerBound),
            3 => Some(QueuePolicy::Objective),
            4 => Some(QueuePolicy::Dfs),
            _ => None,
        }
    }

    /// True for the policy that needs curiosity scores on trie nodes.
    pub fn is_curious(self) -> bool {
        self == QueuePolicy::Curious
    }
}

#[derive(Debug)]
struct HeapEntry {
    score: f64,
    seq: u64,
    node: NodeId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Scores are finite by construction; ties go to the earlier push so
        // the exploration order is fully deterministic.
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Max-heap of live trie leaves awaiting expansion.
#[derive(Debug)]
pub struct SearchQueue {
    policy: QueuePolicy,
    heap: BinaryHeap<HeapEntry>,
    next_seq: u64,
}

impl SearchQueue {
    pub fn new(policy: QueuePolicy) -> Self {
        Self {
            policy,
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn score(&self, tree: &Trie, id: NodeId) -> f64 {
        let node = tree.node(id);
        match self.policy {
            QueuePolicy::Bfs => -(node.depth() as f64),
            QueuePolicy::Dfs => node.depth() as f64,
            QueuePolicy::Curious => -node.curiosity(),
            QueuePolicy::LowerBound => -node.lower_bound(),
            QueuePolicy::Objective => -node.objective(),
        }
    }

    /// Enqueue a trie leaf.
    pub fn push(&mut self, tree: &Trie, id: NodeId) {
        let score = self.score(tree, id);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(HeapEntry {
            score,
            seq,
            node: id,
        });
    }

    /// The highest-priority node, without removing it.
    pub fn front(&self) -> Option<NodeId> {
        self.heap.peek().map(|e| e.node)
    }

    /// Remove and return the highest-priority node, with no viability
    /// checks. Most callers want [`SearchQueue::select`].
    pub fn pop(&mut self) -> Option<NodeId> {
        self.heap.pop().map(|e| e.node)
    }

    /// Pop until a viable node surfaces, destroying non-viable entries.
    ///
    /// A popped node is destroyed (and counted out of the trie) when it is
    /// tombstoned, or when its effective lower bound has reached the
    /// incumbent objective. For the surviving node, the prefix is rebuilt
    /// root-to-leaf and `captured` is overwritten with the union of its
    /// rules' truth tables. Returns `None` if the queue empties first, with
    /// `captured` cleared.
    pub fn select(
        &mut self,
        tree: &mut Trie,
        data: &RuleSet,
        captured: &mut BitVec,
        stats: &mut Statistics,
    ) -> Option<(NodeId, Vec<RuleId>)> {
        captured.clear();
        loop {
            let entry = self.heap.pop()?;
            let id = entry.node;
            let viable = !tree.node(id).deleted()
                && tree.effective_lower_bound(id) < tree.min_objective();
            if !viable {
                tree.destroy_reaped(id);
                stats.increment(Counter::LazyReclaims);
                continue;
            }

            let mut prefix = Vec::with_capacity(tree.node(id).depth());
            let mut cur = id;
            while let Some(parent) = tree.node(cur).parent() {
                let rule_id = tree.node(cur).rule_id();
                captured.or_assign(data.rule(rule_id as usize).truthtable());
                prefix.push(rule_id);
                cur = parent;
            }
            prefix.reverse();
            return Some((id, prefix));
        }
    }
}
