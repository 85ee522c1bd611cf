// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The prefix cache trie.
//!
//! The trie materialises the explored part of the rule-permutation search
//! space: a node at depth `d` stands for the ordered prefix formed by the
//! rule ids on its root-to-node path, and caches the bounds computed when
//! that prefix was evaluated. The trie also owns the incumbent: the best
//! objective seen so far and the rule list realising it.
//!
//! # Arena
//!
//! Nodes live in an arena (`Vec<Option<Node>>` plus a free list) and refer
//! to each other by [`NodeId`] index. The work queue stores the same
//! indices. A freed slot is only recycled once nothing can reference it:
//! interior nodes are destroyed only after they are `done` (and a done node
//! was already popped from the queue), while leaves that may still be queued
//! are tombstoned with [`Node::deleted`] and reclaimed by the queue's
//! `select` when it next sees them.
//!
//! # Deletion modes
//!
//! [`Trie::delete_subtree`] mirrors that split: interior nodes are always
//! destroyed, leaves are destroyed only in destructive mode and tombstoned
//! otherwise. [`Trie::garbage_collect`] detaches and lazily deletes every
//! subtree whose effective lower bound can no longer beat the incumbent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{RuleId, RuleSet};

/// Which bound family to suppress, for A/B experiments on the pruning power
/// of the individual bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ablation {
    /// All bounds active.
    None,
    /// Suppress the two antecedent-support bounds.
    NoSupportBounds,
    /// Suppress the lookahead bound.
    NoLookaheadBound,
}

impl Ablation {
    /// Decode the conventional integer encoding: 0, 1, or 2.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Ablation::None),
            1 => Some(Ablation::NoSupportBounds),
            2 => Some(Ablation::NoLookaheadBound),
            _ => None,
        }
    }
}

/// Index of a node in the trie arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One explored prefix extension.
///
/// The node's `rule_id` is the single rule it contributes; the full prefix
/// is read off the parent chain. Bounds and capture counts are fixed at
/// construction; only the `done` and `deleted` flags change afterwards.
#[derive(Debug)]
pub struct Node {
    rule_id: RuleId,
    prediction: bool,
    default_prediction: bool,
    lower_bound: f64,
    objective: f64,
    equivalent_minority: f64,
    curiosity: f64,
    depth: usize,
    num_captured: usize,
    done: bool,
    deleted: bool,
    parent: Option<NodeId>,
    children: BTreeMap<RuleId, NodeId>,
}

impl Node {
    pub fn rule_id(&self) -> RuleId {
        self.rule_id
    }

    pub fn prediction(&self) -> bool {
        self.prediction
    }

    pub fn default_prediction(&self) -> bool {
        self.default_prediction
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn equivalent_minority(&self) -> f64 {
        self.equivalent_minority
    }

    /// Priority score for the curious queue policy; zero unless the trie was
    /// built for that policy.
    pub fn curiosity(&self) -> f64 {
        self.curiosity
    }

    /// Length of the prefix ending at this node; the root is at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Samples captured by the whole prefix ending here.
    pub fn num_captured(&self) -> usize {
        self.num_captured
    }

    /// True once this node's children have been enumerated.
    pub fn done(&self) -> bool {
        self.done
    }

    pub fn set_done(&mut self) {
        self.done = true;
    }

    /// Lazy-deletion tombstone; never cleared once set.
    pub fn deleted(&self) -> bool {
        self.deleted
    }

    pub fn set_deleted(&mut self) {
        self.deleted = true;
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child reached by extending this prefix with `rule_id`.
    pub fn child(&self, rule_id: RuleId) -> Option<NodeId> {
        self.children.get(&rule_id).copied()
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Children in ascending rule-id order.
    pub fn children_ids(&self) -> Vec<NodeId> {
        self.children.values().copied().collect()
    }
}

/// The cache trie, its arena, and the incumbent state.
#[derive(Debug)]
pub struct Trie {
    slots: Vec<Option<Node>>,
    free: Vec<u32>,
    root: Option<NodeId>,

    nsamples: usize,
    nrules: usize,
    c: f64,
    ablation: Ablation,
    curious: bool,

    min_objective: f64,
    opt_rulelist: Vec<RuleId>,
    opt_predictions: Vec<bool>,

    num_nodes: usize,
    num_evaluated: usize,

    // Optional side-band bookkeeping: live (unexpanded, untombstoned) leaves
    // by depth.
    depth_counts: Option<Vec<u64>>,
}

impl Trie {
    /// Create an empty trie for the given catalogue and search settings.
    ///
    /// `curious` enables the curiosity score on constructed nodes;
    /// `track_sizes` enables the live-leaf depth histogram.
    pub fn new(
        data: &RuleSet,
        c: f64,
        ablation: Ablation,
        curious: bool,
        track_sizes: bool,
    ) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            nsamples: data.nsamples(),
            nrules: data.nrules(),
            c,
            ablation,
            curious,
            min_objective: 0.5,
            opt_rulelist: Vec::new(),
            opt_predictions: Vec::new(),
            num_nodes: 0,
            num_evaluated: 0,
            depth_counts: if track_sizes {
                Some(vec![0; data.nrules()])
            } else {
                None
            },
        }
    }

    pub fn nsamples(&self) -> usize {
        self.nsamples
    }

    pub fn nrules(&self) -> usize {
        self.nrules
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn ablation(&self) -> Ablation {
        self.ablation
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_evaluated(&self) -> usize {
        self.num_evaluated
    }

    pub fn min_objective(&self) -> f64 {
        self.min_objective
    }

    /// The best rule list seen so far.
    pub fn opt_rulelist(&self) -> &[RuleId] {
        &self.opt_rulelist
    }

    /// Predictions of the best rule list, the trailing entry being the
    /// default rule's.
    pub fn opt_predictions(&self) -> &[bool] {
        &self.opt_predictions
    }

    /// Live leaves by depth, when size tracking was requested.
    pub fn live_leaf_depths(&self) -> Option<&[u64]> {
        self.depth_counts.as_deref()
    }

    /// Shared access to a node. Panics on a stale id; ids are only stale if
    /// the caller kept one across a deletion, which the queue discipline
    /// rules out.
    pub fn node(&self, id: NodeId) -> &Node {
        self.slots[id.index()].as_ref().expect("stale node id")
    }

    /// Exclusive access to a node.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id.index()].as_mut().expect("stale node id")
    }

    /// The bound `select` and garbage collection compare against the
    /// incumbent: the node's lower bound plus one rule's worth of
    /// regularization, unless the lookahead bound is ablated.
    pub fn effective_lower_bound(&self, id: NodeId) -> f64 {
        let lb = self.node(id).lower_bound;
        if self.ablation != Ablation::NoLookaheadBound {
            lb + self.c
        } else {
            lb
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(i) = self.free.pop() {
            self.slots[i as usize] = Some(node);
            NodeId(i)
        } else {
            self.slots.push(Some(node));
            NodeId((self.slots.len() - 1) as u32)
        }
    }

    /// Release a node's slot and count it out of the trie.
    fn release(&mut self, id: NodeId) {
        self.slots[id.index()] = None;
        self.free.push(id.0);
        self.num_nodes -= 1;
        if self.root == Some(id) {
            self.root = None;
        }
    }

    fn leaf_added(&mut self, depth: usize) {
        if let Some(counts) = &mut self.depth_counts {
            counts[depth] += 1;
        }
    }

    fn leaf_retired(&mut self, depth: usize) {
        if let Some(counts) = &mut self.depth_counts {
            counts[depth] = counts[depth].saturating_sub(1);
        }
    }

    /// Install the root: the empty prefix, classified entirely by the
    /// default rule. Initialises the incumbent to the default-rule-only
    /// objective `min(support(label0), support(label1)) / N`.
    pub fn insert_root(&mut self, data: &RuleSet) {
        let d0 = data.label(0).support();
        let d1 = self.nsamples - d0;
        let (default_prediction, objective) = if d0 > d1 {
            (false, d1 as f64 / self.nsamples as f64)
        } else {
            (true, d0 as f64 / self.nsamples as f64)
        };
        let equivalent_minority = match data.minority() {
            Some(m) => m.support() as f64 / self.nsamples as f64,
            None => 0.0,
        };

        let root = self.alloc(Node {
            rule_id: 0,
            prediction: default_prediction,
            default_prediction,
            lower_bound: equivalent_minority,
            objective,
            equivalent_minority,
            curiosity: 0.0,
            depth: 0,
            num_captured: 0,
            done: false,
            deleted: false,
            parent: None,
            children: BTreeMap::new(),
        });
        self.root = Some(root);
        self.num_nodes += 1;
        self.min_objective = objective;
        self.opt_rulelist.clear();
        self.opt_predictions.clear();
        self.opt_predictions.push(default_prediction);
        self.leaf_added(0);
    }

    /// Allocate a leaf extending `parent` with `rule_id`. The node is not
    /// attached and not counted until [`Trie::insert`].
    #[allow(clippy::too_many_arguments)]
    pub fn construct_node(
        &mut self,
        rule_id: RuleId,
        prediction: bool,
        default_prediction: bool,
        lower_bound: f64,
        objective: f64,
        parent: NodeId,
        num_not_captured: usize,
        equivalent_minority: f64,
    ) -> NodeId {
        let depth = self.node(parent).depth + 1;
        let num_captured = self.nsamples - num_not_captured;
        let curiosity = if self.curious {
            (lower_bound - equivalent_minority) * self.nsamples as f64 / num_captured as f64
        } else {
            0.0
        };
        self.alloc(Node {
            rule_id,
            prediction,
            default_prediction,
            lower_bound,
            objective,
            equivalent_minority,
            curiosity,
            depth,
            num_captured,
            done: false,
            deleted: false,
            parent: Some(parent),
            children: BTreeMap::new(),
        })
    }

    /// Attach a constructed node under its parent.
    pub fn insert(&mut self, id: NodeId) {
        let (rule_id, depth, parent) = {
            let node = self.node(id);
            (node.rule_id, node.depth, node.parent)
        };
        let parent = parent.expect("cannot insert a root through insert()");
        self.node_mut(parent).children.insert(rule_id, id);
        self.num_nodes += 1;
        self.leaf_added(depth);
    }

    /// Mark a node's children as fully enumerated.
    pub fn mark_done(&mut self, id: NodeId) {
        let depth = self.node(id).depth;
        if !self.node(id).done {
            self.node_mut(id).set_done();
            self.leaf_retired(depth);
        }
    }

    /// Remove a node from its parent's child table without destroying it.
    pub fn detach(&mut self, id: NodeId) {
        let (rule_id, parent) = {
            let node = self.node(id);
            (node.rule_id, node.parent)
        };
        if let Some(parent) = parent {
            self.node_mut(parent).children.remove(&rule_id);
        }
    }

    /// Walk the trie along `prefix` from the root. Returns the node whose
    /// root-to-node path spells `prefix`, or `None` if any edge is missing.
    pub fn check_prefix(&self, prefix: &[RuleId]) -> Option<NodeId> {
        let mut node = self.root?;
        for &rule_id in prefix {
            node = self.node(node).child(rule_id)?;
        }
        Some(node)
    }

    /// The prefix and per-rule predictions on the root-to-node path.
    pub fn prefix_and_predictions(&self, id: NodeId) -> (Vec<RuleId>, Vec<bool>) {
        let depth = self.node(id).depth;
        let mut prefix = Vec::with_capacity(depth);
        let mut predictions = Vec::with_capacity(depth);
        let mut cur = id;
        while let Some(parent) = self.node(cur).parent {
            prefix.push(self.node(cur).rule_id);
            predictions.push(self.node(cur).prediction);
            cur = parent;
        }
        prefix.reverse();
        predictions.reverse();
        (prefix, predictions)
    }

    /// Delete childless nodes walking from `node` towards the root,
    /// stopping at the first node that still has children. The root is
    /// counted out but its slot survives.
    pub fn prune_up(&mut self, id: NodeId) {
        let mut node = id;
        while self.node(node).children.is_empty() {
            let (depth, done, parent) = {
                let n = self.node(node);
                (n.depth, n.done, n.parent)
            };
            if depth > 0 {
                let parent = parent.expect("non-root node without parent");
                self.detach(node);
                if !done {
                    self.leaf_retired(depth);
                }
                self.release(node);
                node = parent;
            } else {
                if !done {
                    self.leaf_retired(depth);
                }
                self.num_nodes -= 1;
                break;
            }
        }
    }

    /// Delete the subtree rooted at `id`, which must already be detached
    /// from its parent.
    ///
    /// Interior (`done`) nodes are always destroyed. Leaves are destroyed in
    /// destructive mode and tombstoned otherwise, leaving the queue's
    /// `select` to reclaim them.
    pub fn delete_subtree(&mut self, id: NodeId, destructive: bool) {
        if self.node(id).done {
            for child in self.node(id).children_ids() {
                self.delete_subtree(child, destructive);
            }
            self.release(id);
        } else if destructive {
            let (depth, deleted) = {
                let n = self.node(id);
                (n.depth, n.deleted)
            };
            if !deleted {
                self.leaf_retired(depth);
            }
            self.release(id);
        } else {
            self.tombstone(id);
        }
    }

    /// Lazily mark a leaf for deletion; its slot and node count persist
    /// until the queue reclaims it.
    pub fn tombstone(&mut self, id: NodeId) {
        let (depth, deleted) = {
            let n = self.node(id);
            (n.depth, n.deleted)
        };
        if !deleted {
            self.node_mut(id).set_deleted();
            self.leaf_retired(depth);
        }
    }

    /// Destroy a node the queue popped and found non-viable.
    ///
    /// Tombstoned nodes were detached when their subtree was demolished, so
    /// only the slot is released; a still-live node is also removed from its
    /// parent, and the parent chain is pruned if that left it childless. A
    /// destroyed root keeps its slot, like `prune_up`.
    pub fn destroy_reaped(&mut self, id: NodeId) {
        if self.node(id).deleted {
            self.release(id);
            return;
        }
        let (depth, parent) = {
            let n = self.node(id);
            (n.depth, n.parent)
        };
        self.leaf_retired(depth);
        match parent {
            Some(parent) => {
                self.detach(id);
                self.release(id);
                self.prune_up(parent);
            }
            None => {
                // Root: counted out, slot kept.
                self.num_nodes -= 1;
            }
        }
    }

    /// Detach and lazily delete every subtree whose effective lower bound
    /// has reached the incumbent objective.
    pub fn garbage_collect(&mut self) {
        if let Some(root) = self.root {
            self.gc_helper(root);
        }
    }

    fn gc_helper(&mut self, id: NodeId) {
        for child in self.node(id).children_ids() {
            if self.effective_lower_bound(child) >= self.min_objective {
                self.detach(child);
                self.delete_subtree(child, false);
            } else {
                self.gc_helper(child);
            }
        }
    }

    /// Lower the incumbent objective. Callers only do this with strictly
    /// better values, keeping the incumbent monotone.
    pub fn update_min_objective(&mut self, objective: f64) {
        self.min_objective = objective;
    }

    /// Record the incumbent rule list as `parent_prefix` extended by
    /// `new_rule_id`.
    pub fn update_opt_rulelist(&mut self, parent_prefix: &[RuleId], new_rule_id: RuleId) {
        self.opt_rulelist.clear();
        self.opt_rulelist.extend_from_slice(parent_prefix);
        self.opt_rulelist.push(new_rule_id);
    }

    /// Record the incumbent predictions: the parent chain's, then the new
    /// rule's, then the default rule's.
    pub fn update_opt_predictions(
        &mut self,
        parent: NodeId,
        new_prediction: bool,
        new_default_prediction: bool,
    ) {
        let mut predictions = Vec::with_capacity(self.node(parent).depth + 2);
        let mut cur = parent;
        while let Some(up) = self.node(cur).parent {
            predictions.push(self.node(cur).prediction);
            cur = up;
        }
        predictions.reverse();
        predictions.push(new_prediction);
        predictions.push(new_default_prediction);
        self.opt_predictions = predictions;
    }

    pub fn increment_num_evaluated(&mut self) {
        self.num_evaluated += 1;
    }
}
