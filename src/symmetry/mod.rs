// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Permutation symmetry pruning.
//!
//! Two prefixes that are permutations of the same rule set capture exactly
//! the same samples, so their extensions have identical futures: only the
//! permutation with the smallest lower bound needs to be explored. This
//! module memoises the best lower bound seen per canonical key and prunes
//! the losers: either by refusing to create the new branch (the cached
//! witness is at least as good) or by demolishing the cached witness's trie
//! branch (the newcomer is strictly better).
//!
//! # Keys
//!
//! - [`MapKind::Prefix`] keys on the ascending rule-id sequence of the
//!   prefix and stores the index permutation that realised the best bound.
//! - [`MapKind::Captured`] keys on the exact not-captured bit vector after
//!   the prefix and stores the realising prefix verbatim. Coarser than the
//!   prefix key: different rule sets with the same captured set collide,
//!   which prunes more at the cost of bigger keys.
//! - [`MapKind::None`] disables the bound entirely.
//!
//! Ties in the stored bound are treated as dominated, so the first
//! permutation seen wins and exploration order stays stable.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::bitvec::BitVec;
use crate::catalog::RuleId;
use crate::stats::{Counter, Statistics};
use crate::trie::{NodeId, Trie};

/// Which symmetry map the search uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapKind {
    /// No symmetry pruning.
    None,
    /// Key on the sorted rule-id sequence.
    Prefix,
    /// Key on the not-captured bit vector.
    Captured,
}

impl MapKind {
    /// Decode the conventional integer encoding: 0 none, 1 prefix,
    /// 2 captured.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MapKind::None),
            1 => Some(MapKind::Prefix),
            2 => Some(MapKind::Captured),
            _ => None,
        }
    }
}

/// A candidate child the bound battery has already vetted, ready to be
/// routed through the symmetry map.
#[derive(Debug)]
pub struct Candidate<'a> {
    pub rule_id: RuleId,
    pub prediction: bool,
    pub default_prediction: bool,
    pub lower_bound: f64,
    pub objective: f64,
    /// Samples not captured after this rule is appended.
    pub num_not_captured: usize,
    pub equivalent_minority: f64,
    pub parent: NodeId,
    pub parent_prefix: &'a [RuleId],
    /// Not-captured vector after this rule is appended.
    pub not_captured: &'a BitVec,
}

/// Best-lower-bound witness for a prefix key: the index permutation that
/// realised it. `indices[j]` is the position of the j-th smallest rule id in
/// the realising prefix, so the prefix is rebuilt as
/// `prefix[indices[j]] = key[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixWitness {
    pub lower_bound: f64,
    pub indices: Vec<u8>,
}

/// Best-lower-bound witness for a captured key: the realising prefix itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedWitness {
    pub lower_bound: f64,
    pub prefix: Vec<RuleId>,
}

/// The symmetry map, dispatched by kind at each insertion.
#[derive(Debug)]
pub enum SymmetryMap {
    None,
    Prefix(FxHashMap<Vec<RuleId>, PrefixWitness>),
    Captured(FxHashMap<BitVec, CapturedWitness>),
}

impl SymmetryMap {
    pub fn new(kind: MapKind) -> Self {
        match kind {
            MapKind::None => SymmetryMap::None,
            MapKind::Prefix => SymmetryMap::Prefix(FxHashMap::default()),
            MapKind::Captured => SymmetryMap::Captured(FxHashMap::default()),
        }
    }

    pub fn kind(&self) -> MapKind {
        match self {
            SymmetryMap::None => MapKind::None,
            SymmetryMap::Prefix(_) => MapKind::Prefix,
            SymmetryMap::Captured(_) => MapKind::Captured,
        }
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        match self {
            SymmetryMap::None => 0,
            SymmetryMap::Prefix(map) => map.len(),
            SymmetryMap::Captured(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Witness for a prefix key, for inspection in tests.
    pub fn prefix_witness(&self, key: &[RuleId]) -> Option<&PrefixWitness> {
        match self {
            SymmetryMap::Prefix(map) => map.get(key),
            _ => None,
        }
    }

    /// Witness for a captured key, for inspection in tests.
    pub fn captured_witness(&self, key: &BitVec) -> Option<&CapturedWitness> {
        match self {
            SymmetryMap::Captured(map) => map.get(key),
            _ => None,
        }
    }

    /// Route a vetted candidate through the map.
    ///
    /// Returns the constructed (not yet attached) trie node when the
    /// candidate survives, `None` when a permutation with a lower bound at
    /// least as good is already cached. A strictly better candidate
    /// demolishes the cached witness's branch before taking its place.
    pub fn insert(
        &mut self,
        cand: &Candidate,
        tree: &mut Trie,
        stats: &mut Statistics,
    ) -> Option<NodeId> {
        match self {
            SymmetryMap::None => Some(construct(tree, cand)),
            SymmetryMap::Prefix(map) => {
                let (key, indices) = prefix_key(cand.parent_prefix, cand.rule_id);
                match map.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert(PrefixWitness {
                            lower_bound: cand.lower_bound,
                            indices,
                        });
                        Some(construct(tree, cand))
                    }
                    Entry::Occupied(mut slot) => {
                        if slot.get().lower_bound <= cand.lower_bound {
                            stats.increment(Counter::MapDominated);
                            return None;
                        }
                        let old_prefix = {
                            let witness = slot.get();
                            let key = slot.key();
                            let mut prefix = vec![0 as RuleId; key.len()];
                            for (j, &rule_id) in key.iter().enumerate() {
                                prefix[witness.indices[j] as usize] = rule_id;
                            }
                            prefix
                        };
                        demolish(tree, &old_prefix, stats);
                        slot.insert(PrefixWitness {
                            lower_bound: cand.lower_bound,
                            indices,
                        });
                        Some(construct(tree, cand))
                    }
                }
            }
            SymmetryMap::Captured(map) => {
                let key = cand.not_captured.clone();
                let mut prefix = Vec::with_capacity(cand.parent_prefix.len() + 1);
                prefix.extend_from_slice(cand.parent_prefix);
                prefix.push(cand.rule_id);
                match map.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert(CapturedWitness {
                            lower_bound: cand.lower_bound,
                            prefix,
                        });
                        Some(construct(tree, cand))
                    }
                    Entry::Occupied(mut slot) => {
                        if slot.get().lower_bound <= cand.lower_bound {
                            stats.increment(Counter::MapDominated);
                            return None;
                        }
                        let old_prefix = slot.get().prefix.clone();
                        demolish(tree, &old_prefix, stats);
                        slot.insert(CapturedWitness {
                            lower_bound: cand.lower_bound,
                            prefix,
                        });
                        Some(construct(tree, cand))
                    }
                }
            }
        }
    }
}

/// Canonical prefix key and witness permutation for `parent_prefix` extended
/// by `new_rule`: the rule ids sorted ascending, and for each sorted
/// position the index it came from in the realised prefix.
fn prefix_key(parent_prefix: &[RuleId], new_rule: RuleId) -> (Vec<RuleId>, Vec<u8>) {
    // Witness indices are u8; the bounds keep reachable prefixes far
    // shorter than that.
    debug_assert!(parent_prefix.len() < u8::MAX as usize);
    let mut order: Vec<(RuleId, u8)> = parent_prefix
        .iter()
        .copied()
        .chain(std::iter::once(new_rule))
        .enumerate()
        .map(|(position, rule_id)| (rule_id, position as u8))
        .collect();
    order.sort_unstable();
    let key = order.iter().map(|&(rule_id, _)| rule_id).collect();
    let indices = order.iter().map(|&(_, position)| position).collect();
    (key, indices)
}

fn construct(tree: &mut Trie, cand: &Candidate) -> NodeId {
    tree.construct_node(
        cand.rule_id,
        cand.prediction,
        cand.default_prediction,
        cand.lower_bound,
        cand.objective,
        cand.parent,
        cand.num_not_captured,
        cand.equivalent_minority,
    )
}

/// Detach and lazily delete the trie branch realising a beaten witness, if
/// it is still present (garbage collection may have removed it already).
fn demolish(tree: &mut Trie, prefix: &[RuleId], stats: &mut Statistics) {
    if let Some(witness) = tree.check_prefix(prefix) {
        tree.detach(witness);
        tree.delete_subtree(witness, false);
        stats.increment(Counter::MapDemolished);
    }
}
