// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Integration tests for both symmetry-map variants: first-insert caching,
//! domination by an equal-or-better cached bound, and witness demolition by
//! a strictly better permutation.

use rulelist_search::bitvec::BitVec;
use rulelist_search::catalog::load::load_ruleset;
use rulelist_search::stats::{Counter, NullObserver, Statistics};
use rulelist_search::symmetry::{Candidate, MapKind, SymmetryMap};
use rulelist_search::trie::{Ablation, NodeId, Trie};
use rulelist_search::{RuleId, RuleSet};

/// Ten samples and five real rules, so prefixes over ids {1, 2, 4, 5} exist.
fn catalogue() -> RuleSet {
    load_ruleset(
        concat!(
            "default 1111111111\n",
            "{a=1} 1100000000\n",
            "{b=1} 0011000000\n",
            "{c=1} 0000110000\n",
            "{d=1} 0000001100\n",
            "{e=1} 0000000011\n",
        ),
        "{label=0} 0101010101\n{label=1} 1010101010\n",
        None,
        &mut NullObserver,
    )
    .unwrap()
}

fn fresh_trie(data: &RuleSet) -> Trie {
    let mut tree = Trie::new(data, 0.01, Ablation::None, false, false);
    tree.insert_root(data);
    tree
}

/// Attach a chain of rule ids below the root, returning the final node.
fn grow_chain(tree: &mut Trie, ids: &[RuleId]) -> NodeId {
    let mut n = tree.root().unwrap();
    for &id in ids {
        tree.mark_done(n);
        let child = tree.construct_node(id, true, true, 0.1, 0.5, n, 4, 0.0);
        tree.insert(child);
        n = child;
    }
    n
}

fn candidate<'a>(
    rule_id: RuleId,
    lower_bound: f64,
    parent: NodeId,
    parent_prefix: &'a [RuleId],
    not_captured: &'a BitVec,
) -> Candidate<'a> {
    Candidate {
        rule_id,
        prediction: true,
        default_prediction: true,
        lower_bound,
        objective: 0.5,
        num_not_captured: 4,
        equivalent_minority: 0.0,
        parent,
        parent_prefix,
        not_captured,
    }
}

#[test]
fn test_prefix_map_insert_into_empty() {
    let data = catalogue();
    let mut tree = fresh_trie(&data);
    let mut map = SymmetryMap::new(MapKind::Prefix);
    let mut stats = Statistics::new();

    let parent = grow_chain(&mut tree, &[4, 2, 1]);
    let not_captured = BitVec::zeros(10);
    let cand = candidate(5, 0.1, parent, &[4, 2, 1], &not_captured);

    let node = map.insert(&cand, &mut tree, &mut stats).unwrap();

    // Node carries the candidate's attributes
    assert_eq!(tree.node(node).rule_id(), 5);
    assert_eq!(tree.node(node).parent(), Some(parent));
    assert!((tree.node(node).lower_bound() - 0.1).abs() < 1e-12);
    assert_eq!(tree.node(node).num_captured(), 10 - 4);

    // Map cached the canonical key with the realising permutation
    assert_eq!(map.len(), 1);
    let witness = map.prefix_witness(&[1, 2, 4, 5]).unwrap();
    assert!((witness.lower_bound - 0.1).abs() < 1e-12);
    assert_eq!(witness.indices, vec![2, 1, 0, 3]);
}

#[test]
fn test_prefix_map_higher_bound_is_dominated() {
    let data = catalogue();
    let mut tree = fresh_trie(&data);
    let mut map = SymmetryMap::new(MapKind::Prefix);
    let mut stats = Statistics::new();

    let parent = grow_chain(&mut tree, &[4, 2, 1]);
    let not_captured = BitVec::zeros(10);
    let first = candidate(5, 0.1, parent, &[4, 2, 1], &not_captured);
    assert!(map.insert(&first, &mut tree, &mut stats).is_some());

    // Same rule set in another order, with a worse bound: blocked
    let root = tree.root().unwrap();
    let second = candidate(2, 0.12, root, &[1, 4, 5], &not_captured);
    assert!(map.insert(&second, &mut tree, &mut stats).is_none());

    assert_eq!(map.len(), 1);
    assert_eq!(stats.get(Counter::MapDominated), 1);
    let witness = map.prefix_witness(&[1, 2, 4, 5]).unwrap();
    assert!((witness.lower_bound - 0.1).abs() < 1e-12);
    assert_eq!(witness.indices, vec![2, 1, 0, 3]);
}

#[test]
fn test_prefix_map_equal_bound_is_dominated() {
    let data = catalogue();
    let mut tree = fresh_trie(&data);
    let mut map = SymmetryMap::new(MapKind::Prefix);
    let mut stats = Statistics::new();

    let parent = grow_chain(&mut tree, &[4, 2, 1]);
    let not_captured = BitVec::zeros(10);
    let first = candidate(5, 0.1, parent, &[4, 2, 1], &not_captured);
    assert!(map.insert(&first, &mut tree, &mut stats).is_some());

    // First seen wins on ties
    let root = tree.root().unwrap();
    let second = candidate(2, 0.1, root, &[1, 4, 5], &not_captured);
    assert!(map.insert(&second, &mut tree, &mut stats).is_none());
    assert_eq!(stats.get(Counter::MapDominated), 1);
    assert_eq!(
        map.prefix_witness(&[1, 2, 4, 5]).unwrap().indices,
        vec![2, 1, 0, 3]
    );
}

#[test]
fn test_prefix_map_lower_bound_demolishes_witness() {
    let data = catalogue();
    let mut tree = fresh_trie(&data);
    let mut map = SymmetryMap::new(MapKind::Prefix);
    let mut stats = Statistics::new();

    let parent = grow_chain(&mut tree, &[4, 2, 1]);
    let not_captured = BitVec::zeros(10);
    let first = candidate(5, 0.1, parent, &[4, 2, 1], &not_captured);
    let old_leaf = map.insert(&first, &mut tree, &mut stats).unwrap();
    tree.insert(old_leaf);
    assert_eq!(tree.check_prefix(&[4, 2, 1, 5]), Some(old_leaf));

    // Strictly better permutation: the cached branch is demolished and the
    // entry replaced
    let root = tree.root().unwrap();
    let second = candidate(2, 0.08, root, &[1, 4, 5], &not_captured);
    let new_node = map.insert(&second, &mut tree, &mut stats).unwrap();

    assert_eq!(tree.node(new_node).rule_id(), 2);
    assert_eq!(stats.get(Counter::MapDemolished), 1);
    // The old leaf was tombstoned and unhooked from the trie
    assert!(tree.node(old_leaf).deleted());
    assert_eq!(tree.check_prefix(&[4, 2, 1, 5]), None);

    assert_eq!(map.len(), 1);
    let witness = map.prefix_witness(&[1, 2, 4, 5]).unwrap();
    assert!((witness.lower_bound - 0.08).abs() < 1e-12);
    assert_eq!(witness.indices, vec![0, 3, 1, 2]);
}

#[test]
fn test_captured_map_insert_into_empty() {
    let data = catalogue();
    let mut tree = fresh_trie(&data);
    let mut map = SymmetryMap::new(MapKind::Captured);
    let mut stats = Statistics::new();

    // Not-captured vector after applying rules {1, 2, 4, 5}
    let mut key = BitVec::all_ones(10);
    let mut scratch = BitVec::zeros(10);
    for id in [1usize, 2, 4, 5] {
        scratch.and_not_from(&key, data.rule(id).truthtable());
        std::mem::swap(&mut key, &mut scratch);
    }

    let parent = grow_chain(&mut tree, &[4, 2, 1]);
    let cand = candidate(5, 0.1, parent, &[4, 2, 1], &key);
    let node = map.insert(&cand, &mut tree, &mut stats).unwrap();

    assert_eq!(tree.node(node).rule_id(), 5);
    assert_eq!(map.len(), 1);
    let witness = map.captured_witness(&key).unwrap();
    assert!((witness.lower_bound - 0.1).abs() < 1e-12);
    assert_eq!(witness.prefix, vec![4, 2, 1, 5]);
}

#[test]
fn test_captured_map_domination_and_replacement() {
    let data = catalogue();
    let mut tree = fresh_trie(&data);
    let mut map = SymmetryMap::new(MapKind::Captured);
    let mut stats = Statistics::new();

    let key = BitVec::zeros(10);
    let parent = grow_chain(&mut tree, &[4, 2, 1]);
    let first = candidate(5, 0.1, parent, &[4, 2, 1], &key);
    let old_leaf = map.insert(&first, &mut tree, &mut stats).unwrap();
    tree.insert(old_leaf);

    // Worse bound on the same captured set: blocked, witness untouched
    let root = tree.root().unwrap();
    let worse = candidate(2, 0.12, root, &[1, 4, 5], &key);
    assert!(map.insert(&worse, &mut tree, &mut stats).is_none());
    assert_eq!(stats.get(Counter::MapDominated), 1);
    assert_eq!(map.captured_witness(&key).unwrap().prefix, vec![4, 2, 1, 5]);

    // Better bound: witness branch demolished, entry replaced
    let better = candidate(2, 0.05, root, &[1, 4, 5], &key);
    assert!(map.insert(&better, &mut tree, &mut stats).is_some());
    assert_eq!(stats.get(Counter::MapDemolished), 1);
    assert!(tree.node(old_leaf).deleted());

    let witness = map.captured_witness(&key).unwrap();
    assert!((witness.lower_bound - 0.05).abs() < 1e-12);
    assert_eq!(witness.prefix, vec![1, 4, 5, 2]);
}

#[test]
fn test_no_map_always_constructs() {
    let data = catalogue();
    let mut tree = fresh_trie(&data);
    let mut map = SymmetryMap::new(MapKind::None);
    let mut stats = Statistics::new();

    let root = tree.root().unwrap();
    let not_captured = BitVec::zeros(10);
    // The same candidate twice: no deduplication at all
    let cand = candidate(1, 0.1, root, &[], &not_captured);
    assert!(map.insert(&cand, &mut tree, &mut stats).is_some());
    assert!(map.insert(&cand, &mut tree, &mut stats).is_some());
    assert_eq!(map.len(), 0);
    assert_eq!(stats.get(Counter::MapDominated), 0);
}
