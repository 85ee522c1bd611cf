// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Integration tests for the work queue's select discipline against the
//! trie's lazy-deletion protocol.

use rulelist_search::bitvec::BitVec;
use rulelist_search::catalog::load::load_ruleset;
use rulelist_search::queue::{QueuePolicy, SearchQueue};
use rulelist_search::stats::{Counter, NullObserver, Statistics};
use rulelist_search::trie::{Ablation, Trie};
use rulelist_search::RuleSet;

fn catalogue() -> RuleSet {
    load_ruleset(
        "default 11111111\n{a=1} 11110000\n{b=1} 00111100\n{c=1} 00001111\n",
        "{label=0} 00001111\n{label=1} 11110000\n",
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

#[test]
fn test_select_walks_prefix_and_captured() {
    let data = catalogue();
    let mut tree = fresh_trie(&data);

    // Chain root -> 1 -> 2, interiors done
    let root = tree.root().unwrap();
    let a = tree.construct_node(1, true, true, 0.1, 0.4, root, 4, 0.0);
    tree.insert(a);
    tree.mark_done(root);
    let b = tree.construct_node(2, true, true, 0.12, 0.4, a, 2, 0.0);
    tree.insert(b);
    tree.mark_done(a);

    let mut queue = SearchQueue::new(QueuePolicy::LowerBound);
    queue.push(&tree, b);

    let mut captured = BitVec::zeros(8);
    let mut stats = Statistics::new();
    let (node, prefix) = queue
        .select(&mut tree, &data, &mut captured, &mut stats)
        .unwrap();

    assert_eq!(node, b);
    assert_eq!(prefix, vec![1, 2]);

    let mut expected = BitVec::zeros(8);
    expected.or_assign(data.rule(1).truthtable());
    expected.or_assign(data.rule(2).truthtable());
    assert_eq!(captured, expected);
}

#[test]
fn test_select_reclaims_tombstoned_chain_leaf() {
    let data = catalogue();
    let mut tree = fresh_trie(&data);

    // 3-deep chain below the root
    let mut n = tree.root().unwrap();
    for i in 0..3u16 {
        tree.mark_done(n);
        let child = tree.construct_node(i + 1, true, true, 0.1, 0.4, n, 4, 0.0);
        tree.insert(child);
        n = child;
    }
    assert_eq!(tree.num_nodes(), 4);

    let mut queue = SearchQueue::new(QueuePolicy::Bfs);
    queue.push(&tree, n);

    tree.tombstone(n);
    assert!(tree.node(n).deleted());

    let before = tree.num_nodes();
    let mut captured = BitVec::zeros(8);
    let mut stats = Statistics::new();
    let selected = queue.select(&mut tree, &data, &mut captured, &mut stats);

    // The tombstoned leaf is reclaimed, exactly one node leaves the count,
    // and nothing is returned
    assert!(selected.is_none());
    assert_eq!(tree.num_nodes(), before - 1);
    assert_eq!(captured.count_ones(), 0);
    assert_eq!(stats.get(Counter::LazyReclaims), 1);
}

#[test]
fn test_garbage_collect_then_select_cleanup() {
    let data = catalogue();
    let mut tree = fresh_trie(&data);
    let root = tree.root().unwrap();

    let minobj = 0.5;
    tree.update_min_objective(minobj);

    // Three children of the root with effective lower bounds above, at, and
    // below the incumbent, each carrying two leaves.
    let lbs = [minobj + 0.2, minobj, minobj - 0.2];
    let mut leaves = Vec::new();
    tree.mark_done(root);
    for (i, &lb) in lbs.iter().enumerate() {
        let child = tree.construct_node((i + 1) as u16, true, true, lb, 0.12, root, 4, 0.0);
        tree.insert(child);
        tree.mark_done(child);
        for j in 0..2u16 {
            let leaf = tree.construct_node(
                4 + j,
                true,
                true,
                minobj - 0.1 - 0.05 * j as f64,
                0.12,
                child,
                4,
                0.0,
            );
            tree.insert(leaf);
            leaves.push(leaf);
        }
    }
    assert_eq!(tree.num_nodes(), 10);

    tree.garbage_collect();

    // Two interiors destroyed, their four leaves tombstoned
    assert_eq!(tree.num_nodes(), 8);
    for &leaf in &leaves[0..4] {
        assert!(tree.node(leaf).deleted());
    }
    for &leaf in &leaves[4..6] {
        assert!(!tree.node(leaf).deleted());
    }

    // Feed the four tombstoned leaves to select: all are reclaimed and
    // nothing comes back
    let mut queue = SearchQueue::new(QueuePolicy::LowerBound);
    for &leaf in &leaves[0..4] {
        queue.push(&tree, leaf);
    }

    let mut captured = BitVec::zeros(8);
    let mut stats = Statistics::new();
    let selected = queue.select(&mut tree, &data, &mut captured, &mut stats);

    assert!(selected.is_none());
    assert_eq!(tree.num_nodes(), 4);
    assert_eq!(stats.get(Counter::LazyReclaims), 4);
}
