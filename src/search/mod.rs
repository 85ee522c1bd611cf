// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The branch-and-bound search driver.
//!
//! The driver owns the whole mutable world of one search (catalogue, cache
//! trie, work queue, symmetry map, statistics, scratch vectors) and runs
//! the `begin` / `step` / `end` lifecycle:
//!
//! 1. **begin** validates the configuration, builds the structures, installs
//!    the root (whose objective is the default-rule-only classifier), and
//!    queues it.
//! 2. **step** expands one queued prefix: `select` pops the next viable
//!    leaf, [`evaluate_children`] runs the bound battery over every one-rule
//!    extension, and survivors are routed through the symmetry map into the
//!    trie and queue. When the incumbent improved, the trie is garbage
//!    collected.
//! 3. **end** optionally garbage collects once more and reports the best
//!    rule list. With `early = true` nothing is touched, so a stopped run
//!    can still be inspected; all structures live until the `Search` itself
//!    is dropped.
//!
//! Everything is single threaded by design: a symmetry-map hit may demolish
//! an arbitrary trie subtree while the queue still holds indices into it,
//! which is only sound because nobody can observe the intermediate states.
//! Callers interleave their own work between `step` calls; cancellation is
//! simply ceasing to call `step`.
//!
//! # The bound battery
//!
//! For a candidate extension of `prefix` by rule `r`, in order:
//!
//! - **antecedent support**: `r` must newly capture at least `c·N` samples;
//! - **accurate support**: it must correctly classify at least `c·N` of
//!   them;
//! - **hierarchical lower bound**: the candidate's lower bound must beat the
//!   incumbent;
//! - **lookahead**: even one more rule's worth of regularization must still
//!   beat the incumbent;
//! - **equivalent points**: samples sharing features but not labels
//!   contribute irreducible error counted into the lower bound when a
//!   minority row is available.
//!
//! The first two are suppressed by [`Ablation::NoSupportBounds`], the
//! lookahead by [`Ablation::NoLookaheadBound`].

pub mod config;

pub use config::{ConfigError, SearchConfig};

use serde::{Deserialize, Serialize};

use crate::bitvec::BitVec;
use crate::catalog::{render_rulelist, RuleId, RuleSet};
use crate::queue::SearchQueue;
use crate::stats::{Counter, NullObserver, SearchObserver, Statistics};
use crate::symmetry::{Candidate, SymmetryMap};
use crate::trie::{Ablation, NodeId, Trie};

/// Outcome of a search: the best rule list found and how the run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    /// Rule ids of the best prefix, in evaluation order.
    pub rule_list: Vec<RuleId>,
    /// One prediction per rule, the trailing entry being the default rule's.
    pub predictions: Vec<bool>,
    /// Objective of the best rule list.
    pub min_objective: f64,
    /// Training accuracy: `1 − min_objective + c · |rule_list|`.
    pub accuracy: f64,
    pub num_nodes: usize,
    pub num_evaluated: usize,
    /// True iff the queue drained, making `min_objective` provably optimal.
    pub certified: bool,
}

/// One search over a rule catalogue. See the module docs for the lifecycle.
pub struct Search {
    config: SearchConfig,
    data: RuleSet,
    tree: Trie,
    queue: SearchQueue,
    map: SymmetryMap,
    stats: Statistics,
    observer: Box<dyn SearchObserver>,
    captured: BitVec,
    gc_threshold: f64,
    started: std::time::Instant,
}

impl Search {
    /// Validate `config` and set up a search over `data` with a silent
    /// observer.
    pub fn begin(data: RuleSet, config: SearchConfig) -> Result<Self, ConfigError> {
        Self::begin_with_observer(data, config, Box::new(NullObserver))
    }

    /// Validate `config` and set up a search over `data`.
    ///
    /// All configuration errors surface here, before any mutable state
    /// exists. On success the trie holds the root and the queue holds one
    /// entry for it.
    pub fn begin_with_observer(
        data: RuleSet,
        config: SearchConfig,
        observer: Box<dyn SearchObserver>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut tree = Trie::new(
            &data,
            config.c,
            config.ablation,
            config.policy.is_curious(),
            config.calculate_size,
        );
        tree.insert_root(&data);
        let root = tree.root().expect("insert_root installs a root");

        let mut queue = SearchQueue::new(config.policy);
        queue.push(&tree, root);

        let map = SymmetryMap::new(config.map);
        let captured = BitVec::zeros(data.nsamples());

        Ok(Self {
            config,
            data,
            tree,
            queue,
            map,
            stats: Statistics::new(),
            observer,
            captured,
            gc_threshold: 1.0,
            started: std::time::Instant::now(),
        })
    }

    /// Run one iteration: select, expand, and garbage collect if the
    /// incumbent improved. Returns `false` when the queue produced nothing
    /// (the search is over).
    pub fn step(&mut self) -> bool {
        let Search {
            config,
            data,
            tree,
            queue,
            map,
            stats,
            observer,
            captured,
            gc_threshold,
            ..
        } = self;

        stats.increment(Counter::NodeSelections);
        let (node, prefix) = match queue.select(tree, data, captured, stats) {
            Some(selected) => selected,
            None => return false,
        };

        let mut not_captured = BitVec::zeros(data.nsamples());
        not_captured.and_not_from(data.rule(0).truthtable(), captured);

        evaluate_children(
            config,
            data,
            tree,
            queue,
            map,
            stats,
            observer.as_mut(),
            node,
            &prefix,
            &not_captured,
        );

        if tree.min_objective() < *gc_threshold {
            *gc_threshold = tree.min_objective();
            let before = tree.num_nodes();
            tree.garbage_collect();
            stats.increment(Counter::GarbageCollections);
            observer.garbage_collected(before, tree.num_nodes());
        }
        true
    }

    /// Drive `step` until the queue drains or the node budget is reached.
    /// Returns true iff the queue drained, i.e. the result is certified
    /// optimal.
    pub fn run(&mut self) -> bool {
        while self.tree.num_nodes() < self.config.max_num_nodes && !self.queue.is_empty() {
            self.step();
        }
        self.queue.is_empty()
    }

    /// Finish the search and report the best rule list.
    ///
    /// With `early = false` the trie is garbage collected one final time
    /// first. With `early = true` nothing is modified, so trie, queue, and
    /// map remain exactly as the last `step` left them for inspection; they
    /// are released when the `Search` is dropped.
    pub fn end(&mut self, early: bool) -> SearchReport {
        if !early {
            self.tree.garbage_collect();
        }
        self.report()
    }

    /// Snapshot the current best rule list without touching anything.
    pub fn report(&self) -> SearchReport {
        let rule_list = self.tree.opt_rulelist().to_vec();
        let accuracy =
            1.0 - self.tree.min_objective() + self.config.c * rule_list.len() as f64;
        SearchReport {
            rule_list,
            predictions: self.tree.opt_predictions().to_vec(),
            min_objective: self.tree.min_objective(),
            accuracy,
            num_nodes: self.tree.num_nodes(),
            num_evaluated: self.tree.num_evaluated(),
            certified: self.queue.is_empty(),
        }
    }

    /// The best rule list in the interchange format.
    pub fn rendered_rulelist(&self) -> String {
        render_rulelist(
            self.tree.opt_rulelist(),
            self.tree.opt_predictions(),
            &self.data,
        )
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn data(&self) -> &RuleSet {
        &self.data
    }

    pub fn tree(&self) -> &Trie {
        &self.tree
    }

    pub fn queue(&self) -> &SearchQueue {
        &self.queue
    }

    pub fn map(&self) -> &SymmetryMap {
        &self.map
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn min_objective(&self) -> f64 {
        self.tree.min_objective()
    }

    pub fn num_nodes(&self) -> usize {
        self.tree.num_nodes()
    }

    pub fn num_evaluated(&self) -> usize {
        self.tree.num_evaluated()
    }

    /// Wall-clock time since `begin`.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }
}

/// Expand `parent` by every rule not already in its prefix, applying the
/// bound battery and routing survivors through the symmetry map into the
/// trie and queue.
///
/// `not_captured` is the set of samples the parent prefix leaves to later
/// rules; all capture counts below are relative to it.
#[allow(clippy::too_many_arguments)]
fn evaluate_children(
    config: &SearchConfig,
    data: &RuleSet,
    tree: &mut Trie,
    queue: &mut SearchQueue,
    map: &mut SymmetryMap,
    stats: &mut Statistics,
    observer: &mut dyn SearchObserver,
    parent: NodeId,
    parent_prefix: &[RuleId],
    not_captured: &BitVec,
) {
    let nsamples = data.nsamples();
    let n = nsamples as f64;
    let c = config.c;
    let support_threshold = c * n;
    let support_bounds = config.ablation != Ablation::NoSupportBounds;

    let parent_lower_bound = tree.node(parent).lower_bound();
    let parent_equivalent_minority = tree.node(parent).equivalent_minority();

    let mut captured = BitVec::zeros(nsamples);
    let mut captured_zeros = BitVec::zeros(nsamples);
    let mut remaining = BitVec::zeros(nsamples);
    let mut remaining_zeros = BitVec::zeros(nsamples);
    let mut remaining_minority = BitVec::zeros(nsamples);

    for rule_index in 1..data.nrules() {
        let rule_id = rule_index as RuleId;
        if parent_prefix.contains(&rule_id) {
            continue;
        }

        // Samples newly captured by this rule.
        let num_captured = captured.and_from(not_captured, data.rule(rule_index).truthtable());
        if support_bounds && (num_captured as f64) < support_threshold {
            continue;
        }

        let c0 = captured_zeros.and_from(&captured, data.label(0).truthtable());
        let c1 = num_captured - c0;
        let (prediction, correct) = if c0 > c1 { (false, c0) } else { (true, c1) };
        if support_bounds && (correct as f64) < support_threshold {
            continue;
        }

        // The parent's bound is taken without its equivalent-points term;
        // the child re-adds its own below.
        let mut lower_bound = parent_lower_bound - parent_equivalent_minority
            + (num_captured - correct) as f64 / n
            + c;
        stats.increment(Counter::LowerBoundComputations);
        if lower_bound >= tree.min_objective() {
            continue;
        }

        let num_remaining = remaining.and_not_from(not_captured, &captured);
        let d0 = remaining_zeros.and_from(&remaining, data.label(0).truthtable());
        let d1 = num_remaining - d0;
        let (default_prediction, default_correct) = if d0 > d1 { (false, d0) } else { (true, d1) };
        let objective = lower_bound + (num_remaining - default_correct) as f64 / n;
        stats.increment(Counter::ObjectiveComputations);

        if objective < tree.min_objective() {
            tree.update_min_objective(objective);
            tree.update_opt_rulelist(parent_prefix, rule_id);
            tree.update_opt_predictions(parent, prediction, default_prediction);
            observer.incumbent_updated(objective, tree.opt_rulelist().len(), tree.num_nodes());
        }

        let mut equivalent_minority = 0.0;
        if let Some(minority) = data.minority() {
            let num_minority = remaining_minority.and_from(&remaining, minority.truthtable());
            equivalent_minority = num_minority as f64 / n;
            lower_bound += equivalent_minority;
        }

        let lookahead = if config.ablation != Ablation::NoLookaheadBound {
            lower_bound + c
        } else {
            lower_bound
        };
        if lookahead >= tree.min_objective() {
            continue;
        }

        let candidate = Candidate {
            rule_id,
            prediction,
            default_prediction,
            lower_bound,
            objective,
            num_not_captured: num_remaining,
            equivalent_minority,
            parent,
            parent_prefix,
            not_captured: &remaining,
        };
        stats.increment(Counter::MapInsertions);
        if let Some(child) = map.insert(&candidate, tree, stats) {
            tree.insert(child);
            stats.increment(Counter::TreeInsertions);
            queue.push(tree, child);
            stats.increment(Counter::QueueInsertions);
        }
    }

    tree.increment_num_evaluated();
    stats.increment(Counter::ChildrenEvaluations);

    if tree.node(parent).num_children() == 0 {
        tree.prune_up(parent);
    } else {
        tree.mark_done(parent);
    }
}
