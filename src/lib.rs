// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Certifiably optimal prefix rule lists for binary classification.
//!
//! Given a catalogue of pre-mined boolean rules (each with a truth table
//! over the N samples) and binary labels, the search finds an ordered
//! prefix of rules minimising the regularised misclassification objective
//!
//! ```text
//! obj(d) = err(d) + c · |d|
//! ```
//!
//! where `|d|` is the number of rules in the prefix (the trailing default
//! rule is free) and `c` is a caller-supplied complexity penalty. When the
//! work queue drains, the result is provably optimal: every rule list that
//! could have improved on it was eliminated by a bound.
//!
//! # Architecture
//!
//! The search is branch and bound over the rule-permutation space, built
//! from three tightly interacting structures plus a bit-vector kernel:
//!
//! - [`trie`]: the explored prefixes, their cached bounds, and the
//!   incumbent (best rule list so far);
//! - [`queue`]: a priority queue of unexpanded trie leaves with a pluggable
//!   ordering policy and lazy-deletion discipline;
//! - [`symmetry`]: a memo map that recognises permutations of already-seen
//!   prefixes and keeps only the one with the best lower bound;
//! - [`bitvec`]: fixed-width sample masks whose bulk operators return
//!   popcounts in the same pass.
//!
//! The [`search`] driver ties them together in a `begin` / `step` / `end`
//! lifecycle; [`catalog`] holds the immutable rule and label inputs. The
//! whole search is single threaded by design: a symmetry-map hit may
//! demolish a trie subtree the queue still points into, which stays sound
//! only because nothing else can run in between.
//!
//! # Example
//!
//! ```
//! use rulelist_search::catalog::load::load_ruleset;
//! use rulelist_search::search::{Search, SearchConfig};
//! use rulelist_search::stats::NullObserver;
//!
//! let data = load_ruleset(
//!     "{a=1} 1100\n{b=1} 0011\n",
//!     "{label=0} 0011\n{label=1} 1100\n",
//!     None,
//!     &mut NullObserver,
//! )
//! .unwrap();
//!
//! let mut search = Search::begin(data, SearchConfig::default()).unwrap();
//! let certified = search.run();
//! let report = search.end(false);
//!
//! assert!(certified);
//! assert_eq!(report.rule_list, vec![1]);
//! ```

pub mod bitvec;
pub mod catalog;
pub mod queue;
pub mod search;
pub mod stats;
pub mod symmetry;
pub mod trie;

// Re-export commonly used types
pub use bitvec::BitVec;
pub use catalog::{Rule, RuleId, RuleSet};
pub use queue::{QueuePolicy, SearchQueue};
pub use search::{ConfigError, Search, SearchConfig, SearchReport};
pub use stats::{Counter, NullObserver, SearchObserver, Statistics, StderrObserver};
pub use symmetry::{MapKind, SymmetryMap};
pub use trie::{Ablation, NodeId, Trie};
