// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Common test fixtures shared across integration tests.
//!
//! The corpora are written in the text interchange format so every fixture
//! also exercises the loader.

use rulelist_search::catalog::load::load_ruleset;
use rulelist_search::catalog::RuleSet;
use rulelist_search::search::SearchConfig;
use rulelist_search::stats::NullObserver;

/// One rule (besides the default), and it separates the classes perfectly.
///
/// 4 samples; rule 1 captures exactly the label-1 samples.
pub fn separable() -> RuleSet {
    load_ruleset(
        "default 1111\n{a=1} 1100\n",
        "{label=0} 0011\n{label=1} 1100\n",
        None,
        &mut NullObserver,
    )
    .unwrap()
}

/// Only the default rule, and every sample has label 0.
pub fn all_label_zero() -> RuleSet {
    load_ruleset(
        "default 11111111\n",
        "{label=0} 11111111\n{label=1} 00000000\n",
        None,
        &mut NullObserver,
    )
    .unwrap()
}

/// Two disjoint, individually imperfect rules over 8 samples.
///
/// Both orderings of the pair survive every bound, so expanding the second
/// ordering collides with the first in the symmetry map. Neither rule beats
/// the default-only list, so the optimum is the empty prefix.
pub fn disjoint_pair() -> RuleSet {
    load_ruleset(
        "default 11111111\n{a=1} 11000000\n{b=1} 00110000\n",
        "{label=0} 01011010\n{label=1} 10100101\n",
        None,
        &mut NullObserver,
    )
    .unwrap()
}

/// Three overlapping rules over 4 samples, for budget tests.
pub fn three_rules() -> RuleSet {
    load_ruleset(
        "default 1111\n{a=1} 1100\n{b=1} 0110\n{c=1} 0011\n",
        "{label=0} 0101\n{label=1} 1010\n",
        None,
        &mut NullObserver,
    )
    .unwrap()
}

/// A configuration with the given penalty and everything else default.
pub fn config_with_c(c: f64) -> SearchConfig {
    SearchConfig {
        c,
        ..SearchConfig::default()
    }
}
