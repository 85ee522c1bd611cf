// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Text-format loaders for rules, labels, and minority rows.
//!
//! The interchange format is one rule per line:
//!
//! ```text
//! <feature-expression> <bitstring>
//! ```
//!
//! where the bitstring has one `'0'`/`'1'` character per sample, sample 0
//! first. A labels source has exactly two lines (label 0, then label 1); a
//! minority source has one.
//!
//! All filesystem access lives here: [`read_ruleset`] is the file entry
//! point, the `parse_*`/[`load_ruleset`] functions work on text a caller
//! obtained some other way, and the search core itself never touches the
//! filesystem.

use std::io;
use std::path::Path;

use crate::bitvec::BitVec;
use crate::catalog::{CatalogError, Rule, RuleSet};
use crate::stats::SearchObserver;

/// A loader failure: either the file couldn't be read or its contents
/// couldn't be parsed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Parse a block of `<feature-expression> <bitstring>` lines.
///
/// Blank lines are skipped. All truth tables must share one width; the first
/// parsed line fixes it.
pub fn parse_rules(src: &str) -> Result<Vec<Rule>, CatalogError> {
    let mut rules: Vec<Rule> = Vec::new();
    let mut width: Option<usize> = None;
    for (idx, raw) in src.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (features, bits) = trimmed
            .rsplit_once(char::is_whitespace)
            .ok_or(CatalogError::MissingBitstring { line })?;
        let truthtable = parse_bitstring(bits.trim(), line)?;
        if let Some(expected) = width {
            if truthtable.len() != expected {
                return Err(CatalogError::SampleWidthMismatch {
                    line,
                    expected,
                    got: truthtable.len(),
                });
            }
        } else {
            width = Some(truthtable.len());
        }
        rules.push(Rule::new(features.trim(), truthtable));
    }
    if rules.is_empty() {
        return Err(CatalogError::NoRules);
    }
    Ok(rules)
}

fn parse_bitstring(bits: &str, line: usize) -> Result<BitVec, CatalogError> {
    let mut v = BitVec::zeros(bits.len());
    for (i, ch) in bits.chars().enumerate() {
        match ch {
            '0' => {}
            '1' => v.set(i, true),
            _ => return Err(CatalogError::BadBitChar { line }),
        }
    }
    Ok(v)
}

/// Ensure the rule table starts with the synthetic default rule.
///
/// If the first rule already captures every sample it is kept as the
/// default; otherwise an all-ones `default` rule is prepended.
pub fn with_default_rule(mut rules: Vec<Rule>) -> Vec<Rule> {
    let needs_default = match rules.first() {
        Some(first) => first.support() != first.nsamples(),
        None => false,
    };
    if needs_default {
        let nsamples = rules[0].nsamples();
        rules.insert(0, Rule::default_rule(nsamples));
    }
    rules
}

/// Parse and assemble a full catalogue from text sources.
///
/// A minority row whose sample count disagrees with the rules is dropped
/// with a warning through `observer`, and the search proceeds without the
/// equivalent-points bound.
pub fn load_ruleset(
    rules_src: &str,
    labels_src: &str,
    minority_src: Option<&str>,
    observer: &mut dyn SearchObserver,
) -> Result<RuleSet, CatalogError> {
    let rules = with_default_rule(parse_rules(rules_src)?);
    let labels = parse_rules(labels_src)?;
    let nsamples = rules[0].nsamples();

    let minority = match minority_src {
        Some(src) => {
            let mut rows = parse_rules(src)?;
            let row = rows.remove(0);
            if row.nsamples() == nsamples {
                Some(row)
            } else {
                observer.warning(&format!(
                    "minority row covers {} samples but rules cover {}; \
                     proceeding without the equivalent-points bound",
                    row.nsamples(),
                    nsamples
                ));
                None
            }
        }
        None => None,
    };

    RuleSet::assemble(rules, labels, minority)
}

fn read_source(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Read and assemble a catalogue from files in the text interchange format.
///
/// The minority path is optional, and a minority row with a mismatched
/// sample count is dropped with a warning, as in [`load_ruleset`].
pub fn read_ruleset(
    rules_path: &Path,
    labels_path: &Path,
    minority_path: Option<&Path>,
    observer: &mut dyn SearchObserver,
) -> Result<RuleSet, LoadError> {
    let rules_src = read_source(rules_path)?;
    let labels_src = read_source(labels_path)?;
    let minority_src = match minority_path {
        Some(path) => Some(read_source(path)?),
        None => None,
    };
    load_ruleset(
        &rules_src,
        &labels_src,
        minority_src.as_deref(),
        observer,
    )
    .map_err(LoadError::from)
}
