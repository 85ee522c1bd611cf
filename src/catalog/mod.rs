// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The rule catalogue: pre-mined rules, label rows, and the optional
//! minority row.
//!
//! Everything in this module is immutable once assembled. The search reads
//! truth tables and supports by index; it never writes. Rule id 0 is always
//! the synthetic `default` rule whose truth table captures every sample:
//! loaders that don't provide one get it prepended by
//! [`load::with_default_rule`].
//!
//! Feature expressions are opaque strings to the search; they only matter
//! when rendering the final rule list.

pub mod load;

use crate::bitvec::BitVec;

/// Dense rule identifier. Id 0 is the synthetic default rule.
pub type RuleId = u16;

/// Errors raised while parsing or assembling a catalogue.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("line {line}: expected `<feature-expression> <bitstring>`")]
    MissingBitstring { line: usize },

    #[error("line {line}: truth tables may contain only '0' and '1'")]
    BadBitChar { line: usize },

    #[error("line {line}: truth table covers {got} samples, expected {expected}")]
    SampleWidthMismatch {
        line: usize,
        expected: usize,
        got: usize,
    },

    #[error("no rules were parsed")]
    NoRules,

    #[error("expected exactly 2 label rows, got {0}")]
    LabelCount(usize),

    #[error("label rows cover {got} samples, rules cover {expected}")]
    LabelWidthMismatch { expected: usize, got: usize },

    #[error("label rows are not complementary")]
    LabelsNotComplementary,

    #[error("minority row covers {got} samples, rules cover {expected}")]
    MinorityWidthMismatch { expected: usize, got: usize },

    #[error("rule 0 must be a default rule capturing every sample")]
    DefaultRuleNotTotal,
}

/// One pre-mined rule: a feature expression and its truth table over the
/// samples. Bit `s` of the truth table is set iff the rule matches sample `s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    features: String,
    cardinality: u32,
    support: usize,
    truthtable: BitVec,
}

impl Rule {
    /// Build a rule from its feature expression and truth table.
    ///
    /// The cardinality is the number of conjuncts in the expression
    /// (comma-separated, as the rule miner emits them); the support is the
    /// truth table's popcount.
    pub fn new(features: impl Into<String>, truthtable: BitVec) -> Self {
        let features = features.into();
        let cardinality = features.matches(',').count() as u32 + 1;
        let support = truthtable.count_ones();
        Self {
            features,
            cardinality,
            support,
            truthtable,
        }
    }

    /// The synthetic rule with id 0: captures every sample.
    pub fn default_rule(nsamples: usize) -> Self {
        Self::new("default", BitVec::all_ones(nsamples))
    }

    pub fn features(&self) -> &str {
        &self.features
    }

    pub fn cardinality(&self) -> u32 {
        self.cardinality
    }

    /// Popcount of the truth table.
    pub fn support(&self) -> usize {
        self.support
    }

    pub fn truthtable(&self) -> &BitVec {
        &self.truthtable
    }

    /// Width of the truth table (number of samples).
    pub fn nsamples(&self) -> usize {
        self.truthtable.len()
    }
}

/// The assembled, read-only input to a search: indexed rules, two label
/// rows, and an optional minority row, all over the same N samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
    labels: Vec<Rule>,
    minority: Option<Rule>,
    nsamples: usize,
}

impl RuleSet {
    /// Validate and assemble a catalogue.
    ///
    /// Requirements:
    /// - `rules[0]` is a default rule capturing every sample;
    /// - all truth tables share one width;
    /// - exactly two label rows, complementary over the samples;
    /// - the minority row, when present, has the same width.
    pub fn assemble(
        rules: Vec<Rule>,
        labels: Vec<Rule>,
        minority: Option<Rule>,
    ) -> Result<Self, CatalogError> {
        let first = rules.first().ok_or(CatalogError::NoRules)?;
        let nsamples = first.nsamples();
        if first.support() != nsamples {
            return Err(CatalogError::DefaultRuleNotTotal);
        }
        if labels.len() != 2 {
            return Err(CatalogError::LabelCount(labels.len()));
        }
        for label in &labels {
            if label.nsamples() != nsamples {
                return Err(CatalogError::LabelWidthMismatch {
                    expected: nsamples,
                    got: label.nsamples(),
                });
            }
        }
        let mut overlap = BitVec::zeros(nsamples);
        let both = overlap.and_from(labels[0].truthtable(), labels[1].truthtable());
        if both != 0 || labels[0].support() + labels[1].support() != nsamples {
            return Err(CatalogError::LabelsNotComplementary);
        }
        if let Some(m) = &minority {
            if m.nsamples() != nsamples {
                return Err(CatalogError::MinorityWidthMismatch {
                    expected: nsamples,
                    got: m.nsamples(),
                });
            }
        }
        Ok(Self {
            rules,
            labels,
            minority,
            nsamples,
        })
    }

    /// Number of rules, including the default rule at id 0.
    pub fn nrules(&self) -> usize {
        self.rules.len()
    }

    pub fn nsamples(&self) -> usize {
        self.nsamples
    }

    /// Rule by id. Panics on an out-of-range id; ids come from this set.
    pub fn rule(&self, idx: usize) -> &Rule {
        &self.rules[idx]
    }

    /// Label row 0 or 1.
    pub fn label(&self, idx: usize) -> &Rule {
        &self.labels[idx]
    }

    /// The minority row, when one was supplied.
    pub fn minority(&self) -> Option<&Rule> {
        self.minority.as_ref()
    }

    pub fn has_minority(&self) -> bool {
        self.minority.is_some()
    }
}

/// Render a rule list in the interchange format: semicolon-separated
/// `feature~prediction` tuples with a trailing `default~<prediction>`.
///
/// `predictions` must hold one entry per rule plus the trailing default
/// prediction.
pub fn render_rulelist(rule_ids: &[RuleId], predictions: &[bool], rules: &RuleSet) -> String {
    debug_assert_eq!(rule_ids.len() + 1, predictions.len());
    let mut out = String::new();
    for (i, &rid) in rule_ids.iter().enumerate() {
        out.push_str(rules.rule(rid as usize).features());
        out.push('~');
        out.push(if predictions[i] { '1' } else { '0' });
        out.push(';');
    }
    out.push_str("default~");
    out.push(if *predictions.last().unwrap_or(&false) {
        '1'
    } else {
        '0'
    });
    out
}
