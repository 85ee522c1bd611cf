// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Search configuration and its validation.

use serde::{Deserialize, Serialize};

use crate::queue::QueuePolicy;
use crate::symmetry::MapKind;
use crate::trie::Ablation;

/// Errors a configuration can fail with. All are reported from
/// [`Search::begin`](crate::search::Search::begin) before any search state
/// exists.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("regularization constant must satisfy 0 < c < 1, got {0}")]
    RegularizationOutOfRange(f64),

    #[error("node budget must be at least 1")]
    NodeBudgetZero,

    #[error("unknown queue policy code {0}")]
    UnknownQueuePolicy(u8),

    #[error("unknown symmetry map code {0}")]
    UnknownMapKind(u8),

    #[error("unknown ablation code {0}")]
    UnknownAblation(u8),
}

/// Parameters of one search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Complexity penalty per rule in the prefix. Must lie in (0, 1).
    pub c: f64,
    /// Stop expanding once the trie holds this many nodes.
    pub max_num_nodes: usize,
    /// Expansion-order policy for the work queue.
    pub policy: QueuePolicy,
    /// Which symmetry map deduplicates permuted prefixes.
    pub map: MapKind,
    /// Which bound family, if any, to suppress.
    pub ablation: Ablation,
    /// Enable the live-leaf depth histogram (side-band bookkeeping only).
    pub calculate_size: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            c: 0.01,
            max_num_nodes: 100_000,
            policy: QueuePolicy::Bfs,
            map: MapKind::Prefix,
            ablation: Ablation::None,
            calculate_size: false,
        }
    }
}

impl SearchConfig {
    /// Build a configuration from the conventional integer encodings used
    /// by foreign callers.
    pub fn from_codes(
        c: f64,
        max_num_nodes: usize,
        policy: u8,
        map: u8,
        ablation: u8,
        calculate_size: bool,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            c,
            max_num_nodes,
            policy: QueuePolicy::from_code(policy)
                .ok_or(ConfigError::UnknownQueuePolicy(policy))?,
            map: MapKind::from_code(map).ok_or(ConfigError::UnknownMapKind(map))?,
            ablation: Ablation::from_code(ablation)
                .ok_or(ConfigError::UnknownAblation(ablation))?,
            calculate_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the scalar parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.c > 0.0 && self.c < 1.0) {
            return Err(ConfigError::RegularizationOutOfRange(self.c));
        }
        if self.max_num_nodes == 0 {
            return Err(ConfigError::NodeBudgetZero);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(SearchConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_c() {
        for c in [0.0, -0.5, 1.0, 1.5, f64::NAN] {
            let config = SearchConfig {
                c,
                ..SearchConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::RegularizationOutOfRange(_))
            ));
        }
    }

    #[test]
    fn test_rejects_zero_budget() {
        let config = SearchConfig {
            max_num_nodes: 0,
            ..SearchConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NodeBudgetZero));
    }

    #[test]
    fn test_from_codes() {
        let config = SearchConfig::from_codes(0.01, 1000, 2, 1, 0, false).unwrap();
        assert_eq!(config.policy, QueuePolicy::LowerBound);
        assert_eq!(config.map, MapKind::Prefix);
        assert_eq!(config.ablation, Ablation::None);

        assert_eq!(
            SearchConfig::from_codes(0.01, 1000, 9, 1, 0, false),
            Err(ConfigError::UnknownQueuePolicy(9))
        );
        assert_eq!(
            SearchConfig::from_codes(0.01, 1000, 0, 7, 0, false),
            Err(ConfigError::UnknownMapKind(7))
        );
        assert_eq!(
            SearchConfig::from_codes(0.01, 1000, 0, 1, 5, false),
            Err(ConfigError::UnknownAblation(5))
        );
    }
}
