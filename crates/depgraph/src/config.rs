//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document (or none at all) is a
//! valid configuration.

use crate::error::{GraphError, Result};
use crate::graph::Criticality;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for the query engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Depth used by dependency closure when the caller gives none
    pub default_depth: usize,
    /// Result size used by bottleneck ranking when the caller gives none
    pub default_bottleneck_limit: usize,
    /// Relationship type treated as a dependency edge
    pub dependency_type: String,
    /// Minimum criticality an incoming edge needs to count towards a bottleneck
    pub bottleneck_threshold: Criticality,
    /// Shortest cycle reported by cycle detection
    pub min_cycle_length: usize,
    /// Longest cycle reported by cycle detection (DFS depth bound)
    pub max_cycle_length: usize,
    /// Maximum number of cycles returned
    pub max_cycles: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_depth: 5,
            default_bottleneck_limit: 10,
            dependency_type: "DEPENDS_ON".to_string(),
            bottleneck_threshold: Criticality::High,
            min_cycle_length: 2,
            max_cycle_length: 10,
            max_cycles: 100,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Serialization`] for malformed JSON and
    /// [`GraphError::InvalidArgument`] when [`validate`](Self::validate) fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GraphError::serialization("Failed to parse engine config", Some(e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GraphError::storage(
                format!("Failed to read engine config {:?}", path.as_ref()),
                Some(e),
            )
        })?;
        Self::from_json_str(&raw)
    }

    /// Set the default dependency depth.
    pub fn with_default_depth(mut self, depth: usize) -> Self {
        self.default_depth = depth;
        self
    }

    /// Set the default bottleneck limit.
    pub fn with_default_bottleneck_limit(mut self, limit: usize) -> Self {
        self.default_bottleneck_limit = limit;
        self
    }

    /// Set the relationship type followed by dependency queries.
    pub fn with_dependency_type(mut self, relationship_type: impl Into<String>) -> Self {
        self.dependency_type = relationship_type.into();
        self
    }

    /// Set the minimum criticality counted by bottleneck ranking.
    pub fn with_bottleneck_threshold(mut self, threshold: Criticality) -> Self {
        self.bottleneck_threshold = threshold;
        self
    }

    /// Set the cycle length bounds.
    pub fn with_cycle_lengths(mut self, min: usize, max: usize) -> Self {
        self.min_cycle_length = min;
        self.max_cycle_length = max;
        self
    }

    /// Set the cycle output cap.
    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Reject configurations no query could run with.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidArgument`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.default_depth == 0 {
            return Err(GraphError::invalid_argument("default_depth must be positive"));
        }
        if self.default_bottleneck_limit == 0 {
            return Err(GraphError::invalid_argument(
                "default_bottleneck_limit must be positive",
            ));
        }
        if self.dependency_type.trim().is_empty() {
            return Err(GraphError::invalid_argument("dependency_type must not be empty"));
        }
        if self.min_cycle_length == 0 || self.min_cycle_length > self.max_cycle_length {
            return Err(GraphError::invalid_argument(format!(
                "cycle lengths must satisfy 1 <= min <= max, got {}..{}",
                self.min_cycle_length, self.max_cycle_length
            )));
        }
        Ok(())
    }
}
