// Shape and provenance metadata recorded by each pipeline stage.

use serde::Serialize;
use std::collections::BTreeMap;

use polars::prelude::DataFrame;

pub const STYLE_FEATURES: &str = "style_features";
pub const COMPOSITION_FEATURES: &str = "composition_features";
pub const PATTERN_FEATURES: &str = "pattern_features";
pub const COMBINED_FEATURES: &str = "combined_features";

/// Column lists of each source feeding the combined matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceColumns {
    pub style: Vec<String>,
    pub composition: Vec<String>,
    pub pattern: Vec<String>,
}

/// Metadata for one feature set.
///
/// `n_features` is the output table's column count for the individual
/// derivers and the column count minus the two key columns for the combined
/// matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSetStats {
    pub n_features: usize,
    pub n_samples: usize,
    pub feature_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_types: Option<SourceColumns>,
}

impl FeatureSetStats {
    /// Stats for a deriver output, listing the columns it derived.
    pub fn for_deriver(df: &DataFrame, derived: &[&str]) -> Self {
        Self {
            n_features: df.width(),
            n_samples: df.height(),
            feature_names: derived.iter().map(|s| s.to_string()).collect(),
            feature_types: None,
        }
    }
}

/// Accumulated metadata keyed by feature-set name. Recording the same key
/// again overwrites the previous entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureStats {
    sets: BTreeMap<String, FeatureSetStats>,
}

impl FeatureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &str, stats: FeatureSetStats) {
        self.sets.insert(key.to_string(), stats);
    }

    pub fn get(&self, key: &str) -> Option<&FeatureSetStats> {
        self.sets.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureSetStats)> {
        self.sets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
