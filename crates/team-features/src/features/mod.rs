// Feature derivation: style, composition, pattern, and the combiner.

pub mod box_score;
pub mod combine;
pub mod composition;
pub mod pattern;
pub mod stats;
pub mod style;

use polars::prelude::{DataFrame, DataType, PolarsError, PolarsResult};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::schema::{SchemaError, SEASON, TEAM};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What to do when a derived ratio divides by zero (or by a missing value).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivisionPolicy {
    /// Keep the IEEE sentinel (`inf`, `-inf`, `NaN`) and finish the run.
    #[default]
    Propagate,
    /// Fail on the first non-finite derived value.
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub division_policy: DivisionPolicy,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(
        "non-finite value {value} for `{feature}` in {feature_set} ({}, {})",
        .team.as_deref().unwrap_or("?"),
        .season.map_or_else(|| "?".to_string(), |s| s.to_string())
    )]
    NonFinite {
        feature_set: &'static str,
        feature: String,
        team: Option<String>,
        season: Option<i64>,
        value: f64,
    },

    #[error("duplicate key ({team}, {season}) in {table} features")]
    DuplicateKey {
        table: &'static str,
        team: String,
        season: i64,
    },
}

// ---------------------------------------------------------------------------
// Frame helpers
// ---------------------------------------------------------------------------

pub(crate) fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect()
}

/// Reorder so `team` and `season` come first, keeping the rest in place.
pub(crate) fn lead_with_keys(df: DataFrame) -> PolarsResult<DataFrame> {
    let mut order = vec![TEAM.to_string(), SEASON.to_string()];
    order.extend(
        column_names(&df)
            .into_iter()
            .filter(|n| n != TEAM && n != SEASON),
    );
    df.select(order)
}

/// Key of one row, read leniently: a missing or unconvertible cell is `None`.
pub(crate) fn key_at(df: &DataFrame, row: usize) -> (Option<String>, Option<i64>) {
    let team = df
        .column(TEAM)
        .ok()
        .and_then(|c| c.cast(&DataType::String).ok())
        .and_then(|c| c.str().ok().and_then(|s| s.get(row)).map(str::to_string));
    let season = df
        .column(SEASON)
        .ok()
        .and_then(|c| c.cast(&DataType::Int64).ok())
        .and_then(|c| c.i64().ok().and_then(|s| s.get(row)));
    (team, season)
}

// ---------------------------------------------------------------------------
// Division policy enforcement
// ---------------------------------------------------------------------------

/// Apply the division policy to the derived columns of a deriver's output.
///
/// Missing cells count as non-finite. Under `Propagate` each affected column
/// is reported with a warning; under `Strict` the first such cell is
/// returned as an error.
pub(crate) fn enforce_division_policy(
    df: &DataFrame,
    derived: &[&str],
    feature_set: &'static str,
    policy: DivisionPolicy,
) -> Result<(), FeatureError> {
    for feature in derived {
        let column = df.column(feature)?.cast(&DataType::Float64)?;
        let values = column.f64()?;
        let bad: Vec<(usize, f64)> = values
            .into_iter()
            .enumerate()
            .filter_map(|(row, v)| match v {
                Some(x) if x.is_finite() => None,
                other => Some((row, other.unwrap_or(f64::NAN))),
            })
            .collect();
        let Some(&(row, value)) = bad.first() else {
            continue;
        };
        match policy {
            DivisionPolicy::Propagate => {
                warn!(
                    "{feature_set}: `{feature}` has {} non-finite value(s) out of {}",
                    bad.len(),
                    values.len()
                );
            }
            DivisionPolicy::Strict => {
                let (team, season) = key_at(df, row);
                return Err(FeatureError::NonFinite {
                    feature_set,
                    feature: feature.to_string(),
                    team,
                    season,
                    value,
                });
            }
        }
    }
    Ok(())
}
