// Performance-pattern features: efficiency, consistency, strategic tendency,
// and weighted composite ratings.

use polars::prelude::{lit, DataFrame, Expr};
use tracing::debug;

use super::box_score::{
    append_derived, ast, fga, fta, inside_attempts, possessions, pts, stocks, tov, x3pa,
    Derivation,
};
use super::stats::{FeatureSetStats, FeatureStats, PATTERN_FEATURES};
use super::{enforce_division_policy, lead_with_keys, FeatureError, PipelineOptions};
use crate::schema::{validate_columns, TEAM_COLUMNS};

/// Pattern features in derivation order.
pub const PATTERN_COLUMNS: &[&str] = &[
    "true_shooting",
    "off_efficiency",
    "def_efficiency",
    "scoring_consistency",
    "defensive_consistency",
    "inside_outside_balance",
    "playmaking_tendency",
    "offensive_rating",
    "defensive_rating",
    "consistency_score",
];

const DERIVATIONS: &[Derivation] = &[
    ("true_shooting", true_shooting),
    ("off_efficiency", off_efficiency),
    ("def_efficiency", def_efficiency),
    ("scoring_consistency", scoring_consistency),
    ("defensive_consistency", defensive_consistency),
    ("inside_outside_balance", || x3pa() / inside_attempts()),
    ("playmaking_tendency", || ast() / (fga() + fta())),
    ("offensive_rating", offensive_rating),
    ("defensive_rating", defensive_rating),
    ("consistency_score", || offensive_rating() * defensive_rating()),
];

pub fn true_shooting() -> Expr {
    pts() / (lit(2.0) * (fga() + lit(0.44) * fta()))
}

/// Points per estimated possession.
pub fn off_efficiency() -> Expr {
    pts() / possessions()
}

/// Steals plus blocks per turnover.
pub fn def_efficiency() -> Expr {
    stocks() / tov()
}

/// Identical to `def_efficiency`; both names are part of the output schema.
pub fn defensive_consistency() -> Expr {
    def_efficiency()
}

pub fn scoring_consistency() -> Expr {
    pts() / fga()
}

/// 0.4 * true shooting + 0.3 * offensive efficiency + 0.3 * scoring consistency.
pub fn offensive_rating() -> Expr {
    lit(0.4) * true_shooting() + lit(0.3) * off_efficiency() + lit(0.3) * scoring_consistency()
}

/// 0.4 * defensive efficiency + 0.3 * defensive consistency + 0.3 * (STL + BLK).
pub fn defensive_rating() -> Expr {
    lit(0.4) * def_efficiency() + lit(0.3) * defensive_consistency() + lit(0.3) * stocks()
}

/// Derive pattern features from the raw team table.
///
/// Column layout and row guarantees are the same as for style features.
pub fn create_pattern_features(
    team_stats: &DataFrame,
    options: &PipelineOptions,
    stats: &mut FeatureStats,
) -> Result<DataFrame, FeatureError> {
    validate_columns(team_stats, TEAM_COLUMNS, "team")?;

    let df = lead_with_keys(append_derived(team_stats, DERIVATIONS)?)?;

    enforce_division_policy(&df, PATTERN_COLUMNS, PATTERN_FEATURES, options.division_policy)?;

    stats.record(PATTERN_FEATURES, FeatureSetStats::for_deriver(&df, PATTERN_COLUMNS));
    debug!("pattern features: {} rows x {} columns", df.height(), df.width());

    Ok(df)
}
