// Roster composition features: stability, experience and age distribution
// shape, and injury load, aggregated per team-season.

use polars::prelude::*;
use tracing::{debug, warn};

use super::stats::{FeatureSetStats, FeatureStats, COMPOSITION_FEATURES};
use super::{enforce_division_policy, FeatureError, PipelineOptions};
use crate::schema::{validate_columns, INJURY_COLUMNS, PLAYER_COLUMNS, SEASON, TEAM};

/// Composition features, after the `team` and `season` keys.
pub const COMPOSITION_COLUMNS: &[&str] = &[
    "roster_size",
    "unique_players",
    "roster_stability",
    "experience_mean",
    "experience_var",
    "experience_skew",
    "age_mean",
    "age_var",
    "age_skew",
    "injury_total",
    "injury_rate",
    "depth_score",
];

/// Ratio columns subject to the division policy. The distribution and injury
/// columns have their undefined values replaced with zero instead.
const RATIO_COLUMNS: &[&str] = &["roster_stability", "depth_score"];

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

fn float(name: &str) -> Expr {
    col(name).cast(DataType::Float64).fill_nan(lit(NULL))
}

/// Mean, sample variance, and sample skewness of one column within a group.
///
/// Variance uses the n-1 denominator and needs two values; skewness is the
/// bias-adjusted Fisher-Pearson coefficient and needs three. Any statistic
/// that is undefined for the group comes back as 0.0.
fn distribution(name: &str) -> [Expr; 3] {
    let values = float(name);
    let n = values.clone().count();
    [
        values
            .clone()
            .mean()
            .fill_null(lit(0.0))
            .alias(format!("{name}_mean")),
        when(n.clone().lt(lit(2)))
            .then(lit(0.0))
            .otherwise(values.clone().var(1))
            .fill_nan(lit(0.0))
            .fill_null(lit(0.0))
            .alias(format!("{name}_var")),
        when(n.lt(lit(3)))
            .then(lit(0.0))
            .otherwise(values.skew(false))
            .fill_nan(lit(0.0))
            .fill_null(lit(0.0))
            .alias(format!("{name}_skew")),
    ]
}

/// Collect rows with usable keys, logging how many were skipped.
fn keyed_rows(rows: LazyFrame, label: &str) -> PolarsResult<DataFrame> {
    let all = rows.collect()?;
    let kept = all
        .clone()
        .lazy()
        .filter(
            col(TEAM)
                .is_not_null()
                .and(col(TEAM).neq(lit("")))
                .and(col(SEASON).is_not_null()),
        )
        .collect()?;
    let dropped = all.height() - kept.height();
    if dropped > 0 {
        warn!("{label}: skipped {dropped} row(s) with no team or season");
    }
    Ok(kept)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

fn roster_groups(players: &DataFrame) -> PolarsResult<LazyFrame> {
    let players = keyed_rows(
        players.clone().lazy().with_columns([
            col(TEAM).cast(DataType::String),
            col(SEASON).cast(DataType::Int64),
        ]),
        "player",
    )?;

    let mut aggs = vec![
        col("player").count().cast(DataType::Int64).alias("roster_size"),
        col("player")
            .drop_nulls()
            .n_unique()
            .cast(DataType::Int64)
            .alias("unique_players"),
    ];
    aggs.extend(distribution("experience"));
    aggs.extend(distribution("age"));

    Ok(players
        .lazy()
        .group_by([col(TEAM), col(SEASON)])
        .agg(aggs)
        .with_column(
            (col("roster_size").cast(DataType::Float64)
                / col("unique_players").cast(DataType::Float64))
            .alias("roster_stability"),
        ))
}

fn injury_loads(injuries: &DataFrame) -> PolarsResult<LazyFrame> {
    let injuries = keyed_rows(
        injuries.clone().lazy().select([
            col(TEAM).cast(DataType::String),
            col("year").cast(DataType::Int64).alias(SEASON),
            float("count"),
        ]),
        "injuries",
    )?;

    Ok(injuries.lazy().group_by([col(TEAM), col(SEASON)]).agg([
        col("count").sum().alias("injury_total"),
        col("count").mean().alias("injury_rate"),
    ]))
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Aggregate player rows into team-season composition features and merge in
/// injury counts.
///
/// Steps:
/// 1. Roster size, unique players, and stability per (team, season).
/// 2. Experience mean / variance / skewness.
/// 3. Age mean / variance / skewness.
/// 4. Injury total and rate (`year` read as `season`); 0 when a group has
///    no injury rows.
/// 5. `depth_score` = roster_stability / (injury_rate + 1).
///
/// Player and injury rows without a team or season are skipped. One output
/// row per (team, season) in the player table, sorted by team and then
/// season.
pub fn create_composition_features(
    player_stats: &DataFrame,
    injuries: &DataFrame,
    options: &PipelineOptions,
    stats: &mut FeatureStats,
) -> Result<DataFrame, FeatureError> {
    validate_columns(player_stats, PLAYER_COLUMNS, "player")?;
    validate_columns(injuries, INJURY_COLUMNS, "injuries")?;

    let rosters = roster_groups(player_stats)?;
    let loads = injury_loads(injuries)?;

    let mut order = vec![col(TEAM), col(SEASON)];
    order.extend(COMPOSITION_COLUMNS.iter().map(|c| col(*c)));

    let df = rosters
        .join(
            loads,
            [col(TEAM), col(SEASON)],
            [col(TEAM), col(SEASON)],
            JoinArgs::new(JoinType::Left),
        )
        .with_columns([
            col("injury_total").fill_null(lit(0.0)),
            col("injury_rate").fill_null(lit(0.0)),
        ])
        .with_column(
            (col("roster_stability") * (lit(1.0) / (col("injury_rate") + lit(1.0))))
                .alias("depth_score"),
        )
        .sort_by_exprs([col(TEAM), col(SEASON)], SortMultipleOptions::default())
        .select(order)
        .collect()?;

    enforce_division_policy(&df, RATIO_COLUMNS, COMPOSITION_FEATURES, options.division_policy)?;

    stats.record(
        COMPOSITION_FEATURES,
        FeatureSetStats::for_deriver(&df, COMPOSITION_COLUMNS),
    );
    debug!("composition features: {} rows x {} columns", df.height(), df.width());

    Ok(df)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
