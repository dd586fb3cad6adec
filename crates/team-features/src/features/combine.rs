// Combine the derived feature tables into one team-season matrix.

use polars::prelude::*;
use tracing::debug;

use super::stats::{FeatureSetStats, FeatureStats, SourceColumns, COMBINED_FEATURES};
use super::{column_names, key_at, FeatureError};
use crate::schema::{validate_columns, SEASON, TEAM};

const KEY_COLUMNS: &[&str] = &[TEAM, SEASON];
const ROW_INDEX: &str = "_row_index";
const MATCHED: &str = "_matched";

/// Left-join style, composition, and pattern features on (team, season) and
/// mean-impute the gaps.
///
/// The style table anchors the result: every style row survives, in order,
/// and no other row is added. Right-hand columns whose name is already in the
/// result are not added twice. After both joins, missing cells in numeric
/// columns take the column's mean over its present cells.
pub fn combine_features(
    style: &DataFrame,
    composition: &DataFrame,
    pattern: &DataFrame,
    stats: &mut FeatureStats,
) -> Result<DataFrame, FeatureError> {
    let style = normalize_keys(style, "style")?;
    let composition = normalize_keys(composition, "composition")?;
    let pattern = normalize_keys(pattern, "pattern")?;

    let merged = left_join(style.clone(), &composition, "composition")?;
    let merged = left_join(merged, &pattern, "pattern")?;
    let features = impute_column_means(merged)?;

    stats.record(
        COMBINED_FEATURES,
        FeatureSetStats {
            n_features: features.width() - KEY_COLUMNS.len(),
            n_samples: features.height(),
            feature_names: column_names(&features),
            feature_types: Some(SourceColumns {
                style: column_names(&style),
                composition: column_names(&composition),
                pattern: column_names(&pattern),
            }),
        },
    );
    debug!(
        "combined features: {} rows x {} columns",
        features.height(),
        features.width()
    );

    Ok(features)
}

/// Copy of `df` with `team` as text and `season` as integers.
fn normalize_keys(df: &DataFrame, source: &str) -> Result<DataFrame, FeatureError> {
    validate_columns(df, KEY_COLUMNS, source)?;
    Ok(df
        .clone()
        .lazy()
        .with_columns([
            col(TEAM).cast(DataType::String),
            col(SEASON).cast(DataType::Int64),
        ])
        .collect()?)
}

/// A right-hand table may hold each key once; otherwise the join would
/// multiply anchor rows.
fn reject_duplicate_keys(df: &DataFrame, source: &'static str) -> Result<(), FeatureError> {
    let duplicates = df
        .clone()
        .lazy()
        .filter(col(TEAM).is_not_null().and(col(SEASON).is_not_null()))
        .group_by([col(TEAM), col(SEASON)])
        .agg([len().alias("rows")])
        .filter(col("rows").gt(lit(1)))
        .sort_by_exprs([col(TEAM), col(SEASON)], SortMultipleOptions::default())
        .collect()?;
    if duplicates.height() == 0 {
        return Ok(());
    }
    let (team, season) = key_at(&duplicates, 0);
    Err(FeatureError::DuplicateKey {
        table: source,
        team: team.unwrap_or_default(),
        season: season.unwrap_or_default(),
    })
}

fn left_join(
    left: DataFrame,
    right: &DataFrame,
    source: &'static str,
) -> Result<DataFrame, FeatureError> {
    reject_duplicate_keys(right, source)?;

    let existing = column_names(&left);
    let added: Vec<String> = column_names(right)
        .into_iter()
        .filter(|name| !existing.contains(name))
        .collect();

    let mut picked = vec![col(TEAM), col(SEASON), lit(true).alias(MATCHED)];
    picked.extend(added.iter().map(|name| col(name.as_str())));
    let mut order: Vec<Expr> = existing.iter().map(|name| col(name.as_str())).collect();
    order.extend(added.iter().map(|name| col(name.as_str())));

    let joined = left
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .join(
            right.clone().lazy().select(picked),
            [col(TEAM), col(SEASON)],
            [col(TEAM), col(SEASON)],
            JoinArgs::new(JoinType::Left),
        )
        .sort_by_exprs([col(ROW_INDEX)], SortMultipleOptions::default())
        .collect()?;

    let unmatched = joined.column(MATCHED)?.null_count();
    if unmatched > 0 {
        debug!("{unmatched} of {} rows have no {source} match", joined.height());
    }

    Ok(joined.lazy().select(order).collect()?)
}

/// Fill missing cells (null or NaN) in every numeric column with that
/// column's mean. Integer columns with gaps are widened to float. Columns
/// with no present cell come out as NaN.
fn impute_column_means(df: DataFrame) -> PolarsResult<DataFrame> {
    let mut fills = Vec::new();
    for column in df.get_columns() {
        let name = column.name().as_str();
        if KEY_COLUMNS.contains(&name) {
            continue;
        }
        let dtype = column.dtype();
        let gaps = if dtype.is_float() {
            let values = column.cast(&DataType::Float64)?;
            values.null_count()
                + values
                    .f64()?
                    .into_iter()
                    .filter(|v| v.is_some_and(f64::is_nan))
                    .count()
        } else if dtype.is_integer() {
            column.null_count()
        } else {
            0
        };
        if gaps == 0 {
            continue;
        }

        debug!("imputing {gaps} value(s) in `{name}` with the column mean");
        let values = col(name).cast(DataType::Float64).fill_nan(lit(NULL));
        fills.push(
            values
                .clone()
                .fill_null(values.mean())
                .fill_null(lit(f64::NAN))
                .alias(name),
        );
    }
    if fills.is_empty() {
        return Ok(df);
    }
    df.lazy().with_columns(fills).collect()
}
