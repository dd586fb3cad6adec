// Required-column contracts for each input table type.

use polars::prelude::DataFrame;
use thiserror::Error;

/// Raw team box-score table (one row per team-season).
pub const TEAM_COLUMNS: &[&str] = &[
    "season",
    "team",
    "pts_per_game",
    "fg_per_game",
    "fga_per_game",
    "ft_per_game",
    "fta_per_game",
    "x3p_per_game",
    "x3pa_per_game",
    "orb_per_game",
    "drb_per_game",
    "ast_per_game",
    "stl_per_game",
    "blk_per_game",
    "tov_per_game",
];

/// Player-season roster table.
pub const PLAYER_COLUMNS: &[&str] = &["season", "team", "experience", "age", "player"];

/// Injury counts per team and year.
pub const INJURY_COLUMNS: &[&str] = &["year", "team", "count"];

/// Join key shared by every derived table.
pub const TEAM: &str = "team";
pub const SEASON: &str = "season";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required columns in {label} data: {missing:?}")]
pub struct SchemaError {
    pub label: String,
    pub missing: Vec<String>,
}

/// Whether `df` has a column called `name` (case-sensitive).
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|n| n.as_str() == name)
}

/// Check that `df` has every column in `required`.
///
/// The error lists the missing names in the order they appear in `required`.
pub fn validate_columns(df: &DataFrame, required: &[&str], label: &str) -> Result<(), SchemaError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !has_column(df, col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError {
            label: label.to_string(),
            missing,
        })
    }
}
