// Per-game box-score expressions over the raw team table.
//
// Raw columns are read as Float64 so integer inputs divide like floats and a
// zero denominator yields the IEEE sentinel instead of an error.

use polars::prelude::*;

/// A named derived feature built from the per-game columns.
pub(crate) type Derivation = (&'static str, fn() -> Expr);

fn stat(name: &str) -> Expr {
    col(name).cast(DataType::Float64)
}

pub fn pts() -> Expr {
    stat("pts_per_game")
}

pub fn fg() -> Expr {
    stat("fg_per_game")
}

pub fn fga() -> Expr {
    stat("fga_per_game")
}

pub fn fta() -> Expr {
    stat("fta_per_game")
}

pub fn x3pa() -> Expr {
    stat("x3pa_per_game")
}

pub fn orb() -> Expr {
    stat("orb_per_game")
}

pub fn ast() -> Expr {
    stat("ast_per_game")
}

pub fn stl() -> Expr {
    stat("stl_per_game")
}

pub fn blk() -> Expr {
    stat("blk_per_game")
}

pub fn tov() -> Expr {
    stat("tov_per_game")
}

/// Estimated possessions: FGA + 0.44*FTA - ORB + TOV.
pub fn possessions() -> Expr {
    fga() + lit(0.44) * fta() - orb() + tov()
}

/// Two-point attempts (FGA - 3PA).
pub fn inside_attempts() -> Expr {
    fga() - x3pa()
}

/// Steals plus blocks.
pub fn stocks() -> Expr {
    stl() + blk()
}

/// Append one float column per derivation, in order. The input is not touched.
pub(crate) fn append_derived(
    team_stats: &DataFrame,
    derivations: &[Derivation],
) -> PolarsResult<DataFrame> {
    let exprs: Vec<Expr> = derivations
        .iter()
        .map(|(name, derive)| derive().alias(*name))
        .collect();
    team_stats.clone().lazy().with_columns(exprs).collect()
}
