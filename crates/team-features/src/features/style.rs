// Playing-style features: offensive tempo, defensive activity, ball movement,
// and shot selection, derived per team-season from per-game box scores.

use polars::prelude::DataFrame;
use tracing::debug;

use super::box_score::{
    append_derived, ast, blk, fg, fga, fta, inside_attempts, possessions, stl, stocks, tov,
    x3pa, Derivation,
};
use super::stats::{FeatureSetStats, FeatureStats, STYLE_FEATURES};
use super::{enforce_division_policy, lead_with_keys, FeatureError, PipelineOptions};
use crate::schema::{validate_columns, TEAM_COLUMNS};

/// Style features in derivation order.
pub const STYLE_COLUMNS: &[&str] = &[
    "pace_factor",
    "three_point_rate",
    "assist_rate",
    "defensive_pressure",
    "paint_protection",
    "transition_rate",
    "ball_control",
    "passing_efficiency",
    "inside_focus",
    "free_throw_rate",
];

const DERIVATIONS: &[Derivation] = &[
    // Offense
    ("pace_factor", possessions),
    ("three_point_rate", || x3pa() / fga()),
    ("assist_rate", || ast() / fg()),
    // Defense
    ("defensive_pressure", stocks),
    ("paint_protection", || blk() / inside_attempts()),
    ("transition_rate", || stl() / tov()),
    // Ball movement
    ("ball_control", || ast() / tov()),
    ("passing_efficiency", || ast() / fga()),
    // Shot selection
    ("inside_focus", || inside_attempts() / fga()),
    ("free_throw_rate", || fta() / fga()),
];

/// Derive style features from the raw team table.
///
/// Every input column is kept; `team` and `season` lead, derived columns are
/// appended in `STYLE_COLUMNS` order. Row count and keys are unchanged.
pub fn create_style_features(
    team_stats: &DataFrame,
    options: &PipelineOptions,
    stats: &mut FeatureStats,
) -> Result<DataFrame, FeatureError> {
    validate_columns(team_stats, TEAM_COLUMNS, "team")?;

    let df = lead_with_keys(append_derived(team_stats, DERIVATIONS)?)?;

    enforce_division_policy(&df, STYLE_COLUMNS, STYLE_FEATURES, options.division_policy)?;

    stats.record(STYLE_FEATURES, FeatureSetStats::for_deriver(&df, STYLE_COLUMNS));
    debug!("style features: {} rows x {} columns", df.height(), df.width());

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::box_score::testing::{floats, keys, team_frame, Line};
    use polars::prelude::NamedFrom;
    use crate::features::{column_names, DivisionPolicy};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn line() -> Line {
        Line {
            pts: 110.0,
            fg: 40.0,
            fga: 100.0,
            ft: 16.0,
            fta: 20.0,
            x3p: 12.0,
            x3pa: 30.0,
            orb: 10.0,
            drb: 34.0,
            ast: 25.0,
            stl: 8.0,
            blk: 5.0,
            tov: 10.0,
        }
    }

    fn value(df: &DataFrame, col: &str, row: usize) -> f64 {
        floats(df, col)[row]
    }

    #[test]
    fn ratios_match_hand_computation() {
        let mut stats = FeatureStats::new();
        let t = team_frame(&[("BOS", 2020, line())]);
        let out = create_style_features(&t, &PipelineOptions::default(), &mut stats).unwrap();

        assert!(approx_eq(value(&out, "three_point_rate", 0), 0.30, 1e-12));
        assert!(approx_eq(value(&out, "ball_control", 0), 2.5, 1e-12));
        // 100 + 8.8 - 10 + 10
        assert!(approx_eq(value(&out, "pace_factor", 0), 108.8, 1e-9));
        assert!(approx_eq(value(&out, "assist_rate", 0), 0.625, 1e-12));
        assert!(approx_eq(value(&out, "defensive_pressure", 0), 13.0, 1e-12));
        assert!(approx_eq(value(&out, "paint_protection", 0), 5.0 / 70.0, 1e-12));
        assert!(approx_eq(value(&out, "transition_rate", 0), 0.8, 1e-12));
        assert!(approx_eq(value(&out, "passing_efficiency", 0), 0.25, 1e-12));
        assert!(approx_eq(value(&out, "inside_focus", 0), 0.70, 1e-12));
        assert!(approx_eq(value(&out, "free_throw_rate", 0), 0.20, 1e-12));
    }

    #[test]
    fn keys_lead_and_derived_columns_follow_inputs() {
        let mut stats = FeatureStats::new();
        let t = team_frame(&[("BOS", 2020, line())]);
        let out = create_style_features(&t, &PipelineOptions::default(), &mut stats).unwrap();

        let names = column_names(&out);
        assert_eq!(&names[..3], &["team", "season", "pts_per_game"]);
        assert_eq!(&names[names.len() - STYLE_COLUMNS.len()..], STYLE_COLUMNS);
    }

    #[test]
    fn preserves_rows_and_keys() {
        let mut stats = FeatureStats::new();
        let t = team_frame(&[
            ("BOS", 2020, line()),
            ("LAL", 2020, line()),
            ("BOS", 2021, line()),
        ]);
        let out = create_style_features(&t, &PipelineOptions::default(), &mut stats).unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(keys(&out), keys(&t));
        assert_eq!(t.width(), TEAM_COLUMNS.len(), "input must not be mutated");
    }

    #[test]
    fn zero_turnovers_propagate_sentinel() {
        let mut stats = FeatureStats::new();
        let t = team_frame(&[("BOS", 2020, Line { tov: 0.0, ..line() })]);
        let out = create_style_features(&t, &PipelineOptions::default(), &mut stats).unwrap();
        let ball_control = value(&out, "ball_control", 0);
        assert!(!ball_control.is_finite());
        assert!(ball_control.is_infinite());
    }

    #[test]
    fn strict_policy_rejects_zero_turnovers() {
        let mut stats = FeatureStats::new();
        let t = team_frame(&[
            ("BOS", 2020, line()),
            ("LAL", 2021, Line { tov: 0.0, ..line() }),
        ]);
        let options = PipelineOptions {
            division_policy: DivisionPolicy::Strict,
        };
        match create_style_features(&t, &options, &mut stats) {
            Err(FeatureError::NonFinite {
                feature_set,
                feature,
                team,
                season,
                ..
            }) => {
                assert_eq!(feature_set, STYLE_FEATURES);
                assert_eq!(feature, "transition_rate");
                assert_eq!(team.as_deref(), Some("LAL"));
                assert_eq!(season, Some(2021));
            }
            other => panic!("expected NonFinite, got {other:?}"),
        }
        assert!(stats.get(STYLE_FEATURES).is_none());
    }

    #[test]
    fn strict_policy_reports_ratio_when_team_cell_is_missing() {
        let mut stats = FeatureStats::new();
        let t = team_frame(&[("LAL", 2021, Line { tov: 0.0, ..line() })]);
        let mut t = t.drop("team").unwrap();
        t.with_column(polars::prelude::Series::new("team".into(), [None::<&str>]))
            .unwrap();
        let options = PipelineOptions {
            division_policy: DivisionPolicy::Strict,
        };
        match create_style_features(&t, &options, &mut stats) {
            Err(FeatureError::NonFinite { team, season, .. }) => {
                assert_eq!(team, None);
                assert_eq!(season, Some(2021));
            }
            other => panic!("expected NonFinite, got {other:?}"),
        }
    }

    #[test]
    fn missing_columns_are_all_reported() {
        let mut stats = FeatureStats::new();
        let t = team_frame(&[("BOS", 2020, line())])
            .drop("tov_per_game")
            .unwrap()
            .drop("fga_per_game")
            .unwrap();
        match create_style_features(&t, &PipelineOptions::default(), &mut stats) {
            Err(FeatureError::Schema(e)) => {
                assert_eq!(e.label, "team");
                assert_eq!(e.missing, vec!["fga_per_game", "tov_per_game"]);
            }
            other => panic!("expected SchemaError, got {other:?}"),
        }
    }

    #[test]
    fn records_shape_metadata() {
        let mut stats = FeatureStats::new();
        let t = team_frame(&[("BOS", 2020, line()), ("LAL", 2020, line())]);
        create_style_features(&t, &PipelineOptions::default(), &mut stats).unwrap();
        let entry = stats.get(STYLE_FEATURES).unwrap();
        assert_eq!(entry.n_samples, 2);
        assert_eq!(entry.n_features, TEAM_COLUMNS.len() + STYLE_COLUMNS.len());
        assert_eq!(entry.feature_names, STYLE_COLUMNS);
    }
}
