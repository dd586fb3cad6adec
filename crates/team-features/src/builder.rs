// Pipeline orchestrator: owns the options and the feature metadata, and runs
// the derivers and the combiner in order.

use polars::prelude::DataFrame;
use tracing::info;

use crate::features::combine::combine_features;
use crate::features::composition::create_composition_features;
use crate::features::pattern::create_pattern_features;
use crate::features::stats::FeatureStats;
use crate::features::style::create_style_features;
use crate::features::{FeatureError, PipelineOptions};

/// Runs the feature pipeline and keeps the metadata each stage records.
///
/// One builder is meant to be used serially; every call overwrites the
/// metadata entry for its own feature set.
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    options: PipelineOptions,
    stats: FeatureStats,
}

impl FeatureBuilder {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            stats: FeatureStats::new(),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn feature_stats(&self) -> &FeatureStats {
        &self.stats
    }

    pub fn into_feature_stats(self) -> FeatureStats {
        self.stats
    }

    pub fn create_style_features(&mut self, team_stats: &DataFrame) -> Result<DataFrame, FeatureError> {
        create_style_features(team_stats, &self.options, &mut self.stats)
    }

    pub fn create_composition_features(
        &mut self,
        player_stats: &DataFrame,
        injuries: &DataFrame,
    ) -> Result<DataFrame, FeatureError> {
        create_composition_features(player_stats, injuries, &self.options, &mut self.stats)
    }

    pub fn create_pattern_features(&mut self, team_stats: &DataFrame) -> Result<DataFrame, FeatureError> {
        create_pattern_features(team_stats, &self.options, &mut self.stats)
    }

    pub fn combine_features(
        &mut self,
        style: &DataFrame,
        composition: &DataFrame,
        pattern: &DataFrame,
    ) -> Result<DataFrame, FeatureError> {
        combine_features(style, composition, pattern, &mut self.stats)
    }

    /// Run the full pipeline: style and pattern from the team table,
    /// composition from players and injuries, then combine.
    pub fn build(
        &mut self,
        team_stats: &DataFrame,
        player_stats: &DataFrame,
        injuries: &DataFrame,
    ) -> Result<DataFrame, FeatureError> {
        let style = self.create_style_features(team_stats)?;
        let composition = self.create_composition_features(player_stats, injuries)?;
        let pattern = self.create_pattern_features(team_stats)?;
        let features = self.combine_features(&style, &composition, &pattern)?;

        info!(
            "Built feature matrix: {} team-seasons x {} features",
            features.height(),
            features.width().saturating_sub(2)
        );
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::stats::{
        COMBINED_FEATURES, COMPOSITION_FEATURES, PATTERN_FEATURES, STYLE_FEATURES,
    };
    use crate::features::DivisionPolicy;
    use crate::schema::TEAM_COLUMNS;
    use polars::prelude::*;

    fn team_stats() -> DataFrame {
        let mut columns: Vec<Column> = vec![
            Series::new("season".into(), &[2020i64, 2020]).into(),
            Series::new("team".into(), &["TeamA", "TeamB"]).into(),
        ];
        for name in &TEAM_COLUMNS[2..] {
            let values: &[f64] = if *name == "fga_per_game" {
                &[88.0, 90.0]
            } else {
                &[10.0, 12.0]
            };
            columns.push(Series::new((*name).into(), values).into());
        }
        DataFrame::new(columns).unwrap()
    }

    fn player_stats() -> DataFrame {
        df!(
            "season" => [2020i64, 2020, 2020],
            "team" => ["TeamA", "TeamA", "TeamA"],
            "experience" => [1i64, 4, 7],
            "age" => [22i64, 26, 30],
            "player" => ["p1", "p2", "p3"],
        )
        .unwrap()
    }

    fn injuries() -> DataFrame {
        df!("year" => [2020i64], "team" => ["TeamA"], "count" => [1i64]).unwrap()
    }

    #[test]
    fn build_records_every_feature_set() {
        let mut builder = FeatureBuilder::default();
        let out = builder
            .build(&team_stats(), &player_stats(), &injuries())
            .unwrap();

        assert_eq!(out.height(), 2);
        let stats = builder.feature_stats();
        for key in [
            STYLE_FEATURES,
            COMPOSITION_FEATURES,
            PATTERN_FEATURES,
            COMBINED_FEATURES,
        ] {
            assert!(stats.get(key).is_some(), "missing stats for {key}");
        }
        assert_eq!(
            stats.get(COMBINED_FEATURES).unwrap().n_features,
            out.width() - 2
        );
    }

    #[test]
    fn build_matches_individual_stages() {
        let (team, players, injuries) = (team_stats(), player_stats(), injuries());

        let mut staged = FeatureBuilder::default();
        let style = staged.create_style_features(&team).unwrap();
        let composition = staged.create_composition_features(&players, &injuries).unwrap();
        let pattern = staged.create_pattern_features(&team).unwrap();
        let combined = staged.combine_features(&style, &composition, &pattern).unwrap();

        let mut whole = FeatureBuilder::default();
        let built = whole.build(&team, &players, &injuries).unwrap();
        assert!(built.equals_missing(&combined));
        assert_eq!(whole.into_feature_stats(), staged.into_feature_stats());
    }

    #[test]
    fn rerunning_a_stage_overwrites_its_stats() {
        let mut builder = FeatureBuilder::default();
        builder.create_style_features(&team_stats()).unwrap();

        let one_row = team_stats().head(Some(1));
        builder.create_style_features(&one_row).unwrap();

        let stats = builder.feature_stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.get(STYLE_FEATURES).unwrap().n_samples, 1);
    }

    #[test]
    fn options_are_kept() {
        let builder = FeatureBuilder::new(PipelineOptions {
            division_policy: DivisionPolicy::Strict,
        });
        assert_eq!(builder.options().division_policy, DivisionPolicy::Strict);
        assert!(builder.feature_stats().is_empty());
    }
}
