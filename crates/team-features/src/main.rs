// Team feature pipeline entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load raw team, player, and injury tables
// 4. Clean raw tables (percentages, numeric gaps, team and player names)
// 5. Build the feature matrix
// 6. Save features and metadata

use std::path::Path;

use team_features::builder::FeatureBuilder;
use team_features::cleaning;
use team_features::config;
use team_features::io;
use team_features::schema::TEAM;

use anyhow::Context;
use polars::prelude::DataFrame;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Team feature pipeline starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: division_policy={:?}, output={}",
        config.pipeline.division_policy, config.output.name
    );

    // 3. Load raw tables
    let paths = &config.data_paths;
    let mut team_stats = load("team stats", &paths.team_stats)?;
    let mut player_stats = load("player stats", &paths.player_stats)?;
    let mut injuries = load("injuries", &paths.injuries)?;

    // 4. Cleaning
    let pipeline = &config.pipeline;
    if pipeline.convert_percentages {
        team_stats = cleaning::convert_percentages(&team_stats)
            .context("failed to convert team stat percentages")?;
        player_stats = cleaning::convert_percentages(&player_stats)
            .context("failed to convert player stat percentages")?;
    }
    if pipeline.fill_numeric_gaps {
        team_stats = cleaning::fill_numeric_gaps(&team_stats)
            .context("failed to fill team stat gaps")?;
        player_stats = cleaning::fill_numeric_gaps(&player_stats)
            .context("failed to fill player stat gaps")?;
        injuries = cleaning::fill_numeric_gaps(&injuries)
            .context("failed to fill injury gaps")?;
        info!("Filled numeric gaps with column medians");
    }
    if pipeline.standardize_team_names {
        team_stats = cleaning::standardize_team_codes(&team_stats, &[TEAM])
            .context("failed to standardize team stats")?;
        player_stats = cleaning::standardize_team_codes(&player_stats, &[TEAM])
            .context("failed to standardize player stats")?;
        injuries = cleaning::standardize_team_codes(&injuries, &[TEAM])
            .context("failed to standardize injuries")?;
        info!("Standardized team codes");
    }
    if pipeline.standardize_player_names {
        player_stats = cleaning::standardize_player_names(&player_stats, "player")
            .context("failed to standardize player names")?;
    }
    if pipeline.add_conference {
        team_stats = cleaning::add_conference(&team_stats, TEAM)
            .context("failed to add conference column")?;
    }

    // 5. Build features
    let mut builder = FeatureBuilder::new(config.pipeline_options());
    let features = builder
        .build(&team_stats, &player_stats, &injuries)
        .context("failed to build features")?;

    for (name, set) in builder.feature_stats().iter() {
        info!(
            "{name}: {} samples, {} features",
            set.n_samples, set.n_features
        );
    }

    // 6. Save
    let output_dir = Path::new(&paths.output_dir);
    let (path, rows) = io::save_table(&features, output_dir, &config.output.name)
        .context("failed to save features")?;
    println!("Wrote {rows} team-seasons to {}", path.display());

    if config.output.write_stats {
        let stats_path = io::save_stats(builder.feature_stats(), output_dir, &config.output.name)
            .context("failed to save feature metadata")?;
        info!("Saved feature metadata to {}", stats_path.display());
    }

    info!("Team feature pipeline finished");
    Ok(())
}

fn load(label: &str, path: &str) -> anyhow::Result<DataFrame> {
    let df = io::load_table(Path::new(path)).with_context(|| format!("failed to load {label}"))?;
    info!(
        "Loaded {label}: {} rows x {} columns from {path}",
        df.height(),
        df.width()
    );
    Ok(df)
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("team-features.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("team_features=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
