// Configuration loading and parsing (config/pipeline.toml).

use serde::Deserialize;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::features::{DivisionPolicy, PipelineOptions};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub data_paths: DataPaths,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// `"propagate"` keeps inf/NaN from zero denominators, `"strict"` fails.
    #[serde(default)]
    pub division_policy: DivisionPolicy,
    /// Fold historical team names into current franchise codes before
    /// deriving features.
    #[serde(default = "default_true")]
    pub standardize_team_names: bool,
    /// Tag each team-season with its conference.
    #[serde(default)]
    pub add_conference: bool,
    /// Trim and uppercase the `player` column so repeat rows of one player
    /// count once.
    #[serde(default = "default_true")]
    pub standardize_player_names: bool,
    /// Turn `"45.5%"` strings in `*pct*` / `*percentage*` columns into
    /// fractions.
    #[serde(default = "default_true")]
    pub convert_percentages: bool,
    /// Coerce measurement columns to numbers and fill gaps with the median.
    #[serde(default)]
    pub fill_numeric_gaps: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub team_stats: String,
    pub player_stats: String,
    pub injuries: String,
    pub output_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub write_stats: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            division_policy: self.pipeline.division_policy,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/pipeline.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("pipeline.toml");
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Seed `config/` from `defaults/`, copying each template that has no
/// counterpart yet. Returns the copied paths. `.example` templates are not
/// copied.
///
/// With no `defaults/` directory this is a no-op, unless `config/` is missing
/// too.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    match (defaults_dir.is_dir(), config_dir.is_dir()) {
        (true, _) => {}
        (false, true) => return Ok(Vec::new()),
        (false, false) => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!("no defaults/ or config/ under {}", base_dir.display()),
            })
        }
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot create {}: {e}", config_dir.display()),
    })?;

    let mut copied = Vec::new();
    for template in templates(&defaults_dir)? {
        let Some(file_name) = template.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);
        if copy_if_missing(&template, &target)? {
            copied.push(target);
        }
    }
    Ok(copied)
}

/// Regular files in `dir`, minus `.example` templates, in name order.
fn templates(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let listing_error = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("cannot list {}: {e}", dir.display()),
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(listing_error)? {
        let path = entry.map_err(listing_error)?.path();
        let is_example = path.extension().is_some_and(|ext| ext == "example");
        if path.is_file() && !is_example {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Copy `source` to `target` unless `target` already exists. The target is
/// opened with `create_new`, so a file created concurrently is never
/// overwritten. Returns whether a copy was made.
fn copy_if_missing(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let copy_error = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!(
            "failed to copy {} to {}: {e}",
            source.display(),
            target.display()
        ),
    };

    let mut output = match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error(e)),
    };
    let mut input = File::open(source).map_err(copy_error)?;
    std::io::copy(&mut input, &mut output).map_err(copy_error)?;
    Ok(true)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying default config files first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let paths = &config.data_paths;
    let required: &[(&str, &str)] = &[
        ("data_paths.team_stats", &paths.team_stats),
        ("data_paths.player_stats", &paths.player_stats),
        ("data_paths.injuries", &paths.injuries),
        ("data_paths.output_dir", &paths.output_dir),
        ("output.name", &config.output.name),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: field.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    if config.output.name.contains(['/', '\\']) {
        return Err(ConfigError::ValidationError {
            field: "output.name".into(),
            message: format!("must be a file stem, got {:?}", config.output.name),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: returns the crate root holding `defaults/` (works whether
    /// `cargo test` runs from the crate root or the workspace root).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/team-features/defaults").exists() {
            cwd.join("crates/team-features")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Fresh temp dir containing `config/pipeline.toml` with `body`.
    fn temp_config(name: &str, body: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/pipeline.toml"), body).unwrap();
        tmp
    }

    const VALID: &str = r#"
[pipeline]
division_policy = "strict"
add_conference = true
fill_numeric_gaps = true
standardize_player_names = false

[data_paths]
team_stats = "data/team.csv"
player_stats = "data/players.csv"
injuries = "data/injuries.csv"
output_dir = "out"

[output]
name = "features"
"#;

    #[test]
    fn load_default_config_from_project_files() {
        let root = project_root();
        let tmp = std::env::temp_dir().join("team_features_config_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            root.join("defaults/pipeline.toml"),
            tmp.join("defaults/pipeline.toml"),
        )
        .unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config").join("pipeline.toml")]);
        let config = load_config_from(&tmp).expect("should load copied defaults");
        assert_eq!(config.pipeline.division_policy, DivisionPolicy::Propagate);
        assert!(config.pipeline.standardize_team_names);
        assert!(!config.pipeline.add_conference);
        assert!(config.pipeline.standardize_player_names);
        assert!(config.pipeline.convert_percentages);
        assert!(!config.pipeline.fill_numeric_gaps);
        assert_eq!(config.data_paths.team_stats, "data/processed/team_stats.csv");
        assert_eq!(config.output.name, "team_features");
        assert!(config.output.write_stats);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parses_explicit_settings() {
        let tmp = temp_config("team_features_config_explicit", VALID);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.pipeline.division_policy, DivisionPolicy::Strict);
        assert!(config.pipeline.standardize_team_names);
        assert!(config.pipeline.add_conference);
        assert!(config.pipeline.fill_numeric_gaps);
        assert!(!config.pipeline.standardize_player_names);
        assert!(config.pipeline.convert_percentages);
        assert_eq!(
            config.pipeline_options().division_policy,
            DivisionPolicy::Strict
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_division_policy() {
        let tmp = temp_config(
            "team_features_config_bad_policy",
            &VALID.replace("\"strict\"", "\"lenient\""),
        );
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_path() {
        let tmp = temp_config(
            "team_features_config_empty_path",
            &VALID.replace("\"data/injuries.csv\"", "\"  \""),
        );
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "data_paths.injuries");
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_output_name_with_separator() {
        let tmp = temp_config(
            "team_features_config_bad_name",
            &VALID.replace("name = \"features\"", "name = \"out/features\""),
        );
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "output.name"),
            other => panic!("expected ValidationError, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_is_reported() {
        let tmp = std::env::temp_dir().join("team_features_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::FileNotFound { .. })
        ));
        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_keeps_existing_and_skips_examples() {
        let tmp = temp_config("team_features_config_keep", VALID);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/pipeline.toml"), "overwritten = true").unwrap();
        fs::write(tmp.join("defaults/local.toml.example"), "x = 1").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert!(copied.is_empty());
        assert!(!tmp.join("config/local.toml.example").exists());
        assert!(load_config_from(&tmp).is_ok());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn copy_if_missing_never_overwrites() {
        let tmp = std::env::temp_dir().join("team_features_config_copy_if_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        let source = tmp.join("source.toml");
        let target = tmp.join("target.toml");
        fs::write(&source, "fresh = true").unwrap();

        assert!(copy_if_missing(&source, &target).unwrap());
        assert_eq!(fs::read_to_string(&target).unwrap(), "fresh = true");

        fs::write(&target, "edited = true").unwrap();
        assert!(!copy_if_missing(&source, &target).unwrap());
        assert_eq!(fs::read_to_string(&target).unwrap(), "edited = true");

        let err = copy_if_missing(&tmp.join("absent.toml"), &tmp.join("other.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::DefaultsCopyError { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }
}
