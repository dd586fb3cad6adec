// CSV loading and persistence for tables, plus the metadata JSON export.
//
// Loaders are reader-based so they can be tested on in-memory strings; the
// path-based wrappers attach the file path to any error.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use polars::prelude::*;
use tracing::info;

use crate::features::stats::FeatureStats;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Polars { path: String, source: PolarsError },

    #[error("failed to serialize {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("no data available for {0}")]
    Empty(String),
}

// ---------------------------------------------------------------------------
// Reader / writer
// ---------------------------------------------------------------------------

/// Parse CSV (header row required) into a frame.
///
/// Column types are inferred from every row: whole numbers become Int64, a
/// decimal point or `inf`/`NaN` anywhere makes the column Float64, anything
/// else is text. Empty cells are null.
pub fn read_table<R: Read>(mut reader: R) -> PolarsResult<DataFrame> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
}

/// Write a frame as CSV with a header row. Null cells are written empty.
pub fn write_table<W: Write>(df: &DataFrame, writer: W) -> PolarsResult<()> {
    let mut df = df.clone();
    CsvWriter::new(writer).include_header(true).finish(&mut df)
}

// ---------------------------------------------------------------------------
// Path-based helpers
// ---------------------------------------------------------------------------

/// Load a CSV file into a frame.
pub fn load_table(path: &Path) -> Result<DataFrame, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    read_table(file).map_err(|e| LoadError::Polars {
        path: path.display().to_string(),
        source: e,
    })
}

/// `{name}_{YYYYMMDD}.{extension}` inside `dir`, dated today.
fn dated_path(dir: &Path, name: &str, extension: &str) -> PathBuf {
    let date = Local::now().format("%Y%m%d");
    dir.join(format!("{name}_{date}.{extension}"))
}

fn create_dir(dir: &Path) -> Result<(), LoadError> {
    std::fs::create_dir_all(dir).map_err(|e| LoadError::Io {
        path: dir.display().to_string(),
        source: e,
    })
}

/// Save a frame as `{dir}/{name}_{YYYYMMDD}.csv`, creating `dir` as needed.
/// Returns the written path and row count.
pub fn save_table(df: &DataFrame, dir: &Path, name: &str) -> Result<(PathBuf, usize), LoadError> {
    if df.height() == 0 {
        return Err(LoadError::Empty(name.to_string()));
    }
    create_dir(dir)?;

    let path = dated_path(dir, name, "csv");
    let file = std::fs::File::create(&path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write_table(df, file).map_err(|e| LoadError::Polars {
        path: path.display().to_string(),
        source: e,
    })?;

    info!("Saved {} rows to {}", df.height(), path.display());
    Ok((path, df.height()))
}

/// Save feature metadata as pretty JSON: `{dir}/{name}_stats_{YYYYMMDD}.json`.
pub fn save_stats(stats: &FeatureStats, dir: &Path, name: &str) -> Result<PathBuf, LoadError> {
    create_dir(dir)?;

    let path = dated_path(dir, &format!("{name}_stats"), "json");
    let json = serde_json::to_string_pretty(stats).map_err(|e| LoadError::Json {
        path: path.display().to_string(),
        source: e,
    })?;
    std::fs::write(&path, json).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
