// Cleaning passes for raw input tables: team-name standardization,
// conference tagging, player-name formatting, percentage strings, and
// numeric gap filling.
//
// Historical franchise names, nicknames, and alternate abbreviations are all
// folded into the current three-letter code so that join keys line up across
// sources.

use polars::prelude::*;
use tracing::debug;

/// Alternate name -> current franchise code. Names are matched after
/// trimming and uppercasing.
const TEAM_ALIASES: &[(&str, &str)] = &[
    ("BULLETS", "WAS"),
    ("WASHINGTON BULLETS", "WAS"),
    ("CAPITAL BULLETS", "WAS"),
    ("BALTIMORE BULLETS", "WAS"),
    ("WASHINGTON WIZARDS", "WAS"),
    ("WIZARDS", "WAS"),
    ("CHICAGO ZEPHYRS", "WAS"),
    ("CHICAGO PACKERS", "WAS"),
    ("HAWKS", "ATL"),
    ("ATLANTA HAWKS", "ATL"),
    ("ST. LOUIS HAWKS", "ATL"),
    ("MILWAUKEE HAWKS", "ATL"),
    ("TRI-CITIES BLACKHAWKS", "ATL"),
    ("CLIPPERS", "LAC"),
    ("LA CLIPPERS", "LAC"),
    ("LOS ANGELES CLIPPERS", "LAC"),
    ("BUFFALO BRAVES", "LAC"),
    ("SAN DIEGO CLIPPERS", "LAC"),
    ("KINGS", "SAC"),
    ("SACRAMENTO KINGS", "SAC"),
    ("KANSAS CITY KINGS", "SAC"),
    ("CINCINNATI ROYALS", "SAC"),
    ("ROCHESTER ROYALS", "SAC"),
    ("76ERS", "PHI"),
    ("SIXERS", "PHI"),
    ("PHILADELPHIA 76ERS", "PHI"),
    ("SYRACUSE NATIONALS", "PHI"),
    ("LAKERS", "LAL"),
    ("LA LAKERS", "LAL"),
    ("LOS ANGELES LAKERS", "LAL"),
    ("MINNEAPOLIS LAKERS", "LAL"),
    ("ROCKETS", "HOU"),
    ("HOUSTON ROCKETS", "HOU"),
    ("SAN DIEGO ROCKETS", "HOU"),
    ("THUNDER", "OKC"),
    ("OKLAHOMA CITY THUNDER", "OKC"),
    ("SEATTLE SUPERSONICS", "OKC"),
    ("SONICS", "OKC"),
    ("SEA", "OKC"),
    ("GRIZZLIES", "MEM"),
    ("MEMPHIS GRIZZLIES", "MEM"),
    ("VANCOUVER GRIZZLIES", "MEM"),
    ("PELICANS", "NOP"),
    ("NEW ORLEANS PELICANS", "NOP"),
    ("NEW ORLEANS HORNETS", "NOP"),
    ("NEW ORLEANS/OKLAHOMA CITY HORNETS", "NOP"),
    ("NOK", "NOP"),
    ("NOH", "NOP"),
    ("JAZZ", "UTA"),
    ("UTAH JAZZ", "UTA"),
    ("NEW ORLEANS JAZZ", "UTA"),
    ("HORNETS", "CHA"),
    ("CHARLOTTE HORNETS", "CHA"),
    ("CHARLOTTE BOBCATS", "CHA"),
    ("BOBCATS", "CHA"),
    ("CHO", "CHA"),
    ("NETS", "BKN"),
    ("BROOKLYN NETS", "BKN"),
    ("NEW JERSEY NETS", "BKN"),
    ("NJN", "BKN"),
    ("BRK", "BKN"),
    ("WARRIORS", "GSW"),
    ("GOLDEN STATE WARRIORS", "GSW"),
    ("SAN FRANCISCO WARRIORS", "GSW"),
    ("SUNS", "PHX"),
    ("PHOENIX SUNS", "PHX"),
    ("PHO", "PHX"),
    ("BLAZERS", "POR"),
    ("TRAIL BLAZERS", "POR"),
    ("PORTLAND TRAIL BLAZERS", "POR"),
    ("SPURS", "SAS"),
    ("SAN ANTONIO SPURS", "SAS"),
    ("RAPTORS", "TOR"),
    ("TORONTO RAPTORS", "TOR"),
    ("BUCKS", "MIL"),
    ("MILWAUKEE BUCKS", "MIL"),
    ("TIMBERWOLVES", "MIN"),
    ("MINNESOTA TIMBERWOLVES", "MIN"),
    ("NUGGETS", "DEN"),
    ("DENVER NUGGETS", "DEN"),
    ("HEAT", "MIA"),
    ("MIAMI HEAT", "MIA"),
    ("CAVALIERS", "CLE"),
    ("CLEVELAND CAVALIERS", "CLE"),
    ("CAVS", "CLE"),
    ("CELTICS", "BOS"),
    ("BOSTON CELTICS", "BOS"),
    ("PISTONS", "DET"),
    ("DETROIT PISTONS", "DET"),
    ("PACERS", "IND"),
    ("INDIANA PACERS", "IND"),
    ("BULLS", "CHI"),
    ("CHICAGO BULLS", "CHI"),
    ("MAVERICKS", "DAL"),
    ("DALLAS MAVERICKS", "DAL"),
    ("MAGIC", "ORL"),
    ("ORLANDO MAGIC", "ORL"),
    ("KNICKS", "NYK"),
    ("NEW YORK KNICKS", "NYK"),
];

const EASTERN: &[&str] = &[
    "ATL", "BOS", "BKN", "CHA", "CHI", "CLE", "DET", "IND", "MIA", "MIL", "NYK", "ORL", "PHI",
    "TOR", "WAS",
];

const WESTERN: &[&str] = &[
    "DAL", "DEN", "GSW", "HOU", "LAC", "LAL", "MEM", "MIN", "NOP", "OKC", "PHX", "POR", "SAC",
    "SAS", "UTA",
];

/// Conference of a current franchise code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conference {
    East,
    West,
    Unknown,
}

impl Conference {
    pub fn label(&self) -> &'static str {
        match self {
            Conference::East => "EAST",
            Conference::West => "WEST",
            Conference::Unknown => "Unknown",
        }
    }
}

/// Normalize one raw team name: trim, uppercase, and map known aliases to the
/// franchise code. Unknown names come back uppercased.
pub fn standardize_team_name(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    TEAM_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map_or(upper, |(_, code)| code.to_string())
}

pub fn conference_for(code: &str) -> Conference {
    if EASTERN.contains(&code) {
        Conference::East
    } else if WESTERN.contains(&code) {
        Conference::West
    } else {
        Conference::Unknown
    }
}

// ---------------------------------------------------------------------------
// Team codes and conferences
// ---------------------------------------------------------------------------

/// Standardize the named team columns of a table. Non-text columns are left
/// as they are; missing cells stay missing. Every named column must exist.
pub fn standardize_team_codes(df: &DataFrame, columns: &[&str]) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    for name in columns {
        let Ok(cells) = out.column(name)?.str() else {
            continue;
        };
        let cleaned: StringChunked = cells
            .into_iter()
            .map(|cell| cell.map(standardize_team_name))
            .collect();
        out.with_column(cleaned.with_name((*name).into()).into_series())?;
    }
    Ok(out)
}

/// Append (or replace) a `conference` column derived from `team_column`.
pub fn add_conference(df: &DataFrame, team_column: &str) -> PolarsResult<DataFrame> {
    let conferences: StringChunked = df
        .column(team_column)?
        .str()?
        .into_iter()
        .map(|team| Some(team.map_or(Conference::Unknown, conference_for).label()))
        .collect();
    let mut out = df.clone();
    out.with_column(conferences.with_name("conference".into()).into_series())?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Player names
// ---------------------------------------------------------------------------

/// Trim and uppercase a player-name column so the same player is spelled one
/// way across sources. A table without the column is returned unchanged.
pub fn standardize_player_names(df: &DataFrame, column: &str) -> PolarsResult<DataFrame> {
    let is_text = df
        .column(column)
        .is_ok_and(|c| c.dtype() == &DataType::String);
    if !is_text {
        return Ok(df.clone());
    }
    df.clone()
        .lazy()
        .with_column(
            col(column)
                .str()
                .strip_chars(lit(NULL))
                .str()
                .to_uppercase(),
        )
        .collect()
}

// ---------------------------------------------------------------------------
// Numeric columns
// ---------------------------------------------------------------------------

/// Name fragments that mark a column as a label rather than a measurement.
const NON_NUMERIC_PATTERNS: &[&str] = &[
    "name",
    "team",
    "position",
    "date",
    "season",
    "location",
    "player",
    "pos",
    "conference",
    "year",
];

fn is_percentage_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("percentage") || lower.contains("pct")
}

/// Turn text percentage columns (`"45.5%"`) into fractions (`0.455`).
///
/// Applies to text columns whose name contains `percentage` or `pct`; numeric
/// columns are assumed to be converted already. Cells that don't parse become
/// null.
pub fn convert_percentages(df: &DataFrame) -> PolarsResult<DataFrame> {
    let conversions: Vec<Expr> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String && is_percentage_column(c.name()))
        .map(|c| {
            let name = c.name().as_str();
            debug!("converting percentage strings in `{name}`");
            (col(name)
                .str()
                .strip_chars(lit(NULL))
                .str()
                .strip_chars_end(lit("%"))
                .cast(DataType::Float64)
                / lit(100.0))
            .alias(name)
        })
        .collect();
    if conversions.is_empty() {
        return Ok(df.clone());
    }
    df.clone().lazy().with_columns(conversions).collect()
}

/// Coerce measurement columns to numbers and fill their gaps with the column
/// median (0 when the column has no numeric value at all).
///
/// Columns whose lowercase name contains one of `NON_NUMERIC_PATTERNS` are
/// skipped. Text columns are parsed as floats, unparsable cells counting as
/// gaps. Numeric columns are only touched when they have a null or NaN cell;
/// integer columns with gaps come back as floats.
pub fn fill_numeric_gaps(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut fills = Vec::new();
    for column in df.get_columns() {
        let name = column.name().as_str();
        let lower = name.to_lowercase();
        if NON_NUMERIC_PATTERNS.iter().any(|p| lower.contains(p)) {
            continue;
        }
        let dtype = column.dtype();
        let needs_fill = if dtype == &DataType::String {
            true
        } else if dtype.is_float() {
            let values = column.cast(&DataType::Float64)?;
            values.null_count() > 0
                || values
                    .f64()?
                    .into_iter()
                    .any(|v| v.is_some_and(f64::is_nan))
        } else if dtype.is_integer() {
            column.null_count() > 0
        } else {
            false
        };
        if !needs_fill {
            continue;
        }

        debug!("filling numeric gaps in `{name}` with the column median");
        let values = col(name).cast(DataType::Float64).fill_nan(lit(NULL));
        fills.push(
            values
                .clone()
                .fill_null(values.median().fill_null(lit(0.0)))
                .alias(name),
        );
    }
    if fills.is_empty() {
        return Ok(df.clone());
    }
    df.clone().lazy().with_columns(fills).collect()
}
