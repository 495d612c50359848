//! CSV reading operations.

use std::{fs, io::Cursor, path::Path};

use anyhow::{bail, ensure, Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::{Column, CsvReadOptions, DataType}};
use serde::{Deserialize, Serialize};

use crate::{graph::AdjacencyRow, map::{UnitId, UnitRecord}};

/// Column names of a unit-record CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitColumns {
    /// Column holding a ready-made unit id. When absent from the file, the id
    /// is assembled from `state` and `county` codes.
    pub geo_id: String,
    pub state: String,
    pub county: String,
    pub name: String,
    pub population: String,
    pub subpopulations: Vec<String>,
    /// Suffix stripped from display names, e.g. ", Indiana".
    pub name_suffix: Option<String>,
}

impl Default for UnitColumns {
    fn default() -> Self {
        Self {
            geo_id: "geo_id".into(),
            state: "state".into(),
            county: "county".into(),
            name: "name".into(),
            population: "population".into(),
            subpopulations: Vec::new(),
            name_suffix: None,
        }
    }
}

/// Reads a file as text, replacing invalid UTF-8 (the published adjacency table is Latin-1).
fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("[io::csv::read] Failed to open file: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads delimited text into a DataFrame of string columns.
fn read_delimited_strings(text: &str, separator: u8, has_header: bool) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(has_header)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|po| po.with_separator(separator).with_truncate_ragged_lines(true))
        .into_reader_with_file_handle(Cursor::new(text.as_bytes()))
        .finish()
        .context("[io::csv::read] Failed to parse delimited text")
}

/// Materialize a column as optional owned strings.
fn string_values(column: &Column) -> Result<Vec<Option<String>>> {
    let column = column.cast(&DataType::String)?;
    Ok(column.str()?.into_iter()
        .map(|value| value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
        .collect())
}

fn named_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)
        .with_context(|| format!("[io::csv::read] Missing column '{name}'"))?;
    string_values(column)
}

/// Parse a population figure; blanks are missing figures.
fn parse_count(value: Option<&str>, column: &str, row: usize) -> Result<Option<u64>> {
    let Some(value) = value else { return Ok(None) };
    match value.parse::<u64>() {
        Ok(count) => Ok(Some(count)),
        Err(_) => bail!("[io::csv::read] Row {row}: '{value}' in column '{column}' is not a non-negative integer"),
    }
}

/// Reads unit records from a CSV file.
pub fn read_unit_records(path: &Path, columns: &UnitColumns) -> Result<Vec<UnitRecord>> {
    parse_unit_records(&read_text_lossy(path)?, columns)
        .with_context(|| format!("[io::csv::read] Failed to read unit records from {:?}", path))
}

/// Reads unit records from CSV text with a header row.
pub fn parse_unit_records(csv: &str, columns: &UnitColumns) -> Result<Vec<UnitRecord>> {
    let df = read_delimited_strings(csv, b',', true)?;

    let ids = if df.column(&columns.geo_id).is_ok() {
        named_values(&df, &columns.geo_id)?
    } else {
        let states = named_values(&df, &columns.state)?;
        let counties = named_values(&df, &columns.county)?;
        states.into_iter().zip(counties)
            .map(|(s, c)| s.zip(c).map(|(s, c)| UnitId::from_codes(&s, &c).to_string()))
            .collect()
    };
    let names = named_values(&df, &columns.name)?;
    let populations = named_values(&df, &columns.population)?;
    let subpopulations = columns.subpopulations.iter()
        .map(|series| Ok((series.as_str(), named_values(&df, series)?)))
        .collect::<Result<Vec<_>>>()?;

    (0..df.height())
        .map(|row| {
            let id = ids[row].clone()
                .with_context(|| format!("[io::csv::read] Row {}: missing unit identifier", row + 1))?;
            let mut record = UnitRecord {
                id,
                name: names[row].clone().unwrap_or_default(),
                population: parse_count(populations[row].as_deref(), &columns.population, row + 1)?,
                subpopulations: Default::default(),
            };
            for (series, values) in &subpopulations {
                let count = parse_count(values[row].as_deref(), series, row + 1)?;
                record.subpopulations.insert(series.to_string(), count);
            }
            Ok(match &columns.name_suffix {
                Some(suffix) => record.strip_name_suffix(suffix),
                None => record,
            })
        })
        .collect()
}

/// Reads the tab-separated adjacency table from a file.
pub fn read_adjacency_table(path: &Path) -> Result<Vec<AdjacencyRow>> {
    parse_adjacency_table(&read_text_lossy(path)?)
        .with_context(|| format!("[io::csv::read] Failed to read adjacency table from {:?}", path))
}

/// Parses the tab-separated adjacency table: no header, four columns
/// (unit name, unit code, neighbor name, neighbor code). Continuation rows
/// leave the first two columns blank.
pub fn parse_adjacency_table(text: &str) -> Result<Vec<AdjacencyRow>> {
    if text.trim().is_empty() { return Ok(Vec::new()) }

    let df = read_delimited_strings(text, b'\t', false)?;
    ensure!(df.width() >= 4, "[io::csv::read] Adjacency table must have four columns, found {}", df.width());

    let columns = df.get_columns()[..4].iter()
        .map(string_values)
        .collect::<Result<Vec<_>>>()?;

    Ok((0..df.height())
        .map(|row| AdjacencyRow {
            unit: columns[0][row].clone(),
            unit_code: columns[1][row].clone(),
            neighbor: columns[2][row].clone(),
            neighbor_code: columns[3][row].clone(),
        })
        .collect())
}
