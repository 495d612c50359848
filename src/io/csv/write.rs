//! CSV writing operations.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{CsvWriter, NamedFrom}, series::Series};

use crate::map::UnitId;

/// Write a DataFrame to a CSV file.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::csv::write] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))
}

/// Write a DataFrame to a CSV string.
pub(crate) fn write_csv_string(df: &mut DataFrame) -> Result<String> {
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .finish(df)
        .with_context(|| "[io::csv::write] Failed to write CSV to string")?;
    String::from_utf8(buffer)
        .with_context(|| "[io::csv::write] CSV output is not valid UTF-8")
}

/// Build the two-column (geo_id, district) assignment frame.
/// Unassigned units are written with an empty district.
fn plan_assignments_frame(assignments: &[(UnitId, Option<u32>)]) -> Result<DataFrame> {
    let (geo_ids, districts) = assignments.iter()
        .map(|(unit, district)| (unit.to_string(), *district))
        .unzip::<_, _, Vec<_>, Vec<_>>();

    Ok(DataFrame::new(vec![
        Series::new("geo_id".into(), geo_ids).into(),
        Series::new("district".into(), districts).into(),
    ])?)
}

/// Write plan assignments to a CSV file.
pub(crate) fn write_plan_assignments(assignments: &[(UnitId, Option<u32>)], path: &Path) -> Result<()> {
    write_csv(&mut plan_assignments_frame(assignments)?, path)
}

/// Write plan assignments to a CSV string.
pub(crate) fn write_plan_assignments_string(assignments: &[(UnitId, Option<u32>)]) -> Result<String> {
    write_csv_string(&mut plan_assignments_frame(assignments)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_round_trip_through_file() {
        let rows = vec![(UnitId::new("18001"), Some(0)), (UnitId::new("18003"), None)];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.csv");

        write_plan_assignments(&rows, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("geo_id,district"));
        assert_eq!(lines.next(), Some("18001,0"));
        assert_eq!(lines.next(), Some("18003,"));
    }
}
