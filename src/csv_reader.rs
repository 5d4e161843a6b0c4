//! Ratings CSV reader.
//!
//! The input file has no header row; each line is
//! `book title, member name, stars`. Extra trailing columns are ignored.
//! Names are passed through untouched; normalization happens during
//! aggregation.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use bookclub_sync_core::{RawRecord, SyncError};

/// Read every rating row from the CSV file at `path`.
pub fn read_records(path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open ratings file: {}", path.display()))?;
    let records = parse_records(file)
        .with_context(|| format!("Failed to parse ratings file: {}", path.display()))?;
    Ok(records)
}

/// Parse rating rows from any reader.
///
/// Short rows and non-numeric star values fail with
/// [`SyncError::InvalidInputFormat`] carrying the 1-based line number.
pub fn parse_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, SyncError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let fallback_line = i as u64 + 1;
        let row = result.map_err(|e| SyncError::InvalidInputFormat {
            line: e
                .position()
                .map(|p| p.line())
                .unwrap_or(fallback_line),
            reason: e.to_string(),
        })?;
        let line = row.position().map(|p| p.line()).unwrap_or(fallback_line);

        if row.len() < 3 {
            return Err(SyncError::InvalidInputFormat {
                line,
                reason: format!(
                    "expected 3 fields (book title, member name, stars), found {}",
                    row.len()
                ),
            });
        }

        let stars_text = row[2].trim();
        let value: f64 = stars_text
            .parse()
            .map_err(|_| SyncError::InvalidInputFormat {
                line,
                reason: format!("star rating '{}' is not a number", stars_text),
            })?;

        records.push(RawRecord::new(&row[0], &row[1], value));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows() {
        let data = "Dune,Alice,5\nDune,Bob,4\nThe Hobbit,Alice,3.5\n";
        let records = parse_records(data.as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![
                RawRecord::new("Dune", "Alice", 5.0),
                RawRecord::new("Dune", "Bob", 4.0),
                RawRecord::new("The Hobbit", "Alice", 3.5),
            ]
        );
    }

    #[test]
    fn quoted_titles_with_commas() {
        let data = "\"Guns, Germs, and Steel\", bob , 4 \n";
        let records = parse_records(data.as_bytes()).unwrap();
        assert_eq!(records[0].title, "Guns, Germs, and Steel");
        assert_eq!(records[0].rater, " bob ");
        assert_eq!(records[0].value, 4.0);
    }

    #[test]
    fn extra_columns_ignored() {
        let records = parse_records("Dune,Alice,5,loved it\n".as_bytes()).unwrap();
        assert_eq!(records, vec![RawRecord::new("Dune", "Alice", 5.0)]);
    }

    #[test]
    fn short_row_is_invalid_format() {
        let data = "Dune,Alice,5\nDune,Bob\n";
        match parse_records(data.as_bytes()) {
            Err(SyncError::InvalidInputFormat { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("found 2"));
            }
            other => panic!("expected InvalidInputFormat, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_stars_is_invalid_format() {
        let data = "Dune,Alice,5\nEmma,Bob,four\n";
        match parse_records(data.as_bytes()) {
            Err(SyncError::InvalidInputFormat { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("four"));
            }
            other => panic!("expected InvalidInputFormat, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_values_pass_through_to_aggregation() {
        let records = parse_records("Dune,Alice,7\n".as_bytes()).unwrap();
        assert_eq!(records[0].value, 7.0);
    }

    #[test]
    fn empty_input() {
        assert!(parse_records("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn missing_file_has_path_in_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let err = read_records(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing.csv"));
    }
}
