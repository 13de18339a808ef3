//! Observable table loader
//!
//! Reads the delimited-text export of the logging spreadsheet. The first row
//! names the observables; every column below it is one observable's series.
//!
//! - Numbers are parsed with an explicit decimal separator (`point` or
//!   `comma`), never through locale-dependent substitution
//! - A column may end early (ragged series) but may not resume after an
//!   empty cell
//! - Rows without any value (blank lines, bare delimiters) are skipped
//! - Duplicate header names: first column wins, later ones are reported

use crate::error::ObservableLoadError;
use ecd_common::config::{DecimalSeparator, ProjectSection};
use ecd_common::{Observable, ObservableSet};
use std::path::Path;

/// Parsing options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Cell delimiter; detected from the header when None
    pub delimiter: Option<char>,
    pub decimal_separator: DecimalSeparator,
}

impl From<&ProjectSection> for LoadOptions {
    fn from(section: &ProjectSection) -> Self {
        Self {
            delimiter: section.delimiter,
            decimal_separator: section.decimal_separator,
        }
    }
}

/// Loaded observables plus load-time findings
#[derive(Debug, Clone)]
pub struct LoadedObservables {
    pub observables: ObservableSet,
    /// Header names that appeared more than once (later columns ignored)
    pub duplicate_names: Vec<String>,
    /// Delimiter actually used
    pub delimiter: char,
}

/// Delimited-text observable loader
#[derive(Debug, Clone, Default)]
pub struct ObservableLoader {
    options: LoadOptions,
}

impl ObservableLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Load observables from a file
    pub fn load(&self, path: &Path) -> Result<LoadedObservables, ObservableLoadError> {
        let text = std::fs::read_to_string(path)?;
        let loaded = self.parse(&text)?;

        tracing::debug!(
            path = %path.display(),
            observables = loaded.observables.len(),
            delimiter = ?loaded.delimiter,
            "Observable file parsed"
        );
        Ok(loaded)
    }

    /// Parse observables from delimited text
    pub fn parse(&self, text: &str) -> Result<LoadedObservables, ObservableLoadError> {
        let mut lines = text.trim_end().lines();
        let header_line = lines
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or(ObservableLoadError::Empty)?;

        let delimiter = self
            .options
            .delimiter
            .unwrap_or_else(|| detect_delimiter(header_line, self.options.decimal_separator));

        let names: Vec<String> = header_line
            .split(delimiter)
            .map(|cell| unquote(cell).to_string())
            .collect();
        if let Some(column) = names.iter().position(|n| n.is_empty()) {
            return Err(ObservableLoadError::EmptyHeader { column });
        }

        let mut series: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
        let mut ended = vec![false; names.len()];

        // Line 1 is the header
        for (offset, line) in lines.enumerate() {
            let row = offset + 2;
            let mut cells: Vec<&str> = line.split(delimiter).map(unquote).collect();
            while cells.last().map_or(false, |c| c.is_empty()) {
                cells.pop();
            }
            if cells.is_empty() {
                continue;
            }
            if cells.len() > names.len() {
                return Err(ObservableLoadError::TooManyCells {
                    row,
                    expected: names.len(),
                    found: cells.len(),
                });
            }

            for (column, name) in names.iter().enumerate() {
                let cell = cells.get(column).copied().unwrap_or("");
                if cell.is_empty() {
                    ended[column] = true;
                    continue;
                }
                if ended[column] {
                    return Err(ObservableLoadError::Gap {
                        column: name.clone(),
                        row,
                    });
                }
                let value = parse_number(cell, self.options.decimal_separator).ok_or_else(|| {
                    ObservableLoadError::InvalidNumber {
                        column: name.clone(),
                        row,
                        value: cell.to_string(),
                    }
                })?;
                series[column].push(value);
            }
        }

        let observables = names
            .into_iter()
            .zip(series)
            .map(|(name, values)| Observable::new(name, values))
            .collect();
        let (observables, duplicate_names) = ObservableSet::from_observables(observables);

        Ok(LoadedObservables {
            observables,
            duplicate_names,
            delimiter,
        })
    }
}

/// Tab, then semicolon, then comma
///
/// With comma decimals the comma is never a delimiter, so the fallback is
/// the semicolon.
fn detect_delimiter(header: &str, separator: DecimalSeparator) -> char {
    if header.contains('\t') {
        '\t'
    } else if header.contains(';') || separator == DecimalSeparator::Comma {
        ';'
    } else {
        ','
    }
}

fn unquote(cell: &str) -> &str {
    let cell = cell.trim();
    cell.strip_prefix('"')
        .and_then(|c| c.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(cell)
}

/// Parse a finite number written with the given decimal separator
fn parse_number(cell: &str, separator: DecimalSeparator) -> Option<f64> {
    let value = match separator {
        DecimalSeparator::Point => {
            if cell.contains(',') {
                return None;
            }
            cell.parse::<f64>().ok()?
        }
        DecimalSeparator::Comma => {
            if cell.contains('.') || cell.matches(',').count() > 1 {
                return None;
            }
            cell.replacen(',', ".", 1).parse::<f64>().ok()?
        }
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<LoadedObservables, ObservableLoadError> {
        ObservableLoader::default().parse(text)
    }

    #[test]
    fn test_columns_become_series() {
        let loaded = parse("moves,pauses\n1,0.5\n2,1.5\n3,2.5\n").unwrap();

        assert_eq!(loaded.delimiter, ',');
        let names: Vec<&str> = loaded.observables.names().collect();
        assert_eq!(names, vec!["moves", "pauses"]);
        assert_eq!(loaded.observables.get("pauses").unwrap().values, vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_ragged_columns_allowed() {
        let loaded = parse("a,b\n1,2\n3,\n5\n").unwrap();
        assert_eq!(loaded.observables.get("a").unwrap().len(), 3);
        assert_eq!(loaded.observables.get("b").unwrap().len(), 1);
    }

    #[test]
    fn test_comma_decimal_separator() {
        let loader = ObservableLoader::new(LoadOptions {
            delimiter: None,
            decimal_separator: DecimalSeparator::Comma,
        });
        let loaded = loader.parse("x;y\n1,5;2\n-0,25;3\n").unwrap();

        assert_eq!(loaded.delimiter, ';');
        assert_eq!(loaded.observables.get("x").unwrap().values, vec![1.5, -0.25]);
    }

    #[test]
    fn test_single_column_with_comma_decimals() {
        // Given: one column, so the header has no delimiter to detect
        let loader = ObservableLoader::new(LoadOptions {
            delimiter: None,
            decimal_separator: DecimalSeparator::Comma,
        });

        // When: parsing comma-decimal values
        let loaded = loader.parse("score\n1,5\n2,25\n").unwrap();

        // Then: the comma stays inside the number
        assert_eq!(loaded.delimiter, ';');
        assert_eq!(loaded.observables.len(), 1);
        assert_eq!(loaded.observables.get("score").unwrap().values, vec![1.5, 2.25]);
    }

    #[test]
    fn test_point_in_comma_mode_is_invalid() {
        let loader = ObservableLoader::new(LoadOptions {
            delimiter: Some(';'),
            decimal_separator: DecimalSeparator::Comma,
        });
        let err = loader.parse("x\n1.5\n").unwrap_err();
        assert!(matches!(err, ObservableLoadError::InvalidNumber { row: 2, .. }));
    }

    #[test]
    fn test_tab_delimiter_detected() {
        let loaded = parse("a\tb\n1\t2\n").unwrap();
        assert_eq!(loaded.delimiter, '\t');
        assert_eq!(loaded.observables.len(), 2);
    }

    #[test]
    fn test_blank_rows_skipped() {
        // Given: a blank line and a row of bare delimiters mid-file
        let text = "a,b\n1,2\n\n3,4\n,\n5,6\n";

        // When: parsing
        let loaded = parse(text).unwrap();

        // Then: both columns keep every value, no gap reported
        assert_eq!(loaded.observables.get("a").unwrap().values, vec![1.0, 3.0, 5.0]);
        assert_eq!(loaded.observables.get("b").unwrap().values, vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_value_after_gap_rejected() {
        let err = parse("a,b\n1,2\n3,\n4,5\n").unwrap_err();
        match err {
            ObservableLoadError::Gap { column, row } => {
                assert_eq!(column, "b");
                assert_eq!(row, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_cell_rejected() {
        let err = parse("a\n1\nabc\n").unwrap_err();
        match err {
            ObservableLoadError::InvalidNumber { column, row, value } => {
                assert_eq!(column, "a");
                assert_eq!(row, 3);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(matches!(
            parse("a\nNaN\n").unwrap_err(),
            ObservableLoadError::InvalidNumber { .. }
        ));
    }

    #[test]
    fn test_duplicate_header_first_wins() {
        let loaded = parse("a,a\n1,9\n2,8\n").unwrap();
        assert_eq!(loaded.duplicate_names, vec!["a".to_string()]);
        assert_eq!(loaded.observables.get("a").unwrap().values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_too_many_cells() {
        let err = parse("a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(
            err,
            ObservableLoadError::TooManyCells { row: 2, expected: 2, found: 3 }
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse("").unwrap_err(), ObservableLoadError::Empty));
        assert!(matches!(parse("a,,b\n").unwrap_err(), ObservableLoadError::EmptyHeader { column: 1 }));
    }

    #[test]
    fn test_quoted_header_names() {
        let loaded = parse("\"time on task\",\"retries\"\n1,2\n").unwrap();
        assert!(loaded.observables.contains("time on task"));
    }
}
