use fgoxide::io::DelimFile;
use itertools::Itertools;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_bool_from_anything;
use std::path::Path;

use crate::errors::PrepError;
use crate::plate::Well;

/// One data row of a plate layout file, as exported by the plating notebook.
#[derive(Clone, Debug, Deserialize)]
struct LayoutRow {
    #[serde(rename = "Sample")]
    sample: String,
    #[serde(rename = "Row")]
    row: String,
    #[serde(rename = "Col")]
    col: u8,
    #[serde(rename = "Blank", deserialize_with = "deserialize_bool_from_anything")]
    blank: bool,
}

/// A sample position on the 384-well plate, with a validated coordinate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WellRecord {
    /// The sample identifier, unique across the whole layout.
    pub sample_id: String,
    /// The well the sample occupies.
    pub well: Well,
    /// True when the well is a contamination-control blank. Blanks carry no
    /// biological sample but still occupy a sequenceable well.
    pub is_blank: bool,
}

/// The full well layout for one sequencing run.
#[derive(Clone, Debug)]
pub struct PlateLayout {
    /// The layout's well records, in input order.
    pub wells: Vec<WellRecord>,
}

impl PlateLayout {
    /// Builds a layout from well records, enforcing sample-identifier
    /// uniqueness across the whole layout (blanks included).
    ///
    /// # Errors
    /// - `DuplicateIdentity` if two records share a sample identifier.
    pub fn from_records(records: Vec<WellRecord>) -> Result<Self, PrepError> {
        let duplicates: Vec<String> = records
            .iter()
            .map(|r| r.sample_id.as_str())
            .duplicates()
            .map(ToOwned::to_owned)
            .sorted()
            .collect();
        if duplicates.is_empty() {
            Ok(Self { wells: records })
        } else {
            Err(PrepError::DuplicateIdentity {
                context: "plate layout".to_owned(),
                names: duplicates,
            })
        }
    }

    /// Loads a layout from a delimited file with the header
    /// `Sample, Row, Col, Blank`.
    ///
    /// # Errors
    /// - `Parse` if the file cannot be read, a header column is missing, or a
    ///   row holds an empty sample, an unparsable field, or a coordinate off
    ///   the 384-well grid.
    /// - `DuplicateIdentity` if two rows share a `Sample` value.
    pub fn from_file<P: AsRef<Path>>(path: &P, delimiter: u8) -> Result<Self, PrepError> {
        let rows: Vec<LayoutRow> = DelimFile::default()
            .read(path, delimiter, false)
            .map_err(|e| PrepError::parse_of(path, e))?;
        let records = rows
            .into_iter()
            .map(|row| Self::well_record(path.as_ref(), row))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_records(records)
    }

    /// Converts one raw layout row into a validated record.
    fn well_record(path: &Path, row: LayoutRow) -> Result<WellRecord, PrepError> {
        let sample_id = row.sample.trim().to_owned();
        if sample_id.is_empty() {
            return Err(PrepError::Parse {
                path: path.to_path_buf(),
                message: format!("row {}{} has an empty Sample value", row.row, row.col),
            });
        }
        let row_letter = {
            let trimmed = row.row.trim();
            let mut chars = trimmed.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(PrepError::Parse {
                        path: path.to_path_buf(),
                        message: format!("Row value {:?} is not a single letter", row.row),
                    })
                }
            }
        };
        let well = Well::try_new(row_letter, row.col).ok_or_else(|| PrepError::Parse {
            path: path.to_path_buf(),
            message: format!(
                "{}{} is not a 384-well coordinate (rows A-P, columns 1-24)",
                row_letter, row.col
            ),
        })?;
        Ok(WellRecord { sample_id, well, is_blank: row.blank })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fgoxide::io::Io;
    use tempfile::TempDir;

    fn layout_file(tempdir: &TempDir, lines: &[&str]) -> std::path::PathBuf {
        let path = tempdir.path().join("layout.tsv");
        Io::default().write_lines(&path, lines).unwrap();
        path
    }

    // ############################################################################################
    // Test [`PlateLayout::from_file`] - expected to pass
    // ############################################################################################
    #[test]
    fn test_reading_layout_from_tsv() {
        let tempdir = TempDir::new().unwrap();
        let path = layout_file(
            &tempdir,
            &[
                "Sample\tRow\tCol\tBlank",
                "sample.1\tA\t1\tFalse",
                "sample.2\tP\t24\tFalse",
                "BLANK.1A\tB\t2\tTrue",
            ],
        );
        let layout = PlateLayout::from_file(&path, b'\t').unwrap();

        assert_eq!(layout.wells.len(), 3);
        assert_eq!(layout.wells[0].sample_id, "sample.1");
        assert_eq!(layout.wells[0].well, Well::new('A', 1));
        assert!(!layout.wells[0].is_blank);
        assert_eq!(layout.wells[1].well, Well::new('P', 24));
        assert!(layout.wells[2].is_blank);
    }

    #[test]
    fn test_reading_layout_from_csv() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("layout.csv");
        Io::default()
            .write_lines(&path, &["Sample,Row,Col,Blank", "sample.1,A,1,True"])
            .unwrap();
        let layout = PlateLayout::from_file(&path, b',').unwrap();

        assert_eq!(layout.wells.len(), 1);
        assert!(layout.wells[0].is_blank);
    }

    #[test]
    fn test_reading_layout_trims_whitespace() {
        let tempdir = TempDir::new().unwrap();
        let path = layout_file(&tempdir, &["Sample\tRow\tCol\tBlank", " sample.1 \t A \t1\tFalse"]);
        let layout = PlateLayout::from_file(&path, b'\t').unwrap();

        assert_eq!(layout.wells[0].sample_id, "sample.1");
        assert_eq!(layout.wells[0].well, Well::new('A', 1));
    }

    // ############################################################################################
    // Test [`PlateLayout::from_file`] - expected to fail
    // ############################################################################################
    #[test]
    fn test_duplicate_samples_fail_loading() {
        let tempdir = TempDir::new().unwrap();
        let path = layout_file(
            &tempdir,
            &[
                "Sample\tRow\tCol\tBlank",
                "sample.1\tA\t1\tFalse",
                "sample.2\tA\t2\tFalse",
                "sample.1\tA\t3\tFalse",
            ],
        );
        let err = PlateLayout::from_file(&path, b'\t').unwrap_err();
        match err {
            PrepError::DuplicateIdentity { names, .. } => {
                assert_eq!(names, vec!["sample.1".to_owned()]);
            }
            other => panic!("expected DuplicateIdentity, got {other:?}"),
        }
    }

    #[test]
    fn test_row_off_grid_fails_loading() {
        let tempdir = TempDir::new().unwrap();
        let path = layout_file(&tempdir, &["Sample\tRow\tCol\tBlank", "sample.1\tQ\t1\tFalse"]);
        let err = PlateLayout::from_file(&path, b'\t').unwrap_err();
        assert!(matches!(err, PrepError::Parse { .. }), "{err:?}");
        assert!(format!("{err}").contains("Q1"));
    }

    #[test]
    fn test_column_off_grid_fails_loading() {
        let tempdir = TempDir::new().unwrap();
        let path = layout_file(&tempdir, &["Sample\tRow\tCol\tBlank", "sample.1\tA\t25\tFalse"]);
        let err = PlateLayout::from_file(&path, b'\t').unwrap_err();
        assert!(matches!(err, PrepError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn test_unparsable_column_fails_loading() {
        let tempdir = TempDir::new().unwrap();
        let path = layout_file(&tempdir, &["Sample\tRow\tCol\tBlank", "sample.1\tA\tone\tFalse"]);
        let err = PlateLayout::from_file(&path, b'\t').unwrap_err();
        assert!(matches!(err, PrepError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn test_missing_header_column_fails_loading() {
        let tempdir = TempDir::new().unwrap();
        let path = layout_file(&tempdir, &["Sample\tRow\tCol", "sample.1\tA\t1"]);
        let err = PlateLayout::from_file(&path, b'\t').unwrap_err();
        assert!(matches!(err, PrepError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn test_empty_sample_fails_loading() {
        let tempdir = TempDir::new().unwrap();
        let path = layout_file(&tempdir, &["Sample\tRow\tCol\tBlank", " \tA\t1\tFalse"]);
        let err = PlateLayout::from_file(&path, b'\t').unwrap_err();
        assert!(matches!(err, PrepError::Parse { .. }), "{err:?}");
    }
}
