use crate::commands::command::Command;
use anyhow::{anyhow, Result};
use clap::Parser;
use log::info;
use preptk_lib::merge::merge;
use preptk_lib::prep::{parse_prep, write_prep};
use proglog::{CountFormatterKind, ProgLogBuilder};
use std::path::PathBuf;

/// Merges prep files into one master prep file.
///
/// Inputs may be freshly generated or previously persisted prep files; all
/// of them must carry the full prep-file schema. Rows are concatenated in
/// the order the inputs are given and are never modified. A ``sample_name``
/// appearing more than once anywhere across the inputs fails the merge
/// outright and no output is written, since the downstream pipeline keys on
/// sample names.
///
/// ## Example Command Line
///
/// ```
/// preptk merge \
///     --inputs prep_16s.tsv prep_18s.tsv \
///     --output master_prep.tsv
/// ```
#[derive(Parser, Debug)]
pub(crate) struct Merge {
    /// One or more prep files to merge.
    #[clap(long, short = 'i', required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Where to write the merged prep file.
    #[clap(long, short = 'o', required = true)]
    output: PathBuf,
}

impl Merge {
    /// Checks that every input file exists before any parsing starts.
    fn validate_inputs(&self) -> Result<()> {
        let mut constraint_errors = vec![];

        for input in &self.inputs {
            if !input.exists() {
                constraint_errors.push(format!("Provided input file {:#?} doesn't exist", input));
            }
        }

        if constraint_errors.is_empty() {
            Ok(())
        } else {
            let mut details = "Inputs failed validation!\n".to_owned();
            for error_reason in constraint_errors {
                details.push_str(&format!("    - {}\n", error_reason));
            }
            Err(anyhow!("The following errors with the input(s) were detected:\n{}", details))
        }
    }
}

impl Command for Merge {
    /// Executes the merge command.
    fn execute(&self) -> Result<()> {
        self.validate_inputs()?;

        let progress = ProgLogBuilder::new()
            .name("preptk")
            .noun("prep rows")
            .verb("Read")
            .unit(1_000)
            .count_formatter(CountFormatterKind::Comma)
            .level(log::Level::Info)
            .build();

        let mut sources = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let rows = parse_prep(input)?;
            for _ in &rows {
                progress.record();
            }
            sources.push(rows);
        }

        let merged = merge(&sources)?;
        write_prep(&self.output, &merged)?;
        info!(
            "Wrote {} merged rows from {} file(s) to {:?}",
            merged.len(),
            self.inputs.len(),
            self.output
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preptk_lib::assign::assign;
    use preptk_lib::barcodes::{BarcodeReference, EmpBarcode};
    use preptk_lib::layout::{PlateLayout, WellRecord};
    use preptk_lib::metadata::{PlateMetadata, PlateMetadataRow};
    use preptk_lib::plate::{SourceWell, Well};
    use preptk_lib::prep::{generate, AssayType, PrepFileRow};
    use tempfile::TempDir;

    fn prep_rows(sample_ids: &[&str]) -> Vec<PrepFileRow> {
        let records = sample_ids
            .iter()
            .enumerate()
            .map(|(i, &sample_id)| WellRecord {
                sample_id: sample_id.to_owned(),
                well: Well::new('A', 2 * i as u8 + 1),
                is_blank: false,
            })
            .collect();
        let layout = PlateLayout::from_records(records).unwrap();
        let metadata = PlateMetadata::validate(&[PlateMetadataRow {
            plate_position: "1".to_owned(),
            primer_plate_number: "1".to_owned(),
            sample_plate: "Plate_1".to_owned(),
            project_name: "Project_1".to_owned(),
            plating: "SF".to_owned(),
            extraction_kit_lot: "lot".to_owned(),
            extraction_robot: "robot".to_owned(),
            primer_date: "2021-08-17".to_owned(),
            mastermix_lot: "mm".to_owned(),
            water_lot: "wl".to_owned(),
            processing_robot: "Echo550".to_owned(),
            tm1000_8_tool: None,
            tm300_8_tool: None,
            tm50_8_tool: None,
        }])
        .unwrap();
        let reference = BarcodeReference::from_rows(
            (1..=12u8)
                .map(|col| {
                    (
                        1u8,
                        SourceWell::new('A', col),
                        EmpBarcode {
                            golay_barcode: "AGCCTTCGTCGC".to_owned(),
                            forward_primer_pad: "TATGGTAATT".to_owned(),
                            forward_primer_linker: "GT".to_owned(),
                            reverse_primer_pad: "AGTCAGCCAG".to_owned(),
                            reverse_primer_linker: "CC".to_owned(),
                        },
                    )
                })
                .collect(),
        );
        let joined = assign(&layout, &metadata, &reference).unwrap();
        generate(&joined, AssayType::SixteenS, None).unwrap()
    }

    fn prep_file(tempdir: &TempDir, name: &str, sample_ids: &[&str]) -> PathBuf {
        let path = tempdir.path().join(name);
        preptk_lib::prep::write_prep(&path, &prep_rows(sample_ids)).unwrap();
        path
    }

    // ############################################################################################
    // Test ``Merge::execute``
    // ############################################################################################
    #[test]
    fn test_merge_disjoint_prep_files() {
        let tempdir = TempDir::new().unwrap();
        let output = tempdir.path().join("master.tsv");
        let cmd = Merge {
            inputs: vec![
                prep_file(&tempdir, "first.tsv", &["sample.1", "sample.2", "sample.3"]),
                prep_file(&tempdir, "second.tsv", &["sample.4", "sample.5"]),
            ],
            output: output.clone(),
        };
        cmd.execute().unwrap();

        let merged = parse_prep(&output).unwrap();
        assert_eq!(merged.len(), 5);
        let names: Vec<&str> = merged.iter().map(|r| r.sample_name.as_str()).collect();
        assert_eq!(names, ["sample.1", "sample.2", "sample.3", "sample.4", "sample.5"]);
    }

    #[test]
    fn test_merge_fails_atomically_on_duplicates() {
        let tempdir = TempDir::new().unwrap();
        let output = tempdir.path().join("master.tsv");
        let cmd = Merge {
            inputs: vec![
                prep_file(&tempdir, "first.tsv", &["sample.1", "sample.2"]),
                prep_file(&tempdir, "second.tsv", &["sample.2", "sample.3"]),
            ],
            output: output.clone(),
        };
        let err = cmd.execute().unwrap_err();
        assert!(err.to_string().contains("duplicate sample identifier(s)"));
        assert!(err.to_string().contains("sample.2"));
        // no partial output is produced
        assert!(!output.exists());
    }

    #[test]
    fn test_merge_fails_on_schema_mismatch() {
        let tempdir = TempDir::new().unwrap();
        let truncated = tempdir.path().join("truncated.tsv");
        fgoxide::io::Io::default()
            .write_lines(&truncated, &["sample_name\tbarcode", "sample.9\tAGCCTTCGTCGC"])
            .unwrap();
        let cmd = Merge {
            inputs: vec![prep_file(&tempdir, "first.tsv", &["sample.1"]), truncated],
            output: tempdir.path().join("master.tsv"),
        };
        let err = cmd.execute().unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_merge_fails_on_missing_input() {
        let tempdir = TempDir::new().unwrap();
        let cmd = Merge {
            inputs: vec![tempdir.path().join("absent.tsv")],
            output: tempdir.path().join("master.tsv"),
        };
        let err = cmd.execute().unwrap_err();
        assert!(err.to_string().contains("Inputs failed validation!"));
    }
}
