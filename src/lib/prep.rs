use fgoxide::io::DelimFile;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::path::Path;
use std::str::FromStr;

use crate::assign::JoinedSampleRecord;
use crate::barcodes::EmpBarcode;
use crate::errors::PrepError;

const PLATFORM: &str = "Illumina";
const CENTER_NAME: &str = "UCSDMI";
const RUN_CENTER: &str = "UCSDMI";
const SEQUENCING_METH: &str = "Sequencing by synthesis";

/// The amplicon sequencing assay a prep file is generated for. The assay
/// selects which primer sequence set applies and the constant prep-file
/// columns describing the library construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssayType {
    SixteenS,
    EighteenS,
    Its,
}

impl AssayType {
    /// The amplification primer appended to the pad and linker when building
    /// the per-well primer construct. 16S amplifies off the forward primer
    /// set; 18S and ITS amplify off the reverse set.
    fn amplification_primer(&self) -> &'static str {
        match self {
            Self::SixteenS => "GTGYCAGCMGCCGCGGTAA",
            Self::EighteenS => "TGATCCTTCTGCAGGTTCACCTAC",
            Self::Its => "GCTGCGTTCTTCATCGATGC",
        }
    }

    /// The `pcr_primers` column value: both primers of the amplification pair.
    #[must_use]
    pub fn pcr_primers(&self) -> &'static str {
        match self {
            Self::SixteenS => "FWD:GTGYCAGCMGCCGCGGTAA; REV:GGACTACNVGGGTWTCTAAT",
            Self::EighteenS => "FWD:GTACACACCGCCCGTC; REV:TGATCCTTCTGCAGGTTCACCTAC",
            Self::Its => "FWD:CTTGGTCATTTAGAGGAAGTAA; REV:GCTGCGTTCTTCATCGATGC",
        }
    }

    #[must_use]
    pub fn target_gene(&self) -> &'static str {
        match self {
            Self::SixteenS => "16S rRNA",
            Self::EighteenS => "18S rRNA",
            Self::Its => "ITS",
        }
    }

    #[must_use]
    pub fn target_subfragment(&self) -> &'static str {
        match self {
            Self::SixteenS => "V4",
            Self::EighteenS => "V9",
            Self::Its => "ITS_1_2",
        }
    }

    #[must_use]
    pub fn library_construction_protocol(&self) -> &'static str {
        match self {
            Self::SixteenS => "Illumina EMP protocol 515fbc, 806r amplification of 16S rRNA V4",
            Self::EighteenS => "Illumina EMP 18S rRNA 1391f EukBr",
            Self::Its => "Illumina  EMP protocol amplification of ITS1fbc, ITS2r",
        }
    }

    /// The linker of the primer set this assay amplifies off.
    fn linker<'a>(&self, barcode: &'a EmpBarcode) -> &'a str {
        match self {
            Self::SixteenS => &barcode.forward_primer_linker,
            Self::EighteenS | Self::Its => &barcode.reverse_primer_linker,
        }
    }

    /// The full per-well primer construct: pad, then linker, then the
    /// amplification primer.
    fn primer(&self, barcode: &EmpBarcode) -> String {
        let (pad, linker) = match self {
            Self::SixteenS => (&barcode.forward_primer_pad, &barcode.forward_primer_linker),
            Self::EighteenS | Self::Its => {
                (&barcode.reverse_primer_pad, &barcode.reverse_primer_linker)
            }
        };
        format!("{pad}{linker}{}", self.amplification_primer())
    }
}

impl Display for AssayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SixteenS => "16S",
            Self::EighteenS => "18S",
            Self::Its => "ITS",
        };
        write!(f, "{label}")
    }
}

impl FromStr for AssayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16S" => Ok(Self::SixteenS),
            "18S" => Ok(Self::EighteenS),
            "ITS" => Ok(Self::Its),
            other => Err(format!("unrecognized assay type {other:?} (expected 16S, 18S or ITS)")),
        }
    }
}

/// Run identity columns parsed from an Illumina run identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunInfo {
    /// The run identifier as given, e.g. `230213_M05314_0346_000000000-KVMGL`.
    pub run_id: String,
    /// The run date in `YYYY/MM/DD` form, taken from the identifier's
    /// leading date segment.
    pub run_date: String,
}

impl RunInfo {
    /// Parses a run identifier of the form `YYMMDD_machinename_...` or the
    /// iSeq-style `YYYYMMDD_machinename_...`.
    ///
    /// # Errors
    /// - `Validation` when the identifier does not match either format.
    pub fn parse(run_id: &str) -> Result<Self, PrepError> {
        let date_part = run_id.split('_').next().unwrap_or("");
        let has_machine_part = run_id.len() > date_part.len() + 1;
        let date_is_digits =
            !date_part.is_empty() && date_part.bytes().all(|b| b.is_ascii_digit());
        if !(date_is_digits && has_machine_part && (date_part.len() == 6 || date_part.len() == 8))
        {
            return Err(PrepError::Validation {
                errors: vec![format!(
                    "unrecognized run identifier format {run_id:?}; the expected format is \
                     either YYMMDD_machinename_XXXX_FC or YYYYMMDD_machinename_XXXX-XXXX"
                )],
            });
        }
        let run_date = if date_part.len() == 6 {
            format!("20{}/{}/{}", &date_part[0..2], &date_part[2..4], &date_part[4..6])
        } else {
            format!("{}/{}/{}", &date_part[0..4], &date_part[4..6], &date_part[6..8])
        };
        Ok(Self { run_id: run_id.to_owned(), run_date })
    }
}

/// One row of the prep-file schema consumed by the downstream pipeline.
/// Field order is the approved column order; `sample_name` is the first
/// column and the de facto primary key.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PrepFileRow {
    pub sample_name: String,
    pub barcode: String,
    pub primer: String,
    pub primer_plate: String,
    pub well_id: String,
    pub plating: String,
    pub extractionkit_lot: String,
    pub extraction_robot: String,
    pub tm1000_8_tool: String,
    pub primer_date: String,
    pub mastermix_lot: String,
    pub water_lot: String,
    pub processing_robot: String,
    pub tm300_8_tool: String,
    pub tm50_8_tool: String,
    pub sample_plate: String,
    pub project_name: String,
    pub orig_name: String,
    pub well_description: String,
    pub experiment_design_description: String,
    pub library_construction_protocol: String,
    pub linker: String,
    pub platform: String,
    pub run_center: String,
    pub run_date: String,
    pub run_prefix: String,
    pub pcr_primers: String,
    pub sequencing_meth: String,
    pub target_gene: String,
    pub target_subfragment: String,
    pub center_name: String,
    pub center_project_name: String,
    pub instrument_model: String,
    pub runid: String,
}

/// Rewrites a sample identifier so that every run of characters outside
/// `0-9`, `a-z`, `A-Z`, `.` and `-` becomes a single `.`, the normalization
/// the downstream pipeline expects for sample names.
#[must_use]
pub fn scrub_sample_name(name: &str) -> String {
    let mut scrubbed = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            scrubbed.push(c);
            in_run = false;
        } else if !in_run {
            scrubbed.push('.');
            in_run = true;
        }
    }
    scrubbed
}

/// Strips a trailing `_<digits>` study identifier from a project name, e.g.
/// `THDMI_10349` becomes `THDMI`. Returns the name unchanged when no study
/// identifier is appended.
#[must_use]
pub fn remove_study_id(project_name: &str) -> &str {
    match project_name.rsplit_once('_') {
        Some((name, id)) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => project_name,
    }
}

/// Maps joined sample records onto prep-file rows for one assay.
///
/// Sample names are scrubbed via [`scrub_sample_name`]; two distinct sample
/// identifiers are never allowed to collapse onto the same name, so the
/// returned rows are guaranteed unique on `sample_name`. Run identity
/// columns fill from `run` when provided and stay empty otherwise.
///
/// # Errors
/// - `DuplicateIdentity` if scrubbing would collapse two identifiers.
pub fn generate(
    records: &[JoinedSampleRecord],
    assay: AssayType,
    run: Option<&RunInfo>,
) -> Result<Vec<PrepFileRow>, PrepError> {
    let scrubbed: Vec<String> =
        records.iter().map(|r| scrub_sample_name(&r.sample_id)).collect();
    let collisions: Vec<String> = scrubbed.iter().duplicates().cloned().sorted().collect();
    if !collisions.is_empty() {
        return Err(PrepError::DuplicateIdentity {
            context: "generated prep file (sample ids collapse after normalization)".to_owned(),
            names: collisions,
        });
    }

    let rows = records
        .iter()
        .zip(scrubbed)
        .map(|(record, sample_name)| {
            let entry = &record.metadata;
            let well_id = record.well.to_string();
            PrepFileRow {
                barcode: record.barcode.golay_barcode.clone(),
                primer: assay.primer(&record.barcode),
                primer_plate: entry.primer_plate_number.to_string(),
                plating: entry.plating.clone(),
                extractionkit_lot: entry.extraction_kit_lot.clone(),
                extraction_robot: entry.extraction_robot.clone(),
                tm1000_8_tool: entry.tm1000_8_tool.clone().unwrap_or_default(),
                primer_date: entry.primer_date.clone(),
                mastermix_lot: entry.mastermix_lot.clone(),
                water_lot: entry.water_lot.clone(),
                processing_robot: entry.processing_robot.clone(),
                tm300_8_tool: entry.tm300_8_tool.clone().unwrap_or_default(),
                tm50_8_tool: entry.tm50_8_tool.clone().unwrap_or_default(),
                sample_plate: entry.sample_plate.clone(),
                project_name: entry.project_name.clone(),
                orig_name: record.sample_id.clone(),
                well_description: format!("{}.{}.{}", entry.sample_plate, sample_name, well_id),
                experiment_design_description: String::new(),
                library_construction_protocol: assay.library_construction_protocol().to_owned(),
                linker: assay.linker(&record.barcode).to_owned(),
                platform: PLATFORM.to_owned(),
                run_center: RUN_CENTER.to_owned(),
                run_date: run.map(|r| r.run_date.clone()).unwrap_or_default(),
                run_prefix: String::new(),
                pcr_primers: assay.pcr_primers().to_owned(),
                sequencing_meth: SEQUENCING_METH.to_owned(),
                target_gene: assay.target_gene().to_owned(),
                target_subfragment: assay.target_subfragment().to_owned(),
                center_name: CENTER_NAME.to_owned(),
                center_project_name: remove_study_id(&entry.project_name).to_owned(),
                instrument_model: String::new(),
                runid: run.map(|r| r.run_id.clone()).unwrap_or_default(),
                well_id,
                sample_name,
            }
        })
        .collect();
    Ok(rows)
}

/// Writes prep rows as tab-separated UTF-8 with `sample_name` as the first
/// column.
///
/// # Errors
/// - `Parse` if the file cannot be written.
pub fn write_prep<P: AsRef<Path>>(path: &P, rows: &[PrepFileRow]) -> Result<(), PrepError> {
    DelimFile::default().write_tsv(path, rows).map_err(|e| PrepError::parse_of(path, e))
}

/// Parses a previously persisted prep file, verifying that it carries the
/// full schema and that `sample_name` is unique within the file.
///
/// # Errors
/// - `Parse` if the file cannot be read or a schema column is missing.
/// - `DuplicateIdentity` if a `sample_name` occurs more than once.
pub fn parse_prep<P: AsRef<Path>>(path: &P) -> Result<Vec<PrepFileRow>, PrepError> {
    let rows: Vec<PrepFileRow> = DelimFile::default()
        .read(path, b'\t', false)
        .map_err(|e| PrepError::parse_of(path, e))?;
    let duplicates: Vec<String> = rows
        .iter()
        .map(|r| r.sample_name.as_str())
        .duplicates()
        .map(ToOwned::to_owned)
        .sorted()
        .collect();
    if duplicates.is_empty() {
        Ok(rows)
    } else {
        Err(PrepError::DuplicateIdentity {
            context: format!("prep file {}", path.as_ref().display()),
            names: duplicates,
        })
    }
}
