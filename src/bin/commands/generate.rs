use crate::commands::command::Command;
use anyhow::{anyhow, Result};
use clap::Parser;
use log::{info, warn};
use preptk_lib::assign::assign;
use preptk_lib::barcodes::BarcodeReference;
use preptk_lib::catalog::{missing_from_catalog, FileCatalog};
use preptk_lib::layout::PlateLayout;
use preptk_lib::metadata::PlateMetadata;
use preptk_lib::prep::{generate, write_prep, AssayType, RunInfo};
use std::path::{Path, PathBuf};

/// Generates an amplicon prep file from a plate layout.
///
/// Samples arrive on up to four 96-well source plates, compressed onto one
/// 384-well plate for sequencing. Each source plate occupies one quadrant of
/// the compressed grid (its *plate position*, 1-4) and was amplified with one
/// pre-arrayed primer plate carrying EMP Golay barcodes. Given the compressed
/// layout, one metadata row per source plate, and the barcode reference for
/// the assay, this tool joins every well against its plate metadata and
/// barcode assignment and writes the tab-separated prep file consumed by the
/// downstream sequence-processing pipeline.
///
/// The layout file needs the columns ``Sample``, ``Row``, ``Col`` and
/// ``Blank``; blanks are barcoded like any other well. Quadrants without a
/// metadata row simply contribute no wells, so partial plate sets are fine.
/// A well whose coordinate is missing from the barcode reference aborts the
/// whole run: a partially barcoded run must never reach the sequencer.
///
/// Layout, metadata, and reference files may be tab- or comma-separated;
/// files ending in `.csv` are read as comma-separated.
///
/// ## Example Command Line
///
/// ```
/// preptk generate \
///     --layout layout.tsv \
///     --metadata plates.tsv \
///     --barcodes emp_16s_barcodes.tsv \
///     --assay 16S \
///     --run-id 230213_M05314_0346_000000000-KVMGL \
///     --output prep.tsv
/// ```
#[derive(Parser, Debug)]
pub(crate) struct Generate {
    /// The plate layout file (`Sample`, `Row`, `Col`, `Blank` columns).
    #[clap(long, short = 'l', required = true)]
    layout: PathBuf,

    /// The plate metadata file, one row per physical source plate.
    #[clap(long, short = 'm', required = true)]
    metadata: PathBuf,

    /// The EMP barcode reference file for the assay.
    #[clap(long, short = 'b', required = true)]
    barcodes: PathBuf,

    /// The amplicon assay type: 16S, 18S or ITS.
    #[clap(long, short = 'a', required = true)]
    assay: AssayType,

    /// Where to write the prep file.
    #[clap(long, short = 'o', required = true)]
    output: PathBuf,

    /// The sequencing run identifier, used to fill the run identity columns.
    #[clap(long)]
    run_id: Option<String>,

    /// A catalog of registered sample names (one per line); generated rows
    /// missing from it are reported as warnings.
    #[clap(long)]
    catalog: Option<PathBuf>,
}

/// Picks the field delimiter from a file's extension: `.csv` reads as
/// comma-separated, everything else as tab-separated.
fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => b',',
        _ => b'\t',
    }
}

impl Generate {
    /// Checks that all provided input files exist before any parsing starts.
    fn validate_inputs(&self) -> Result<()> {
        let mut constraint_errors = vec![];

        let mut inputs = vec![&self.layout, &self.metadata, &self.barcodes];
        if let Some(catalog) = &self.catalog {
            inputs.push(catalog);
        }
        for input in inputs {
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

impl Command for Generate {
    /// Executes the generate command.
    fn execute(&self) -> Result<()> {
        self.validate_inputs()?;

        let run = self.run_id.as_deref().map(RunInfo::parse).transpose()?;
        let layout = PlateLayout::from_file(&self.layout, delimiter_for(&self.layout))?;
        info!("Loaded {} wells from {:?}", layout.wells.len(), self.layout);

        let metadata = PlateMetadata::from_file(&self.metadata, delimiter_for(&self.metadata))?;
        info!("Validated metadata for {} source plate(s)", metadata.len());

        let reference = BarcodeReference::from_file(&self.barcodes, delimiter_for(&self.barcodes))?;
        info!("Loaded {} barcode positions from {:?}", reference.len(), self.barcodes);

        let records = assign(&layout, &metadata, &reference)?;
        let rows = generate(&records, self.assay, run.as_ref())?;

        if let Some(catalog_path) = &self.catalog {
            let catalog = FileCatalog::from_file(catalog_path)?;
            for name in missing_from_catalog(&catalog, &rows) {
                warn!("Sample {} is not present in the catalog", name);
            }
        }

        write_prep(&self.output, &rows)?;
        info!("Wrote {} {} prep rows to {:?}", rows.len(), self.assay, self.output);
        Ok(())
    }
}
