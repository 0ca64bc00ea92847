use ahash::HashMap as AHashMap;
use ahash::HashMapExt;
use fgoxide::io::DelimFile;
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;

use crate::errors::PrepError;
use crate::is_valid_base;
use crate::plate::SourceWell;

/// One EMP Golay barcode and the primer pad/linker sequences arrayed with it
/// on a primer plate well.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmpBarcode {
    pub golay_barcode: String,
    pub forward_primer_pad: String,
    pub forward_primer_linker: String,
    pub reverse_primer_pad: String,
    pub reverse_primer_linker: String,
}

/// One data row of a barcode reference file.
#[derive(Clone, Debug, Deserialize)]
struct ReferenceRow {
    #[serde(rename = "Primer Plate #")]
    primer_plate: u8,
    #[serde(rename = "Well")]
    well: String,
    #[serde(rename = "Golay Barcode")]
    golay_barcode: String,
    #[serde(rename = "Forward Primer Pad")]
    forward_primer_pad: String,
    #[serde(rename = "Forward Primer Linker")]
    forward_primer_linker: String,
    #[serde(rename = "Reverse Primer Pad")]
    reverse_primer_pad: String,
    #[serde(rename = "Reverse Primer Linker")]
    reverse_primer_linker: String,
}

/// The static EMP barcode reference: a read-only lookup from
/// `(primer plate number, quadrant-relative well)` to the barcode set
/// physically arrayed at that position. One reference exists per assay type;
/// the assignment engine receives it as an explicit dependency.
#[derive(Clone, Debug)]
pub struct BarcodeReference {
    barcodes: AHashMap<(u8, SourceWell), EmpBarcode>,
}

impl BarcodeReference {
    /// Builds a reference from `(primer plate, source well, barcode)` rows.
    ///
    /// # Panics
    /// - Panics if two rows share a `(primer plate, source well)` key.
    #[must_use]
    pub fn from_rows(rows: Vec<(u8, SourceWell, EmpBarcode)>) -> Self {
        let mut barcodes = AHashMap::with_capacity(rows.len());
        for (plate, well, barcode) in rows {
            let previous = barcodes.insert((plate, well), barcode);
            assert!(previous.is_none(), "primer plate {plate} well {well} is defined twice");
        }
        Self { barcodes }
    }

    /// Loads a reference from a delimited file with the header
    /// `Primer Plate #, Well, Golay Barcode, Forward Primer Pad,
    /// Forward Primer Linker, Reverse Primer Pad, Reverse Primer Linker`.
    ///
    /// # Errors
    /// - `Parse` if the file cannot be read, a well label is not a 96-well
    ///   coordinate, a Golay barcode is not a plain DNA sequence, or the
    ///   same `(primer plate, well)` key is defined twice.
    pub fn from_file<P: AsRef<Path>>(path: &P, delimiter: u8) -> Result<Self, PrepError> {
        let raw: Vec<ReferenceRow> = DelimFile::default()
            .read(path, delimiter, false)
            .map_err(|e| PrepError::parse_of(path, e))?;

        let mut rows = Vec::with_capacity(raw.len());
        for row in raw {
            let well = SourceWell::from_label(&row.well).ok_or_else(|| PrepError::Parse {
                path: path.as_ref().to_path_buf(),
                message: format!("{:?} is not a 96-well coordinate (rows A-H, columns 1-12)", row.well),
            })?;
            let golay_barcode = row.golay_barcode.trim().to_owned();
            if golay_barcode.is_empty() || !golay_barcode.bytes().all(is_valid_base) {
                return Err(PrepError::Parse {
                    path: path.as_ref().to_path_buf(),
                    message: format!(
                        "golay barcode {:?} for primer plate {} well {} is not a DNA sequence",
                        row.golay_barcode, row.primer_plate, well
                    ),
                });
            }
            rows.push((
                row.primer_plate,
                well,
                EmpBarcode {
                    golay_barcode,
                    forward_primer_pad: row.forward_primer_pad.trim().to_owned(),
                    forward_primer_linker: row.forward_primer_linker.trim().to_owned(),
                    reverse_primer_pad: row.reverse_primer_pad.trim().to_owned(),
                    reverse_primer_linker: row.reverse_primer_linker.trim().to_owned(),
                },
            ));
        }

        let duplicates: Vec<String> = rows
            .iter()
            .map(|(plate, well, _)| (*plate, *well))
            .duplicates()
            .map(|(plate, well)| format!("primer plate {plate} well {well}"))
            .sorted()
            .collect();
        if !duplicates.is_empty() {
            return Err(PrepError::Parse {
                path: path.as_ref().to_path_buf(),
                message: format!("duplicate barcode definitions: {}", duplicates.join(", ")),
            });
        }

        Ok(Self::from_rows(rows))
    }

    /// Looks up the barcode set for a primer plate and quadrant-relative
    /// well. `None` means the reference does not define that position.
    #[must_use]
    pub fn lookup(&self, primer_plate: u8, well: SourceWell) -> Option<&EmpBarcode> {
        self.barcodes.get(&(primer_plate, well))
    }

    /// The number of barcode positions the reference defines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.barcodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.barcodes.is_empty()
    }
}
