use fgoxide::io::DelimFile;
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;

use crate::errors::PrepError;
use crate::is_missing_value;

/// The largest legal plate position: four 96-well source plates compose one
/// 384-well run.
const MAX_PLATE_POSITION: u8 = 4;
/// The largest primer plate number arrayed by the protocol.
const MAX_PRIMER_PLATE: u8 = 10;

/// One raw metadata row describing a physical source plate, with the column
/// names used by the plating sheets. Numeric fields stay as text here so
/// that domain violations surface as validation errors with row context
/// rather than as deserialization failures.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlateMetadataRow {
    /// The quadrant (1-4) this plate occupies on the compressed 384-well run.
    #[serde(rename = "Plate Position")]
    pub plate_position: String,
    /// Which pre-arrayed set of 96 barcodes was used for this plate.
    #[serde(rename = "Primer Plate #")]
    pub primer_plate_number: String,
    #[serde(rename = "Sample Plate")]
    pub sample_plate: String,
    #[serde(rename = "Project Name")]
    pub project_name: String,
    /// The operator who plated the samples.
    #[serde(rename = "Plating")]
    pub plating: String,
    #[serde(rename = "Extraction Kit Lot")]
    pub extraction_kit_lot: String,
    #[serde(rename = "Extraction Robot")]
    pub extraction_robot: String,
    #[serde(rename = "Primer Date")]
    pub primer_date: String,
    #[serde(rename = "MasterMix Lot")]
    pub mastermix_lot: String,
    #[serde(rename = "Water Lot")]
    pub water_lot: String,
    #[serde(rename = "Processing Robot")]
    pub processing_robot: String,
    #[serde(rename = "TM1000 8 Tool", default)]
    pub tm1000_8_tool: Option<String>,
    #[serde(rename = "TM300 8 Tool", default)]
    pub tm300_8_tool: Option<String>,
    #[serde(rename = "TM50 8 Tool", default)]
    pub tm50_8_tool: Option<String>,
}

/// Validated processing metadata for one physical 96-well source plate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlateMetadataEntry {
    pub plate_position: u8,
    pub primer_plate_number: u8,
    pub sample_plate: String,
    pub project_name: String,
    pub plating: String,
    pub extraction_kit_lot: String,
    pub extraction_robot: String,
    pub primer_date: String,
    pub mastermix_lot: String,
    pub water_lot: String,
    pub processing_robot: String,
    /// Tool identifiers are optional; `None` marks a value that was absent
    /// or recorded as the literal `NA`.
    pub tm1000_8_tool: Option<String>,
    pub tm300_8_tool: Option<String>,
    pub tm50_8_tool: Option<String>,
}

/// The validated metadata for a run: up to four entries indexed by plate
/// position. Immutable once built; unused positions simply contribute no
/// wells to the downstream join.
#[derive(Clone, Debug)]
pub struct PlateMetadata {
    entries: [Option<PlateMetadataEntry>; 4],
}

impl PlateMetadata {
    /// Validates and normalizes raw metadata rows: trims whitespace, coerces
    /// literal `NA` tool values to missing, checks required fields, checks
    /// numeric domains, and rejects duplicate plate positions. All rule
    /// violations across the batch are aggregated into a single error in a
    /// stable order.
    ///
    /// # Errors
    /// - `Validation` listing every violated rule.
    pub fn validate(rows: &[PlateMetadataRow]) -> Result<Self, PrepError> {
        let mut errors = Vec::new();
        let mut entries = Vec::with_capacity(rows.len());

        if rows.is_empty() {
            errors.push("at least one plate metadata entry is required".to_owned());
        }

        for (i, row) in rows.iter().enumerate() {
            let label = format!("entry {}", i + 1);
            let before = errors.len();
            let entry = PlateMetadataEntry {
                plate_position: parse_in_domain(
                    &mut errors,
                    &label,
                    "Plate Position",
                    &row.plate_position,
                    MAX_PLATE_POSITION,
                )
                .unwrap_or(0),
                primer_plate_number: parse_in_domain(
                    &mut errors,
                    &label,
                    "Primer Plate #",
                    &row.primer_plate_number,
                    MAX_PRIMER_PLATE,
                )
                .unwrap_or(0),
                sample_plate: required(&mut errors, &label, "Sample Plate", &row.sample_plate)
                    .unwrap_or_default(),
                project_name: required(&mut errors, &label, "Project Name", &row.project_name)
                    .unwrap_or_default(),
                plating: required(&mut errors, &label, "Plating", &row.plating)
                    .unwrap_or_default(),
                extraction_kit_lot: required(
                    &mut errors,
                    &label,
                    "Extraction Kit Lot",
                    &row.extraction_kit_lot,
                )
                .unwrap_or_default(),
                extraction_robot: required(
                    &mut errors,
                    &label,
                    "Extraction Robot",
                    &row.extraction_robot,
                )
                .unwrap_or_default(),
                primer_date: required(&mut errors, &label, "Primer Date", &row.primer_date)
                    .unwrap_or_default(),
                mastermix_lot: required(&mut errors, &label, "MasterMix Lot", &row.mastermix_lot)
                    .unwrap_or_default(),
                water_lot: required(&mut errors, &label, "Water Lot", &row.water_lot)
                    .unwrap_or_default(),
                processing_robot: required(
                    &mut errors,
                    &label,
                    "Processing Robot",
                    &row.processing_robot,
                )
                .unwrap_or_default(),
                tm1000_8_tool: optional(&row.tm1000_8_tool),
                tm300_8_tool: optional(&row.tm300_8_tool),
                tm50_8_tool: optional(&row.tm50_8_tool),
            };
            if errors.len() == before {
                entries.push(entry);
            }
        }

        if errors.is_empty() {
            Self::from_entries(entries)
        } else {
            errors.sort();
            Err(PrepError::Validation { errors })
        }
    }

    /// Indexes already-typed entries by plate position. The programmatic
    /// counterpart of [`Self::validate`]: positions must be in domain and
    /// distinct, since the downstream join cannot disambiguate two plates
    /// claiming the same quadrant.
    ///
    /// # Errors
    /// - `Validation` on an empty batch, an out-of-domain position, or a
    ///   position claimed by more than one entry.
    pub fn from_entries(entries: Vec<PlateMetadataEntry>) -> Result<Self, PrepError> {
        let mut errors = Vec::new();

        if entries.is_empty() {
            errors.push("at least one plate metadata entry is required".to_owned());
        }
        for entry in &entries {
            if entry.plate_position < 1 || entry.plate_position > MAX_PLATE_POSITION {
                errors.push(format!(
                    "plate position must be between 1 and {MAX_PLATE_POSITION}, got {}",
                    entry.plate_position
                ));
            }
        }
        for position in entries.iter().map(|e| e.plate_position).duplicates().sorted() {
            errors.push(format!("plate position {position} is claimed by more than one entry"));
        }

        if !errors.is_empty() {
            errors.sort();
            return Err(PrepError::Validation { errors });
        }

        let mut slots: [Option<PlateMetadataEntry>; 4] = [None, None, None, None];
        for entry in entries {
            let slot = usize::from(entry.plate_position - 1);
            slots[slot] = Some(entry);
        }
        Ok(Self { entries: slots })
    }

    /// Loads and validates metadata from a delimited file, one row per
    /// source plate.
    ///
    /// # Errors
    /// - `Parse` if the file cannot be read or a header column is missing.
    /// - `Validation` if the rows violate any metadata rule.
    pub fn from_file<P: AsRef<Path>>(path: &P, delimiter: u8) -> Result<Self, PrepError> {
        let rows: Vec<PlateMetadataRow> = DelimFile::default()
            .read(path, delimiter, false)
            .map_err(|e| PrepError::parse_of(path, e))?;
        Self::validate(&rows)
    }

    /// The entry for a plate position (1-4), if one was provided.
    #[must_use]
    pub fn entry(&self, plate_position: u8) -> Option<&PlateMetadataEntry> {
        match plate_position {
            1..=MAX_PLATE_POSITION => self.entries[usize::from(plate_position - 1)].as_ref(),
            _ => None,
        }
    }

    /// The number of populated plate positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the populated entries in plate-position order.
    pub fn iter(&self) -> impl Iterator<Item = &PlateMetadataEntry> {
        self.entries.iter().flatten()
    }
}

/// Trims a required field, recording an error when the value is missing.
fn required(errors: &mut Vec<String>, label: &str, field: &str, value: &str) -> Option<String> {
    let trimmed = value.trim();
    if is_missing_value(trimmed) {
        errors.push(format!("{label}: required field {field:?} is missing"));
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Trims an optional field, coercing absent, empty, and literal `NA` values
/// to the missing marker.
fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !is_missing_value(v))
        .map(ToOwned::to_owned)
}

/// Parses a numeric field that must fall in `1..=max`.
fn parse_in_domain(
    errors: &mut Vec<String>,
    label: &str,
    field: &str,
    value: &str,
    max: u8,
) -> Option<u8> {
    let trimmed = value.trim();
    match trimmed.parse::<u8>() {
        Ok(n) if (1..=max).contains(&n) => Some(n),
        Ok(n) => {
            errors.push(format!("{label}: {field} must be between 1 and {max}, got {n}"));
            None
        }
        Err(_) => {
            errors.push(format!("{label}: {field} value {trimmed:?} is not a number"));
            None
        }
    }
}
