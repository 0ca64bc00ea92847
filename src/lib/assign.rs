use crate::barcodes::{BarcodeReference, EmpBarcode};
use crate::errors::PrepError;
use crate::layout::PlateLayout;
use crate::metadata::{PlateMetadata, PlateMetadataEntry};
use crate::plate::{SourceWell, Well};

/// A well record joined with its plate metadata and barcode assignment.
/// Built once per well per run and immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinedSampleRecord {
    /// The sample identifier from the layout.
    pub sample_id: String,
    /// The 384-well coordinate the sample occupies.
    pub well: Well,
    /// The quadrant-relative coordinate on the 96-well source plate.
    pub source_well: SourceWell,
    /// Carried through from the layout; blanks receive barcodes like any
    /// other well, since they are sequenced for contamination control.
    pub is_blank: bool,
    /// The metadata of the source plate the well was compressed from.
    pub metadata: PlateMetadataEntry,
    /// The barcode set arrayed at the well's primer plate position.
    pub barcode: EmpBarcode,
}

/// Joins every layout well against its plate metadata and barcode
/// assignment. A pure function of its inputs: identical layout, metadata,
/// and reference always produce identical records, in layout order.
///
/// Wells whose quadrant has no metadata entry are excluded from the result;
/// partial plate sets are a supported use case, not an error. A reference
/// miss for an included well aborts the whole batch instead, because a
/// partially barcoded run is unsafe to sequence.
///
/// # Errors
/// - `Lookup` if any included well has no entry in the barcode reference.
pub fn assign(
    layout: &PlateLayout,
    metadata: &PlateMetadata,
    reference: &BarcodeReference,
) -> Result<Vec<JoinedSampleRecord>, PrepError> {
    let mut records = Vec::with_capacity(layout.wells.len());
    for record in &layout.wells {
        let Some(entry) = metadata.entry(record.well.plate_position()) else {
            continue;
        };
        let source_well = record.well.source_well();
        let barcode = reference.lookup(entry.primer_plate_number, source_well).ok_or_else(|| {
            PrepError::Lookup {
                well: record.well.to_string(),
                primer_plate: entry.primer_plate_number,
                source_well: source_well.to_string(),
            }
        })?;
        records.push(JoinedSampleRecord {
            sample_id: record.sample_id.clone(),
            well: record.well,
            source_well,
            is_blank: record.is_blank,
            metadata: entry.clone(),
            barcode: barcode.clone(),
        });
    }
    Ok(records)
}
