use std::fmt::Display;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the prep-file core. Every variant aborts the operation
/// that raised it; all of them are deterministic input defects, so callers
/// should correct the input and re-run rather than retry.
#[derive(Error, Debug)]
pub enum PrepError {
    /// One or more plate metadata entries violated a validation rule.
    #[error("plate metadata failed validation:\n{}", format_rules(.errors))]
    Validation {
        /// The individual rule violations, in a stable order.
        errors: Vec<String>,
    },

    /// A well mapped to a coordinate with no entry in the barcode reference.
    /// Fatal for the whole assignment batch, since a partially barcoded run
    /// would produce sequenceable-but-wrong reads.
    #[error("well {well}: no barcode for primer plate {primer_plate} well {source_well}")]
    Lookup {
        /// The 384-well coordinate that could not be assigned.
        well: String,
        /// The primer plate number the well's metadata entry selected.
        primer_plate: u8,
        /// The quadrant-relative 96-well coordinate used as the lookup key.
        source_well: String,
    },

    /// A sample identifier occurred more than once where uniqueness is
    /// required (within a layout, a generated prep file, or across a merge).
    #[error("duplicate sample identifier(s) in {context}: {}", .names.join(", "))]
    DuplicateIdentity {
        /// Where the duplicates were found.
        context: String,
        /// The offending identifiers, sorted and deduplicated.
        names: Vec<String>,
    },

    /// An input file could not be parsed into the expected records.
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

impl PrepError {
    /// Wraps a file-level read or deserialization failure with its path.
    pub(crate) fn parse_of<P: AsRef<Path>, E: Display>(path: &P, err: E) -> Self {
        Self::Parse { path: path.as_ref().to_path_buf(), message: err.to_string() }
    }
}

fn format_rules(errors: &[String]) -> String {
    errors.iter().map(|e| format!("    - {e}")).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_lists_each_rule() {
        let err = PrepError::Validation {
            errors: vec!["first rule".to_owned(), "second rule".to_owned()],
        };
        let formatted = format!("{err}");
        assert!(formatted.contains("    - first rule\n"));
        assert!(formatted.contains("    - second rule"));
    }

    #[test]
    fn test_duplicate_identity_display_names_offenders() {
        let err = PrepError::DuplicateIdentity {
            context: "merged prep file".to_owned(),
            names: vec!["sample.1".to_owned(), "sample.2".to_owned()],
        };
        assert_eq!(
            format!("{err}"),
            "duplicate sample identifier(s) in merged prep file: sample.1, sample.2"
        );
    }
}
