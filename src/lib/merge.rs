use itertools::Itertools;

use crate::errors::PrepError;
use crate::prep::PrepFileRow;

/// Consolidates prep-file rows from multiple sources into one table,
/// enforcing `sample_name` uniqueness across the entire merged set. Rows
/// are concatenated in source order and never mutated or dropped; a
/// duplicate key anywhere fails the whole merge, so no partial output can
/// exist.
///
/// # Errors
/// - `DuplicateIdentity` naming every `sample_name` that occurs more than
///   once across the sources.
pub fn merge(sources: &[Vec<PrepFileRow>]) -> Result<Vec<PrepFileRow>, PrepError> {
    let duplicates: Vec<String> = sources
        .iter()
        .flatten()
        .map(|row| row.sample_name.as_str())
        .duplicates()
        .map(ToOwned::to_owned)
        .sorted()
        .collect();
    if !duplicates.is_empty() {
        return Err(PrepError::DuplicateIdentity {
            context: "merged prep file".to_owned(),
            names: duplicates,
        });
    }
    Ok(sources.iter().flatten().cloned().collect())
}
