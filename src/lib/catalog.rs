use ahash::HashSet as AHashSet;
use fgoxide::io::Io;
use itertools::Itertools;
use std::path::Path;

use crate::errors::PrepError;
use crate::prep::PrepFileRow;

/// A canonical catalog of sample names, used to cross-check generated prep
/// rows against the samples a study actually registered. Strictly additive
/// validation: the core never requires a catalog to operate.
pub trait SampleCatalog {
    /// Whether the catalog knows `sample_name`.
    fn contains(&self, sample_name: &str) -> bool;
}

/// A catalog backed by a plain text file with one sample name per line.
/// Blank lines are ignored.
#[derive(Clone, Debug)]
pub struct FileCatalog {
    names: AHashSet<String>,
}

impl FileCatalog {
    /// Loads a catalog file.
    ///
    /// # Errors
    /// - `Parse` if the file cannot be read.
    pub fn from_file<P: AsRef<Path>>(path: &P) -> Result<Self, PrepError> {
        let lines = Io::default().read_lines(path).map_err(|e| PrepError::parse_of(path, e))?;
        let names = lines
            .into_iter()
            .map(|line| line.trim().to_owned())
            .filter(|line| !line.is_empty())
            .collect();
        Ok(Self { names })
    }

    /// The number of names in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl SampleCatalog for FileCatalog {
    fn contains(&self, sample_name: &str) -> bool {
        self.names.contains(sample_name)
    }
}

/// The sample names in `rows` that the catalog does not know, sorted and
/// deduplicated for deterministic reporting.
pub fn missing_from_catalog<C: SampleCatalog>(catalog: &C, rows: &[PrepFileRow]) -> Vec<String> {
    rows.iter()
        .map(|row| row.sample_name.as_str())
        .filter(|name| !catalog.contains(name))
        .map(ToOwned::to_owned)
        .sorted()
        .dedup()
        .collect()
}
