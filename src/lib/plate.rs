use std::fmt::{self, Display};

/// A single well position on a 384-well compressed-format plate.
///
/// Rows run A-P top to bottom, columns 1-24 left to right. Four 96-well
/// source plates interleave onto this grid: the source plate a well belongs
/// to is determined by the parity of its row and column indices, per the
/// standard PCR-plate compression convention used by the physical protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Well {
    row: char,
    col: u8,
}

impl Well {
    /// Creates a 384-well coordinate.
    ///
    /// # Panics
    /// - Panics if `row` is outside `A..=P` or `col` is outside `1..=24`.
    #[must_use]
    pub fn new(row: char, col: u8) -> Self {
        assert!(
            Self::in_grid(row, col),
            "{row}{col} is not a 384-well coordinate (rows A-P, columns 1-24)"
        );
        Self { row, col }
    }

    /// Creates a 384-well coordinate, or `None` if it falls off the grid.
    #[must_use]
    pub fn try_new(row: char, col: u8) -> Option<Self> {
        if Self::in_grid(row, col) {
            Some(Self { row, col })
        } else {
            None
        }
    }

    fn in_grid(row: char, col: u8) -> bool {
        ('A'..='P').contains(&row) && (1..=24).contains(&col)
    }

    /// The well's row letter (A-P).
    #[must_use]
    pub fn row(&self) -> char {
        self.row
    }

    /// The well's column number (1-24).
    #[must_use]
    pub fn col(&self) -> u8 {
        self.col
    }

    /// Zero-based row index.
    fn row_index(&self) -> u8 {
        self.row as u8 - b'A'
    }

    /// Zero-based column index.
    fn col_index(&self) -> u8 {
        self.col - 1
    }

    /// The plate position (1-4) of the source plate this well was compressed
    /// from: odd row and odd column land on plate 1 (top-left quadrant), odd
    /// row and even column on plate 2, even row and odd column on plate 3,
    /// and even row and even column on plate 4.
    #[must_use]
    pub fn plate_position(&self) -> u8 {
        1 + 2 * (self.row_index() % 2) + self.col_index() % 2
    }

    /// The quadrant-relative 96-well coordinate, i.e. the position this well
    /// occupied on its source plate. Inverse of the compression map.
    #[must_use]
    pub fn source_well(&self) -> SourceWell {
        SourceWell {
            row: (b'A' + self.row_index() / 2) as char,
            col: self.col_index() / 2 + 1,
        }
    }
}

impl Display for Well {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.col)
    }
}

/// A well position on a 96-well source plate (rows A-H, columns 1-12), used
/// as the coordinate half of a barcode reference lookup key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceWell {
    row: char,
    col: u8,
}

impl SourceWell {
    /// Creates a 96-well coordinate.
    ///
    /// # Panics
    /// - Panics if `row` is outside `A..=H` or `col` is outside `1..=12`.
    #[must_use]
    pub fn new(row: char, col: u8) -> Self {
        assert!(
            Self::in_grid(row, col),
            "{row}{col} is not a 96-well coordinate (rows A-H, columns 1-12)"
        );
        Self { row, col }
    }

    /// Creates a 96-well coordinate, or `None` if it falls off the grid.
    #[must_use]
    pub fn try_new(row: char, col: u8) -> Option<Self> {
        if Self::in_grid(row, col) {
            Some(Self { row, col })
        } else {
            None
        }
    }

    /// Parses a well label such as `A1` or `H12`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        let mut chars = label.chars();
        let row = chars.next()?;
        let col = chars.as_str().parse::<u8>().ok()?;
        Self::try_new(row, col)
    }

    fn in_grid(row: char, col: u8) -> bool {
        ('A'..='H').contains(&row) && (1..=12).contains(&col)
    }

    /// The well's row letter (A-H).
    #[must_use]
    pub fn row(&self) -> char {
        self.row
    }

    /// The well's column number (1-12).
    #[must_use]
    pub fn col(&self) -> u8 {
        self.col
    }
}

impl Display for SourceWell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rstest::rstest;

    /// All 384 wells, row-major.
    fn all_wells() -> Vec<Well> {
        ('A'..='P').cartesian_product(1..=24).map(|(row, col)| Well::new(row, col)).collect()
    }

    // ############################################################################################
    // Test the quadrant partition exhaustively over the whole grid
    // ############################################################################################
    #[test]
    fn test_each_plate_position_claims_exactly_96_wells() {
        let wells = all_wells();
        assert_eq!(wells.len(), 384);
        for position in 1..=4u8 {
            let count = wells.iter().filter(|w| w.plate_position() == position).count();
            assert_eq!(count, 96, "plate position {position}");
        }
    }

    #[test]
    fn test_compression_is_a_bijection_per_plate_position() {
        // every (plate position, source well) pair must appear exactly once
        let keys: Vec<(u8, SourceWell)> =
            all_wells().iter().map(|w| (w.plate_position(), w.source_well())).collect();
        assert_eq!(keys.len(), 384);
        assert!(keys.iter().all_unique());
    }

    #[test]
    fn test_source_wells_stay_on_the_96_well_grid() {
        for well in all_wells() {
            let source = well.source_well();
            assert!(('A'..='H').contains(&source.row()), "{well}");
            assert!((1..=12).contains(&source.col()), "{well}");
        }
    }

    // ############################################################################################
    // Test specific corners of the interleave
    // ############################################################################################
    #[rstest]
    #[case('A', 1, 1, "A1")]
    #[case('A', 2, 2, "A1")]
    #[case('B', 1, 3, "A1")]
    #[case('B', 2, 4, "A1")]
    #[case('A', 24, 2, "A12")]
    #[case('P', 1, 3, "H1")]
    #[case('P', 24, 4, "H12")]
    #[case('H', 12, 4, "D6")]
    #[case('C', 5, 1, "B3")]
    fn test_interleave_corners(
        #[case] row: char,
        #[case] col: u8,
        #[case] expected_position: u8,
        #[case] expected_source: &str,
    ) {
        let well = Well::new(row, col);
        assert_eq!(well.plate_position(), expected_position);
        assert_eq!(well.source_well().to_string(), expected_source);
    }

    // ############################################################################################
    // Test constructors and label parsing
    // ############################################################################################
    #[test]
    #[should_panic(expected = "is not a 384-well coordinate")]
    fn test_well_new_rejects_row_off_grid() {
        let _well = Well::new('Q', 1);
    }

    #[test]
    #[should_panic(expected = "is not a 384-well coordinate")]
    fn test_well_new_rejects_column_off_grid() {
        let _well = Well::new('A', 25);
    }

    #[test]
    fn test_well_try_new() {
        assert_eq!(Well::try_new('A', 1), Some(Well::new('A', 1)));
        assert_eq!(Well::try_new('A', 0), None);
        assert_eq!(Well::try_new('q', 1), None);
    }

    #[rstest]
    #[case("A1", Some(('A', 1)))]
    #[case(" H12 ", Some(('H', 12)))]
    #[case("I1", None)]
    #[case("A13", None)]
    #[case("A0", None)]
    #[case("A", None)]
    #[case("12", None)]
    #[case("", None)]
    fn test_source_well_from_label(#[case] label: &str, #[case] expected: Option<(char, u8)>) {
        let expected = expected.map(|(row, col)| SourceWell::new(row, col));
        assert_eq!(SourceWell::from_label(label), expected);
    }

    #[test]
    fn test_well_display() {
        assert_eq!(Well::new('A', 1).to_string(), "A1");
        assert_eq!(Well::new('P', 24).to_string(), "P24");
        assert_eq!(SourceWell::new('H', 12).to_string(), "H12");
    }
}
