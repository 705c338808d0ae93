use crate::error::SparsityPatternError;
use itertools::Itertools;
use std::fmt;

/// How the diagonal of each row is accounted for in a [`SparsityPattern`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DiagonalStorage {
    /// The diagonal lives in a dedicated per-row slot (MSR). Rows never reference
    /// themselves, and `nnz` reserves one entry per row.
    Separate,
    /// The diagonal is an ordinary entry of the row list, as in CSR.
    Inline,
}

/// The row-wise nonzero structure of a square system.
///
/// Every row holds a strictly ascending list of the equations it couples with. Rows are
/// stored contiguously with row offsets, in the same way CSR stores its column indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparsityPattern {
    row_offsets: Vec<usize>,
    column_indices: Vec<usize>,
    diagonal: DiagonalStorage,
}

impl SparsityPattern {
    /// A pattern with `num_equations` empty rows.
    pub fn empty(num_equations: usize, diagonal: DiagonalStorage) -> Self {
        Self {
            row_offsets: vec![0; num_equations + 1],
            column_indices: Vec::new(),
            diagonal,
        }
    }

    pub fn try_from_offsets_and_indices(
        row_offsets: Vec<usize>,
        column_indices: Vec<usize>,
        diagonal: DiagonalStorage,
    ) -> Result<Self, SparsityPatternError> {
        use SparsityPatternError::*;

        let offsets_valid = row_offsets.first() == Some(&0)
            && row_offsets.last() == Some(&column_indices.len())
            && row_offsets.iter().tuple_windows().all(|(prev, next)| prev <= next);
        if !offsets_valid {
            return Err(InvalidOffsets);
        }

        let num_equations = row_offsets.len() - 1;
        for (row, (&begin, &end)) in row_offsets.iter().tuple_windows().enumerate() {
            let columns = &column_indices[begin..end];
            if columns.iter().tuple_windows().any(|(prev, next)| prev >= next) {
                return Err(UnsortedOrDuplicateEntry { row });
            }
            if let Some(&col) = columns.iter().find(|&&col| col >= num_equations) {
                return Err(ColumnOutOfBounds { row, col });
            }
            if diagonal == DiagonalStorage::Separate && columns.binary_search(&row).is_ok() {
                return Err(SelfReference { row });
            }
        }

        Ok(Self {
            row_offsets,
            column_indices,
            diagonal,
        })
    }

    /// Builds a pattern from per-row neighbor lists.
    pub fn from_rows<Row>(
        rows: impl IntoIterator<Item = Row>,
        diagonal: DiagonalStorage,
    ) -> Result<Self, SparsityPatternError>
    where
        Row: AsRef<[usize]>,
    {
        let mut row_offsets = vec![0];
        let mut column_indices = Vec::new();
        for row in rows {
            column_indices.extend_from_slice(row.as_ref());
            row_offsets.push(column_indices.len());
        }
        Self::try_from_offsets_and_indices(row_offsets, column_indices, diagonal)
    }

    pub fn num_equations(&self) -> usize {
        self.row_offsets.len() - 1
    }

    pub fn diagonal_storage(&self) -> DiagonalStorage {
        self.diagonal
    }

    /// Number of stored entries, including the reserved diagonal slots when the diagonal
    /// is stored separately.
    pub fn nnz(&self) -> usize {
        match self.diagonal {
            DiagonalStorage::Separate => self.column_indices.len() + self.num_equations(),
            DiagonalStorage::Inline => self.column_indices.len(),
        }
    }

    /// Number of entries held in the row lists.
    pub fn num_row_entries(&self) -> usize {
        self.column_indices.len()
    }

    /// Number of entries that couple two different equations.
    pub fn num_off_diagonal(&self) -> usize {
        match self.diagonal {
            DiagonalStorage::Separate => self.column_indices.len(),
            DiagonalStorage::Inline => self
                .rows()
                .enumerate()
                .map(|(i, row)| row.iter().filter(|&&col| col != i).count())
                .sum(),
        }
    }

    pub fn row(&self, row: usize) -> Option<&[usize]> {
        let begin = *self.row_offsets.get(row)?;
        let end = *self.row_offsets.get(row + 1)?;
        Some(&self.column_indices[begin..end])
    }

    pub fn rows(&self) -> impl '_ + Iterator<Item = &[usize]> {
        self.row_offsets
            .iter()
            .tuple_windows()
            .map(move |(&begin, &end)| &self.column_indices[begin..end])
    }

    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    pub fn column_indices(&self) -> &[usize] {
        &self.column_indices
    }

    /// Whether `(row, col)` may hold a nonzero value.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        if row == col && self.diagonal == DiagonalStorage::Separate {
            return row < self.num_equations();
        }
        self.row(row)
            .map(|columns| columns.binary_search(&col).is_ok())
            .unwrap_or(false)
    }

    /// Converts into a general CSR pattern in which every row contains its diagonal.
    pub fn to_csr_pattern(&self) -> nalgebra_sparse::pattern::SparsityPattern {
        let n = self.num_equations();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut indices = Vec::with_capacity(self.column_indices.len() + n);
        offsets.push(0);
        for (i, row) in self.rows().enumerate() {
            let split = row.partition_point(|&col| col < i);
            indices.extend_from_slice(&row[..split]);
            if row.get(split) != Some(&i) {
                indices.push(i);
            }
            indices.extend_from_slice(&row[split..]);
            offsets.push(indices.len());
        }
        nalgebra_sparse::pattern::SparsityPattern::try_from_offsets_and_indices(n, n, offsets, indices)
            .expect("Rows are sorted and in bounds by construction")
    }
}

/// Renders the mask: `*` for a slot that may hold a value, `.` otherwise.
impl fmt::Display for SparsityPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.num_equations();
        for i in 0..n {
            for j in 0..n {
                let symbol = if self.contains(i, j) { '*' } else { '.' };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
