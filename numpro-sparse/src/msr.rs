//! Modified Sparse Row storage.
//!
//! For `n` equations and `nnz` stored entries (off-diagonals plus one diagonal slot per row),
//! two arrays of length `nnz + 1` hold the matrix:
//!
//! ```text
//! index: [ p_0, p_1, ..., p_{n-1}, nnz + 1 | col, col, ..., col ]
//! value: [ a_00, a_11, ..., a_{n-1,n-1}, - | off-diagonal values   ]
//! ```
//!
//! `index[i]..index[i + 1]` is the range of row `i` in the tail block, which starts at
//! `n + 1`. `index[n] == nnz + 1` terminates the last row and its value slot is unused.
//! Within a row, columns are strictly ascending.
use crate::error::MatrixError;
use crate::matrix::{check_dimension, check_index, Lifecycle, Matrix, MatrixState};
use crate::pattern::{DiagonalStorage, SparsityPattern};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct MsrMatrix {
    num_equations: usize,
    nnz: usize,
    index: Vec<usize>,
    value: Vec<f64>,
    lifecycle: Lifecycle,
}

impl Default for MsrMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl MsrMatrix {
    /// An unallocated matrix.
    pub fn new() -> Self {
        Self {
            num_equations: 0,
            nnz: 0,
            index: Vec::new(),
            value: Vec::new(),
            lifecycle: Lifecycle::default(),
        }
    }

    /// A zeroed matrix with the given structure, in the `Masked` state.
    pub fn from_pattern(pattern: &SparsityPattern) -> Result<Self, MatrixError> {
        let mut matrix = Self::new();
        matrix.allocate(pattern)?;
        Ok(matrix)
    }

    /// Number of stored entries, counting every diagonal slot.
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// The combined row pointer and column index array.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Diagonal values followed by the packed off-diagonal values.
    pub fn values(&self) -> &[f64] {
        &self.value
    }

    fn off_diagonal_range(&self, row: usize) -> Range<usize> {
        self.index[row]..self.index[row + 1]
    }

    /// Position in the value array holding the off-diagonal `(row, col)`, if stored.
    fn find_off_diagonal(&self, row: usize, col: usize) -> Option<usize> {
        let range = self.off_diagonal_range(row);
        let begin = range.start;
        self.index[range]
            .binary_search(&col)
            .ok()
            .map(|local| begin + local)
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.num_equations;
        let mut dense = DMatrix::zeros(n, n);
        for i in 0..n {
            dense[(i, i)] = self.value[i];
            for k in self.off_diagonal_range(i) {
                dense[(i, self.index[k])] = self.value[k];
            }
        }
        dense
    }

    /// Converts to CSR. Every row of the result stores its diagonal.
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let n = self.num_equations;
        let mut offsets = Vec::with_capacity(n + 1);
        let mut columns = Vec::with_capacity(self.nnz);
        let mut values = Vec::with_capacity(self.nnz);
        offsets.push(0);
        for i in 0..n {
            let mut diagonal_pending = true;
            for k in self.off_diagonal_range(i) {
                let j = self.index[k];
                if diagonal_pending && j > i {
                    columns.push(i);
                    values.push(self.value[i]);
                    diagonal_pending = false;
                }
                columns.push(j);
                values.push(self.value[k]);
            }
            if diagonal_pending {
                columns.push(i);
                values.push(self.value[i]);
            }
            offsets.push(columns.len());
        }
        CsrMatrix::try_from_csr_data(n, n, offsets, columns, values)
            .expect("MSR rows are sorted and in bounds by construction")
    }
}

impl Matrix for MsrMatrix {
    fn state(&self) -> MatrixState {
        self.lifecycle.state()
    }

    fn revision(&self) -> u64 {
        self.lifecycle.revision()
    }

    fn num_equations(&self) -> usize {
        self.num_equations
    }

    fn allocate(&mut self, pattern: &SparsityPattern) -> Result<(), MatrixError> {
        self.lifecycle.begin_allocation()?;
        let n = pattern.num_equations();
        if n == 0 {
            return Err(MatrixError::Allocation {
                reason: "matrix must have at least one equation".to_string(),
            });
        }
        if pattern.diagonal_storage() != DiagonalStorage::Separate {
            return Err(MatrixError::Allocation {
                reason: "MSR storage requires a pattern with separately stored diagonal".to_string(),
            });
        }

        let nnz = pattern.nnz();
        let mut index = vec![0; nnz + 1];
        index[n] = nnz + 1;
        let mut counter = n + 1;
        for (i, row) in pattern.rows().enumerate() {
            index[i] = counter;
            for &col in row {
                index[counter] = col;
                counter += 1;
            }
        }
        if counter != nnz + 1 {
            return Err(MatrixError::Allocation {
                reason: format!(
                    "pattern reports {} entries but its rows fill {}",
                    nnz,
                    counter - 1
                ),
            });
        }

        self.num_equations = n;
        self.nnz = nnz;
        self.index = index;
        self.value = vec![0.0; nnz + 1];
        self.lifecycle.finish_allocation();
        Ok(())
    }

    fn reset(&mut self) {
        self.num_equations = 0;
        self.nnz = 0;
        self.index = Vec::new();
        self.value = Vec::new();
        self.lifecycle.reset();
    }

    fn init(&mut self) -> Result<(), MatrixError> {
        self.lifecycle.require_allocated("initialize")?;
        self.value.fill(0.0);
        self.lifecycle.values_cleared();
        Ok(())
    }

    fn add_entry(&mut self, row: usize, col: usize, value: f64) -> Result<(), MatrixError> {
        self.lifecycle.require_allocated("add an entry to")?;
        check_index(row, col, self.num_equations)?;
        let position = if row == col {
            row
        } else {
            self.find_off_diagonal(row, col)
                .ok_or(MatrixError::StructuralAccess { row, col })?
        };
        self.value[position] += value;
        self.lifecycle.values_changed();
        Ok(())
    }

    fn get_entry(&self, row: usize, col: usize) -> Result<f64, MatrixError> {
        self.lifecycle.require_allocated("read an entry of")?;
        check_index(row, col, self.num_equations)?;
        if row == col {
            return Ok(self.value[row]);
        }
        Ok(self
            .find_off_diagonal(row, col)
            .map(|position| self.value[position])
            .unwrap_or(0.0))
    }

    fn visit_row(&self, row: usize, visitor: &mut dyn FnMut(usize, f64)) -> Result<(), MatrixError> {
        self.lifecycle.require_allocated("read a row of")?;
        check_index(row, row, self.num_equations)?;
        let mut diagonal_pending = true;
        for k in self.off_diagonal_range(row) {
            let col = self.index[k];
            if diagonal_pending && col > row {
                visitor(row, self.value[row]);
                diagonal_pending = false;
            }
            visitor(col, self.value[k]);
        }
        if diagonal_pending {
            visitor(row, self.value[row]);
        }
        Ok(())
    }

    fn multiply_into(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), MatrixError> {
        self.lifecycle.require_allocated("multiply")?;
        check_dimension(self.num_equations, x.len())?;
        check_dimension(self.num_equations, y.len())?;
        for i in 0..self.num_equations {
            let mut sum = self.value[i] * x[i];
            for k in self.off_diagonal_range(i) {
                sum += self.value[k] * x[self.index[k]];
            }
            y[i] = sum;
        }
        Ok(())
    }

    fn mark_assembled(&mut self) -> Result<(), MatrixError> {
        self.lifecycle.mark_assembled()
    }

    fn mark_factorized(&mut self) -> Result<(), MatrixError> {
        self.lifecycle.mark_factorized()
    }
}

/// Prints the raw `(index, value)` arrays.
impl fmt::Display for MsrMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.index.iter().zip(&self.value) {
            writeln!(f, "{:6}  {:16.8e}", index, value)?;
        }
        Ok(())
    }
}
