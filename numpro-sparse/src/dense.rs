use crate::error::MatrixError;
use crate::matrix::{check_dimension, check_index, Lifecycle, Matrix, MatrixState};
use crate::pattern::SparsityPattern;
use nalgebra::{DMatrix, DVector};
use std::fmt;

/// A matrix storing every entry in a flat two-dimensional array.
///
/// The structure passed to [`allocate`](Matrix::allocate) only determines the size, so any
/// slot accepts contributions.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    values: DMatrix<f64>,
    lifecycle: Lifecycle,
}

impl Default for DenseMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl DenseMatrix {
    /// An unallocated matrix.
    pub fn new() -> Self {
        Self {
            values: DMatrix::zeros(0, 0),
            lifecycle: Lifecycle::default(),
        }
    }

    /// A zeroed `num_equations x num_equations` matrix in the `Masked` state.
    pub fn with_size(num_equations: usize) -> Result<Self, MatrixError> {
        let mut matrix = Self::new();
        matrix.allocate_with_size(num_equations)?;
        Ok(matrix)
    }

    /// An assembled matrix with the given row-major values.
    pub fn from_row_slice(num_equations: usize, values: &[f64]) -> Result<Self, MatrixError> {
        check_dimension(num_equations * num_equations, values.len())?;
        let mut matrix = Self::with_size(num_equations)?;
        matrix.values = DMatrix::from_row_slice(num_equations, num_equations, values);
        matrix.lifecycle.mark_assembled()?;
        Ok(matrix)
    }

    pub fn allocate_with_size(&mut self, num_equations: usize) -> Result<(), MatrixError> {
        self.lifecycle.begin_allocation()?;
        if num_equations == 0 {
            return Err(MatrixError::Allocation {
                reason: "matrix must have at least one equation".to_string(),
            });
        }
        self.values = DMatrix::zeros(num_equations, num_equations);
        self.lifecycle.finish_allocation();
        Ok(())
    }

    pub fn as_dmatrix(&self) -> &DMatrix<f64> {
        &self.values
    }
}

impl Matrix for DenseMatrix {
    fn state(&self) -> MatrixState {
        self.lifecycle.state()
    }

    fn revision(&self) -> u64 {
        self.lifecycle.revision()
    }

    fn num_equations(&self) -> usize {
        self.values.nrows()
    }

    fn allocate(&mut self, pattern: &SparsityPattern) -> Result<(), MatrixError> {
        self.allocate_with_size(pattern.num_equations())
    }

    fn reset(&mut self) {
        self.values = DMatrix::zeros(0, 0);
        self.lifecycle.reset();
    }

    fn init(&mut self) -> Result<(), MatrixError> {
        self.lifecycle.require_allocated("initialize")?;
        self.values.fill(0.0);
        self.lifecycle.values_cleared();
        Ok(())
    }

    fn add_entry(&mut self, row: usize, col: usize, value: f64) -> Result<(), MatrixError> {
        self.lifecycle.require_allocated("add an entry to")?;
        check_index(row, col, self.num_equations())?;
        self.values[(row, col)] += value;
        self.lifecycle.values_changed();
        Ok(())
    }

    fn get_entry(&self, row: usize, col: usize) -> Result<f64, MatrixError> {
        self.lifecycle.require_allocated("read an entry of")?;
        check_index(row, col, self.num_equations())?;
        Ok(self.values[(row, col)])
    }

    fn visit_row(&self, row: usize, visitor: &mut dyn FnMut(usize, f64)) -> Result<(), MatrixError> {
        self.lifecycle.require_allocated("read a row of")?;
        check_index(row, row, self.num_equations())?;
        for (col, value) in self.values.row(row).iter().enumerate() {
            visitor(col, *value);
        }
        Ok(())
    }

    fn multiply_into(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), MatrixError> {
        self.lifecycle.require_allocated("multiply")?;
        check_dimension(self.num_equations(), x.len())?;
        check_dimension(self.num_equations(), y.len())?;
        y.gemv(1.0, &self.values, x, 0.0);
        Ok(())
    }

    fn mark_assembled(&mut self) -> Result<(), MatrixError> {
        self.lifecycle.mark_assembled()
    }

    fn mark_factorized(&mut self) -> Result<(), MatrixError> {
        self.lifecycle.mark_factorized()
    }
}

impl fmt::Display for DenseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.values.row_iter() {
            for value in row.iter() {
                write!(f, "{:16.8e}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
