use crate::error::MatrixError;
use crate::pattern::SparsityPattern;
use nalgebra::DVector;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle of a [`Matrix`].
///
/// ```text
/// Unallocated --allocate--> Masked --mark_assembled--> Assembled --mark_factorized--> Factorized
///      ^                                                                                  |
///      +------------------------------------- reset -------------------------------------+
/// ```
///
/// Changing values of a factorized matrix moves it back to `Assembled`, and `init` moves any
/// allocated matrix back to `Masked`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MatrixState {
    Unallocated,
    Masked,
    Assembled,
    Factorized,
}

impl MatrixState {
    pub fn is_allocated(&self) -> bool {
        *self != MatrixState::Unallocated
    }

    /// Whether the values are complete and may be handed to a solver.
    pub fn is_assembled(&self) -> bool {
        matches!(self, MatrixState::Assembled | MatrixState::Factorized)
    }
}

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// State bookkeeping shared by all storage formats.
///
/// The revision is unique across all matrices in the process and changes with every change
/// of values, so a solver that caches data derived from a matrix can detect that the values
/// it was computed from are gone. A clone starts out with a revision of its own.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: MatrixState,
    revision: u64,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            state: MatrixState::Unallocated,
            revision: next_revision(),
        }
    }
}

impl Clone for Lifecycle {
    fn clone(&self) -> Self {
        Self {
            state: self.state,
            revision: next_revision(),
        }
    }
}

impl Lifecycle {
    pub fn state(&self) -> MatrixState {
        self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn require_allocated(&self, operation: &'static str) -> Result<(), MatrixError> {
        if self.state.is_allocated() {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    pub fn begin_allocation(&self) -> Result<(), MatrixError> {
        if self.state == MatrixState::Unallocated {
            Ok(())
        } else {
            Err(self.invalid("allocate"))
        }
    }

    pub fn finish_allocation(&mut self) {
        self.state = MatrixState::Masked;
        self.revision = next_revision();
    }

    pub fn reset(&mut self) {
        self.state = MatrixState::Unallocated;
        self.revision = next_revision();
    }

    pub fn values_cleared(&mut self) {
        self.state = MatrixState::Masked;
        self.revision = next_revision();
    }

    pub fn values_changed(&mut self) {
        if self.state == MatrixState::Factorized {
            self.state = MatrixState::Assembled;
        }
        self.revision = next_revision();
    }

    pub fn mark_assembled(&mut self) -> Result<(), MatrixError> {
        self.require_allocated("mark as assembled")?;
        if self.state == MatrixState::Masked {
            self.state = MatrixState::Assembled;
        }
        Ok(())
    }

    pub fn mark_factorized(&mut self) -> Result<(), MatrixError> {
        if self.state.is_assembled() {
            self.state = MatrixState::Factorized;
            Ok(())
        } else {
            Err(self.invalid("mark as factorized"))
        }
    }

    fn invalid(&self, operation: &'static str) -> MatrixError {
        MatrixError::InvalidState {
            operation,
            state: self.state,
        }
    }
}

/// Capability interface over the global system matrix.
///
/// Values are only ever accumulated, so that repeated contributions from different elements
/// to the same slot sum up. Where a value may live is fixed by the structure handed to
/// [`allocate`](Matrix::allocate).
pub trait Matrix {
    fn state(&self) -> MatrixState;

    /// Identifies the current values of the matrix. See [`MatrixState`].
    fn revision(&self) -> u64;

    /// Number of equations (rows and columns). Zero when unallocated.
    fn num_equations(&self) -> usize;

    /// Reserves storage for the given structure and zeroes all values.
    fn allocate(&mut self, pattern: &SparsityPattern) -> Result<(), MatrixError>;

    /// Releases all storage. Safe to call in any state.
    fn reset(&mut self);

    /// Zeroes all stored values while keeping the structure.
    fn init(&mut self) -> Result<(), MatrixError>;

    /// Accumulates `value` into the `(row, col)` slot.
    fn add_entry(&mut self, row: usize, col: usize, value: f64) -> Result<(), MatrixError>;

    /// Current value at `(row, col)`, zero for slots outside the structure.
    fn get_entry(&self, row: usize, col: usize) -> Result<f64, MatrixError>;

    /// Calls `visitor(col, value)` for every stored entry of the row, diagonal included.
    ///
    /// Columns are visited in ascending order.
    fn visit_row(&self, row: usize, visitor: &mut dyn FnMut(usize, f64)) -> Result<(), MatrixError>;

    /// `y = A x`
    fn multiply_into(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), MatrixError>;

    fn mark_assembled(&mut self) -> Result<(), MatrixError>;

    fn mark_factorized(&mut self) -> Result<(), MatrixError>;

    /// Returns `A x`.
    fn multiply(&self, x: &DVector<f64>) -> Result<DVector<f64>, MatrixError> {
        let mut y = DVector::zeros(self.num_equations());
        self.multiply_into(&mut y, x)?;
        Ok(y)
    }

    fn diagonal(&self) -> Result<DVector<f64>, MatrixError> {
        let n = self.num_equations();
        let mut diagonal = DVector::zeros(n);
        for i in 0..n {
            diagonal[i] = self.get_entry(i, i)?;
        }
        Ok(diagonal)
    }

    /// Solves `L y = b`, where `L` is the lower triangle of the matrix including the diagonal.
    fn forward_substitution(&self, b: &DVector<f64>) -> Result<DVector<f64>, MatrixError> {
        check_dimension(self.num_equations(), b.len())?;
        let mut y = DVector::zeros(b.len());
        for i in 0..b.len() {
            let mut sum = b[i];
            let mut diagonal = 0.0;
            self.visit_row(i, &mut |j, a_ij| {
                if j < i {
                    sum -= a_ij * y[j];
                } else if j == i {
                    diagonal = a_ij;
                }
            })?;
            if diagonal == 0.0 {
                return Err(MatrixError::ZeroDiagonal { row: i });
            }
            y[i] = sum / diagonal;
        }
        Ok(y)
    }

    /// Solves `U y = b`, where `U` is the upper triangle of the matrix including the diagonal.
    fn backward_substitution(&self, b: &DVector<f64>) -> Result<DVector<f64>, MatrixError> {
        check_dimension(self.num_equations(), b.len())?;
        let mut y = DVector::zeros(b.len());
        for i in (0..b.len()).rev() {
            let mut sum = b[i];
            let mut diagonal = 0.0;
            self.visit_row(i, &mut |j, a_ij| {
                if j > i {
                    sum -= a_ij * y[j];
                } else if j == i {
                    diagonal = a_ij;
                }
            })?;
            if diagonal == 0.0 {
                return Err(MatrixError::ZeroDiagonal { row: i });
            }
            y[i] = sum / diagonal;
        }
        Ok(y)
    }
}

pub(crate) fn check_dimension(expected: usize, actual: usize) -> Result<(), MatrixError> {
    if expected == actual {
        Ok(())
    } else {
        Err(MatrixError::Dimension { expected, actual })
    }
}

pub(crate) fn check_index(row: usize, col: usize, num_equations: usize) -> Result<(), MatrixError> {
    if row < num_equations && col < num_equations {
        Ok(())
    } else {
        Err(MatrixError::IndexOutOfBounds {
            row,
            col,
            num_equations,
        })
    }
}
