//! Error types shared by the matrix storage formats and the solvers.
use crate::matrix::MatrixState;
use crate::solver::SolveOutput;
use std::error::Error;
use std::fmt;

/// Errors raised by operations on a [`Matrix`](crate::Matrix).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MatrixError {
    /// The requested storage could not be set up from the given structure.
    Allocation { reason: String },
    /// An operand does not match the number of equations of the matrix.
    Dimension { expected: usize, actual: usize },
    /// The `(row, col)` slot is not part of the sparsity pattern.
    StructuralAccess { row: usize, col: usize },
    /// The `(row, col)` index lies outside the matrix.
    IndexOutOfBounds { row: usize, col: usize, num_equations: usize },
    /// The operation is not permitted in the current lifecycle state.
    InvalidState { operation: &'static str, state: MatrixState },
    /// A triangular substitution hit a zero on the diagonal.
    ZeroDiagonal { row: usize },
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { reason } => write!(f, "Failed to allocate matrix: {}", reason),
            Self::Dimension { expected, actual } => write!(
                f,
                "Dimension mismatch: matrix has {} equations, operand has length {}",
                expected, actual
            ),
            Self::StructuralAccess { row, col } => write!(
                f,
                "Entry ({}, {}) is not part of the sparsity pattern",
                row, col
            ),
            Self::IndexOutOfBounds { row, col, num_equations } => write!(
                f,
                "Index ({}, {}) out of bounds for matrix with {} equations",
                row, col, num_equations
            ),
            Self::InvalidState { operation, state } => {
                write!(f, "Cannot {} a matrix in state {:?}", operation, state)
            }
            Self::ZeroDiagonal { row } => write!(f, "Zero diagonal entry in row {}", row),
        }
    }
}

impl Error for MatrixError {}

/// Errors raised when a sparsity pattern violates the row contract.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SparsityPatternError {
    /// Offsets must have length `num_equations + 1`, start at zero, be non-decreasing
    /// and end at the number of column indices.
    InvalidOffsets,
    /// Row entries must be strictly ascending (which also rules out duplicates).
    UnsortedOrDuplicateEntry { row: usize },
    ColumnOutOfBounds { row: usize, col: usize },
    /// A row references itself although the diagonal is stored separately.
    SelfReference { row: usize },
}

impl fmt::Display for SparsityPatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOffsets => write!(f, "Invalid row offsets"),
            Self::UnsortedOrDuplicateEntry { row } => {
                write!(f, "Row {} is not strictly ascending", row)
            }
            Self::ColumnOutOfBounds { row, col } => {
                write!(f, "Column {} in row {} is out of bounds", col, row)
            }
            Self::SelfReference { row } => write!(
                f,
                "Row {} references its own diagonal, which is stored separately",
                row
            ),
        }
    }
}

impl Error for SparsityPatternError {}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SolveErrorKind {
    Matrix(MatrixError),
    /// Solution or right-hand side length does not match the matrix.
    Dimension { expected: usize, actual: usize },
    /// Direct factorization found a (near) zero pivot.
    SingularMatrix { pivot_index: usize, pivot: f64 },
    /// An iterative solver exhausted its iteration budget.
    MaxIterationsReached { max_iter: usize },
    IndefiniteOperator,
    IndefinitePreconditioner,
    /// A diagonal-based update or preconditioner encountered a zero diagonal entry.
    ZeroDiagonal { row: usize },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matrix(err) => {
                write!(f, "Matrix error: ")?;
                err.fmt(f)
            }
            Self::Dimension { expected, actual } => write!(
                f,
                "Vector of length {} does not match system with {} equations",
                actual, expected
            ),
            Self::SingularMatrix { pivot_index, pivot } => write!(
                f,
                "Matrix is singular: pivot {} has magnitude {:e}",
                pivot_index,
                pivot.abs()
            ),
            Self::MaxIterationsReached { max_iter } => {
                write!(f, "Max iterations ({}) reached.", max_iter)
            }
            Self::IndefiniteOperator => write!(f, "Operator appears to be indefinite"),
            Self::IndefinitePreconditioner => write!(f, "Indefinite preconditioner"),
            Self::ZeroDiagonal { row } => write!(f, "Zero diagonal entry in row {}", row),
        }
    }
}

impl From<MatrixError> for SolveErrorKind {
    fn from(err: MatrixError) -> Self {
        match err {
            MatrixError::ZeroDiagonal { row } => Self::ZeroDiagonal { row },
            MatrixError::Dimension { expected, actual } => Self::Dimension { expected, actual },
            other => Self::Matrix(other),
        }
    }
}

/// Failure of a linear solve.
///
/// The output gathered up to the point of failure is retained, and the solution vector
/// passed to the solver holds the last iterate.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct SolveError {
    pub output: SolveOutput,
    pub kind: SolveErrorKind,
}

impl SolveError {
    pub(crate) fn new(output: SolveOutput, kind: impl Into<SolveErrorKind>) -> Self {
        Self {
            output,
            kind: kind.into(),
        }
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} solve failed after {} iterations. ",
            self.output.solver, self.output.num_iterations
        )?;
        write!(f, "Error: {}", self.kind)
    }
}

impl Error for SolveError {}
