//! Matrix storage formats and linear solvers for assembled systems.
//!
//! A [`Matrix`] is allocated from a [`SparsityPattern`], filled by accumulating contributions
//! with [`Matrix::add_entry`] and handed to a [`LinearSolver`]. Both the dense and the
//! Modified Sparse Row formats implement the same interface, so every solver works with
//! either.

pub mod cg;
pub mod config;
pub mod dense;
pub mod error;
pub mod gauss_seidel;
pub mod lu;
pub mod matrix;
pub mod msr;
pub mod pattern;
pub mod preconditioner;
pub mod solver;

pub use cg::{CgWorkspace, ConjugateGradient};
pub use config::{MatrixFormat, SolverConfig, SolverKind};
pub use dense::DenseMatrix;
pub use error::{MatrixError, SolveError, SolveErrorKind, SparsityPatternError};
pub use gauss_seidel::GaussSeidel;
pub use lu::{LuFactorization, LuSolver, SINGULAR_PIVOT_THRESHOLD};
pub use matrix::{Matrix, MatrixState};
pub use msr::MsrMatrix;
pub use pattern::{DiagonalStorage, SparsityPattern};
pub use preconditioner::{Preconditioner, PreconditionerKind};
pub use solver::{IterativeSettings, LinearSolver, SolveOutput};

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
