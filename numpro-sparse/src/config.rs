//! Serializable selection of storage format and solver.
use crate::cg::ConjugateGradient;
use crate::dense::DenseMatrix;
use crate::gauss_seidel::GaussSeidel;
use crate::lu::LuSolver;
use crate::matrix::Matrix;
use crate::msr::MsrMatrix;
use crate::pattern::DiagonalStorage;
use crate::preconditioner::PreconditionerKind;
use crate::solver::{IterativeSettings, LinearSolver};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatrixFormat {
    Dense,
    #[default]
    Msr,
}

impl MatrixFormat {
    /// How the sparsity pattern must account for the diagonal to be accepted by this format.
    pub fn diagonal_storage(&self) -> DiagonalStorage {
        match self {
            Self::Dense => DiagonalStorage::Inline,
            Self::Msr => DiagonalStorage::Separate,
        }
    }

    /// A new, unallocated matrix of this format.
    pub fn build_matrix(&self) -> Box<dyn Matrix> {
        match self {
            Self::Dense => Box::new(DenseMatrix::new()),
            Self::Msr => Box::new(MsrMatrix::new()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum SolverKind {
    Lu,
    GaussSeidel(IterativeSettings),
    ConjugateGradient {
        #[serde(default)]
        settings: IterativeSettings,
        #[serde(default)]
        preconditioner: PreconditionerKind,
    },
}

impl Default for SolverKind {
    fn default() -> Self {
        Self::ConjugateGradient {
            settings: IterativeSettings::default(),
            preconditioner: PreconditionerKind::default(),
        }
    }
}

impl SolverKind {
    pub fn build(&self) -> Box<dyn LinearSolver> {
        match *self {
            Self::Lu => Box::new(LuSolver::new()),
            Self::GaussSeidel(settings) => Box::new(GaussSeidel::new(settings)),
            Self::ConjugateGradient {
                settings,
                preconditioner,
            } => Box::new(ConjugateGradient::with_preconditioner(settings, preconditioner)),
        }
    }
}

/// Chooses the matrix variant and the solving strategy.
///
/// Both are fixed once built; switching requires building new instances.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub format: MatrixFormat,
    pub solver: SolverKind,
}

impl SolverConfig {
    pub fn new(format: MatrixFormat, solver: SolverKind) -> Self {
        Self { format, solver }
    }

    pub fn build_matrix(&self) -> Box<dyn Matrix> {
        self.format.build_matrix()
    }

    pub fn build_solver(&self) -> Box<dyn LinearSolver> {
        self.solver.build()
    }
}
