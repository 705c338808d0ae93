use crate::error::{MatrixError, SolveError, SolveErrorKind};
use crate::matrix::Matrix;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Summary of a (possibly failed) solve.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutput {
    /// Name of the solver that produced this output.
    pub solver: &'static str,
    /// Number of updates made to the solution vector. Zero for direct solvers.
    pub num_iterations: usize,
    /// The last convergence measure computed by an iterative solver.
    pub convergence_measure: Option<f64>,
}

impl SolveOutput {
    pub(crate) fn new(solver: &'static str) -> Self {
        Self {
            solver,
            num_iterations: 0,
            convergence_measure: None,
        }
    }
}

/// Stopping parameters shared by the iterative solvers.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterativeSettings {
    /// The solve succeeds once the solver's convergence measure is at or below this value.
    pub tolerance: f64,
    /// The solve fails once this many iterations have been performed without convergence.
    pub max_iterations: usize,
}

impl Default for IterativeSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 1000,
        }
    }
}

/// A strategy for solving `A x = b`.
///
/// `solution` holds the initial guess on entry and the result on exit. On failure it holds
/// whatever iterate the solver last produced.
pub trait LinearSolver {
    fn name(&self) -> &'static str;

    fn solve(
        &mut self,
        matrix: &mut dyn Matrix,
        solution: &mut DVector<f64>,
        rhs: &DVector<f64>,
    ) -> Result<SolveOutput, SolveError>;
}

impl<S: ?Sized + LinearSolver> LinearSolver for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(
        &mut self,
        matrix: &mut dyn Matrix,
        solution: &mut DVector<f64>,
        rhs: &DVector<f64>,
    ) -> Result<SolveOutput, SolveError> {
        (**self).solve(matrix, solution, rhs)
    }
}

/// Checks that the matrix is ready to be solved and that the vectors match it.
pub(crate) fn check_system(
    output: &SolveOutput,
    matrix: &dyn Matrix,
    solution: &DVector<f64>,
    rhs: &DVector<f64>,
) -> Result<usize, SolveError> {
    let state = matrix.state();
    if !state.is_assembled() {
        return Err(SolveError::new(
            output.clone(),
            MatrixError::InvalidState {
                operation: "solve with",
                state,
            },
        ));
    }
    let n = matrix.num_equations();
    for len in [solution.len(), rhs.len()] {
        if len != n {
            return Err(SolveError::new(
                output.clone(),
                SolveErrorKind::Dimension { expected: n, actual: len },
            ));
        }
    }
    Ok(n)
}
