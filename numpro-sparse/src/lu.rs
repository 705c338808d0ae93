use crate::error::{SolveError, SolveErrorKind};
use crate::matrix::{check_dimension, Matrix, MatrixState};
use crate::solver::{check_system, LinearSolver, SolveOutput};
use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

/// Pivots with a magnitude below this value are treated as zero.
pub const SINGULAR_PIVOT_THRESHOLD: f64 = 1e-12;

/// Compact LU factorization `P A = L U` of a dense copy of a matrix.
///
/// The strictly lower triangle holds the multipliers of `L` (whose diagonal is implicitly one),
/// the upper triangle holds `U`.
#[derive(Debug, Clone)]
pub struct LuFactorization {
    lu: DMatrix<f64>,
    permutation: Vec<usize>,
    revision: u64,
}

impl LuFactorization {
    /// Factorizes the values currently stored in `matrix`, which is left untouched.
    pub fn factorize(matrix: &dyn Matrix) -> Result<Self, SolveErrorKind> {
        let n = matrix.num_equations();
        let mut lu = DMatrix::zeros(n, n);
        for i in 0..n {
            matrix.visit_row(i, &mut |j, a_ij| lu[(i, j)] = a_ij)?;
        }
        let mut permutation: Vec<usize> = (0..n).collect();

        for i in 0..n {
            let mut pivot_row = i;
            let mut largest = lu[(i, i)].abs();
            for row in i + 1..n {
                if lu[(row, i)].abs() > largest {
                    largest = lu[(row, i)].abs();
                    pivot_row = row;
                }
            }

            if pivot_row != i {
                trace!("Swapping rows {} and {}", i, pivot_row);
                lu.swap_rows(i, pivot_row);
                permutation.swap(i, pivot_row);
            }

            let pivot = lu[(i, i)];
            if pivot.abs() < SINGULAR_PIVOT_THRESHOLD {
                return Err(SolveErrorKind::SingularMatrix { pivot_index: i, pivot });
            }

            for row in i + 1..n {
                let multiplier = lu[(row, i)] / pivot;
                lu[(row, i)] = multiplier;
                for k in i + 1..n {
                    lu[(row, k)] -= multiplier * lu[(i, k)];
                }
            }
        }

        Ok(Self {
            lu,
            permutation,
            revision: matrix.revision(),
        })
    }

    /// Whether the factorization was computed from the current values of `matrix`.
    pub fn is_current_for(&self, matrix: &dyn Matrix) -> bool {
        self.revision == matrix.revision() && matrix.state() == MatrixState::Factorized
    }

    pub fn lu(&self) -> &DMatrix<f64> {
        &self.lu
    }

    /// `permutation[i]` is the original row that ended up in row `i`.
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Solves `A x = b` by forward and backward substitution, writing `x` into `solution`.
    pub fn solve_into(&self, solution: &mut DVector<f64>, rhs: &DVector<f64>) -> Result<(), SolveErrorKind> {
        let n = self.lu.nrows();
        check_dimension(n, solution.len())?;
        check_dimension(n, rhs.len())?;

        // L y = P b
        for i in 0..n {
            let mut sum = rhs[self.permutation[i]];
            for j in 0..i {
                sum -= self.lu[(i, j)] * solution[j];
            }
            solution[i] = sum;
        }

        // U x = y
        for i in (0..n).rev() {
            let mut sum = solution[i];
            for j in i + 1..n {
                sum -= self.lu[(i, j)] * solution[j];
            }
            solution[i] = sum / self.lu[(i, i)];
        }
        Ok(())
    }
}

/// Direct solver using LU decomposition with partial pivoting.
///
/// The factorization is kept between solves and reused as long as the matrix is marked
/// factorized and its values have not changed since.
#[derive(Debug, Clone, Default)]
pub struct LuSolver {
    factorization: Option<LuFactorization>,
}

impl LuSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factorization(&self) -> Option<&LuFactorization> {
        self.factorization.as_ref()
    }
}

impl LinearSolver for LuSolver {
    fn name(&self) -> &'static str {
        "LU"
    }

    fn solve(
        &mut self,
        matrix: &mut dyn Matrix,
        solution: &mut DVector<f64>,
        rhs: &DVector<f64>,
    ) -> Result<SolveOutput, SolveError> {
        let output = SolveOutput::new(self.name());
        check_system(&output, &*matrix, solution, rhs)?;

        let factorization = match self.factorization.take() {
            Some(cached) if cached.is_current_for(&*matrix) => cached,
            _ => {
                let factorization =
                    LuFactorization::factorize(&*matrix).map_err(|kind| SolveError::new(output.clone(), kind))?;
                matrix
                    .mark_factorized()
                    .map_err(|err| SolveError::new(output.clone(), err))?;
                debug!("LU factorized {} equations", matrix.num_equations());
                factorization
            }
        };

        let factorization = self.factorization.insert(factorization);
        factorization
            .solve_into(solution, rhs)
            .map_err(|kind| SolveError::new(output.clone(), kind))?;
        Ok(output)
    }
}
