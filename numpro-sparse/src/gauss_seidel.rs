use crate::error::{SolveError, SolveErrorKind};
use crate::matrix::Matrix;
use crate::solver::{check_system, IterativeSettings, LinearSolver, SolveOutput};
use log::{debug, info, warn};
use nalgebra::DVector;

/// Stationary Gauss-Seidel iteration.
///
/// Each sweep updates the unknowns in increasing order, using the already updated values for
/// lower-numbered unknowns. The convergence measure is the Euclidean norm of the change of
/// the solution over one sweep.
#[derive(Debug, Clone)]
pub struct GaussSeidel {
    settings: IterativeSettings,
    previous: DVector<f64>,
}

impl Default for GaussSeidel {
    fn default() -> Self {
        Self::new(IterativeSettings::default())
    }
}

impl GaussSeidel {
    pub fn new(settings: IterativeSettings) -> Self {
        Self {
            settings,
            previous: DVector::zeros(0),
        }
    }

    pub fn settings(&self) -> &IterativeSettings {
        &self.settings
    }

    /// Performs one sweep and returns the norm of the update.
    fn sweep(&mut self, matrix: &dyn Matrix, x: &mut DVector<f64>, b: &DVector<f64>) -> Result<f64, SolveErrorKind> {
        self.previous.copy_from(x);
        let previous = &self.previous;

        let mut update_norm_squared = 0.0;
        for i in 0..x.len() {
            let mut sum = b[i];
            let mut diagonal = 0.0;
            matrix.visit_row(i, &mut |j, a_ij| {
                if j < i {
                    sum -= a_ij * x[j];
                } else if j > i {
                    sum -= a_ij * previous[j];
                } else {
                    diagonal = a_ij;
                }
            })?;
            if diagonal == 0.0 {
                return Err(SolveErrorKind::ZeroDiagonal { row: i });
            }
            x[i] = sum / diagonal;
            let delta = previous[i] - x[i];
            update_norm_squared += delta * delta;
        }
        Ok(update_norm_squared.sqrt())
    }
}

impl LinearSolver for GaussSeidel {
    fn name(&self) -> &'static str {
        "Gauss-Seidel"
    }

    fn solve(
        &mut self,
        matrix: &mut dyn Matrix,
        solution: &mut DVector<f64>,
        rhs: &DVector<f64>,
    ) -> Result<SolveOutput, SolveError> {
        let mut output = SolveOutput::new(self.name());
        let n = check_system(&output, &*matrix, solution, rhs)?;
        self.previous.resize_vertically_mut(n, 0.0);

        let IterativeSettings {
            tolerance,
            max_iterations,
        } = self.settings;

        while output.num_iterations < max_iterations {
            let update_norm = self
                .sweep(&*matrix, solution, rhs)
                .map_err(|kind| SolveError::new(output.clone(), kind))?;
            output.num_iterations += 1;
            output.convergence_measure = Some(update_norm);
            debug!("Gauss-Seidel sweep {}: update norm {:e}", output.num_iterations, update_norm);

            if update_norm <= tolerance {
                info!(
                    "Gauss-Seidel converged in {} sweeps with tolerance {:e}",
                    output.num_iterations, tolerance
                );
                return Ok(output);
            }
        }

        warn!("Gauss-Seidel did not converge within {} sweeps", max_iterations);
        Err(SolveError::new(
            output,
            SolveErrorKind::MaxIterationsReached {
                max_iter: max_iterations,
            },
        ))
    }
}
