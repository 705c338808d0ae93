use crate::error::{SolveError, SolveErrorKind};
use crate::matrix::Matrix;
use crate::preconditioner::{Preconditioner, PreconditionerKind};
use crate::solver::{check_system, IterativeSettings, LinearSolver, SolveOutput};
use log::{debug, info, warn};
use nalgebra::DVector;

#[derive(Debug, Clone)]
pub struct CgWorkspace {
    r: DVector<f64>,
    h: DVector<f64>,
    p: DVector<f64>,
    q: DVector<f64>,
}

struct Buffers<'a> {
    r: &'a mut DVector<f64>,
    h: &'a mut DVector<f64>,
    p: &'a mut DVector<f64>,
    q: &'a mut DVector<f64>,
}

impl Default for CgWorkspace {
    fn default() -> Self {
        Self {
            r: DVector::zeros(0),
            h: DVector::zeros(0),
            p: DVector::zeros(0),
            q: DVector::zeros(0),
        }
    }
}

impl CgWorkspace {
    fn prepare_buffers(&mut self, dim: usize) -> Buffers {
        self.r.resize_vertically_mut(dim, 0.0);
        self.h.resize_vertically_mut(dim, 0.0);
        self.p.resize_vertically_mut(dim, 0.0);
        self.q.resize_vertically_mut(dim, 0.0);
        Buffers {
            r: &mut self.r,
            h: &mut self.h,
            p: &mut self.p,
            q: &mut self.q,
        }
    }
}

/// Preconditioned Conjugate Gradient for symmetric positive definite systems.
///
/// With `h = M^-1 r` the preconditioned residual, the convergence measure is `sqrt(r . h)`,
/// checked before every iteration. Positive definiteness is not verified up front, but a
/// breakdown of the recurrence is reported as
/// [`IndefiniteOperator`](SolveErrorKind::IndefiniteOperator) or
/// [`IndefinitePreconditioner`](SolveErrorKind::IndefinitePreconditioner).
pub struct ConjugateGradient {
    settings: IterativeSettings,
    preconditioner_kind: PreconditionerKind,
    preconditioner: Box<dyn Preconditioner>,
    workspace: CgWorkspace,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self::new(IterativeSettings::default())
    }
}

impl std::fmt::Debug for ConjugateGradient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConjugateGradient")
            .field("settings", &self.settings)
            .field("preconditioner", &self.preconditioner_kind)
            .finish()
    }
}

impl ConjugateGradient {
    /// Jacobi-preconditioned CG.
    pub fn new(settings: IterativeSettings) -> Self {
        Self::with_preconditioner(settings, PreconditionerKind::default())
    }

    pub fn with_preconditioner(settings: IterativeSettings, preconditioner: PreconditionerKind) -> Self {
        Self {
            settings,
            preconditioner_kind: preconditioner,
            preconditioner: preconditioner.build(),
            workspace: CgWorkspace::default(),
        }
    }

    pub fn settings(&self) -> &IterativeSettings {
        &self.settings
    }

    pub fn preconditioner(&self) -> PreconditionerKind {
        self.preconditioner_kind
    }

    fn solve_(
        &mut self,
        output: &mut SolveOutput,
        a: &dyn Matrix,
        x: &mut DVector<f64>,
        b: &DVector<f64>,
    ) -> Result<(), SolveErrorKind> {
        let IterativeSettings {
            tolerance,
            max_iterations,
        } = self.settings;
        let preconditioner = &mut self.preconditioner;
        preconditioner.prepare(a)?;

        let Buffers { r, h, p, q } = self.workspace.prepare_buffers(x.len());

        // r = b - Ax
        a.multiply_into(r, x)?;
        r.zip_apply(b, |r_i, b_i| *r_i = b_i - *r_i);

        // h = M^-1 r
        preconditioner.apply(a, h, r)?;

        // p = h
        p.copy_from(h);

        let mut rho = r.dot(h);

        loop {
            if rho < 0.0 {
                return Err(SolveErrorKind::IndefinitePreconditioner);
            }
            let measure = rho.sqrt();
            output.convergence_measure = Some(measure);
            debug!("CG iteration {}: sqrt(rho) = {:e}", output.num_iterations, measure);

            if measure <= tolerance {
                return Ok(());
            } else if output.num_iterations >= max_iterations {
                return Err(SolveErrorKind::MaxIterationsReached {
                    max_iter: max_iterations,
                });
            }

            // q = A p
            a.multiply_into(q, p)?;
            let p_dot_q = p.dot(q);
            if p_dot_q <= 0.0 {
                return Err(SolveErrorKind::IndefiniteOperator);
            }

            let alpha = rho / p_dot_q;
            // x <- x + alpha * p
            x.axpy(alpha, p, 1.0);
            // r <- r - alpha * q
            r.axpy(-alpha, q, 1.0);

            // Number of iterations corresponds to number of updates to the x vector
            output.num_iterations += 1;

            // h <- M^-1 r
            preconditioner.apply(a, h, r)?;
            let rho_next = r.dot(h);
            let beta = rho_next / rho;

            // p <- h + beta * p
            p.axpy(1.0, h, beta);

            rho = rho_next;
        }
    }
}

impl LinearSolver for ConjugateGradient {
    fn name(&self) -> &'static str {
        "CG"
    }

    fn solve(
        &mut self,
        matrix: &mut dyn Matrix,
        solution: &mut DVector<f64>,
        rhs: &DVector<f64>,
    ) -> Result<SolveOutput, SolveError> {
        let mut output = SolveOutput::new(self.name());
        check_system(&output, &*matrix, solution, rhs)?;

        match self.solve_(&mut output, &*matrix, solution, rhs) {
            Ok(()) => {
                info!(
                    "CG ({:?}) converged in {} iterations with tolerance {:e}",
                    self.preconditioner_kind, output.num_iterations, self.settings.tolerance
                );
                Ok(output)
            }
            Err(kind) => {
                if let SolveErrorKind::MaxIterationsReached { max_iter } = kind {
                    warn!("CG did not converge within {} iterations", max_iter);
                }
                Err(SolveError::new(output, kind))
            }
        }
    }
}
