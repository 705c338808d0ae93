use crate::error::SolveErrorKind;
use crate::matrix::Matrix;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Preconditioners available to [`ConjugateGradient`](crate::cg::ConjugateGradient).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PreconditionerKind {
    /// No preconditioning, `h = r`.
    Identity,
    /// Diagonal scaling, `h_i = r_i / a_ii`.
    #[default]
    Jacobi,
    /// `h = (D - F)^-1 D (D - E)^-1 r`, where `D - E` and `D - F` are the lower and upper
    /// triangles of the matrix. Symmetric whenever the matrix is.
    SymmetricGaussSeidel,
}

/// Applies `h = M^-1 r` for an approximation `M` of the system matrix.
pub trait Preconditioner {
    /// Called once at the start of every solve, before any call to `apply`.
    fn prepare(&mut self, _matrix: &dyn Matrix) -> Result<(), SolveErrorKind> {
        Ok(())
    }

    fn apply(&self, matrix: &dyn Matrix, h: &mut DVector<f64>, r: &DVector<f64>) -> Result<(), SolveErrorKind>;
}

#[derive(Debug, Copy, Clone, Default)]
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, _matrix: &dyn Matrix, h: &mut DVector<f64>, r: &DVector<f64>) -> Result<(), SolveErrorKind> {
        h.copy_from(r);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    inverse_diagonal: DVector<f64>,
}

impl Default for JacobiPreconditioner {
    fn default() -> Self {
        Self { inverse_diagonal: DVector::zeros(0) }
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn prepare(&mut self, matrix: &dyn Matrix) -> Result<(), SolveErrorKind> {
        let diagonal = matrix.diagonal()?;
        if let Some(row) = diagonal.iter().position(|d| *d == 0.0) {
            return Err(SolveErrorKind::ZeroDiagonal { row });
        }
        self.inverse_diagonal = diagonal.map(|d| d.recip());
        Ok(())
    }

    fn apply(&self, _matrix: &dyn Matrix, h: &mut DVector<f64>, r: &DVector<f64>) -> Result<(), SolveErrorKind> {
        h.copy_from(r);
        h.component_mul_assign(&self.inverse_diagonal);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SymmetricGaussSeidelPreconditioner {
    diagonal: DVector<f64>,
}

impl Default for SymmetricGaussSeidelPreconditioner {
    fn default() -> Self {
        Self { diagonal: DVector::zeros(0) }
    }
}

impl Preconditioner for SymmetricGaussSeidelPreconditioner {
    fn prepare(&mut self, matrix: &dyn Matrix) -> Result<(), SolveErrorKind> {
        self.diagonal = matrix.diagonal()?;
        Ok(())
    }

    fn apply(&self, matrix: &dyn Matrix, h: &mut DVector<f64>, r: &DVector<f64>) -> Result<(), SolveErrorKind> {
        // (D - E) g = r
        let mut g = matrix.forward_substitution(r)?;
        // f = D g
        g.component_mul_assign(&self.diagonal);
        // (D - F) h = f
        let result = matrix.backward_substitution(&g)?;
        h.copy_from(&result);
        Ok(())
    }
}

impl PreconditionerKind {
    pub fn build(&self) -> Box<dyn Preconditioner> {
        match self {
            Self::Identity => Box::new(IdentityPreconditioner),
            Self::Jacobi => Box::new(JacobiPreconditioner::default()),
            Self::SymmetricGaussSeidel => Box::new(SymmetricGaussSeidelPreconditioner::default()),
        }
    }
}
