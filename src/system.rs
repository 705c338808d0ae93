//! The assemble-and-solve pipeline.
use crate::assembly::{ElementMatrixAssembler, ElementVectorAssembler, GlobalAssembler};
use crate::connectivity::build_sparsity_pattern;
use crate::sparse::{LinearSolver, Matrix, SolveError, SolveOutput, SolverConfig, SparsityPattern};
use log::info;
use nalgebra::DVector;

/// A global system `A x = b` assembled from element contributions.
///
/// The matrix format and solver are chosen once from a [`SolverConfig`]. The sparsity pattern
/// is derived from the element connectivity with the diagonal storage the format requires.
pub struct LinearSystem {
    config: SolverConfig,
    pattern: SparsityPattern,
    matrix: Box<dyn Matrix>,
    rhs: DVector<f64>,
    solver: Box<dyn LinearSolver>,
    assembler: GlobalAssembler,
}

impl std::fmt::Debug for LinearSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearSystem")
            .field("config", &self.config)
            .field("num_equations", &self.num_equations())
            .field("nnz", &self.pattern.nnz())
            .field("state", &self.matrix.state())
            .finish()
    }
}

impl LinearSystem {
    /// Builds the pattern, allocates the matrix and assembles both matrix and right-hand side.
    pub fn assemble<A>(config: SolverConfig, element_assembler: &A) -> eyre::Result<Self>
    where
        A: ElementMatrixAssembler + ElementVectorAssembler,
    {
        let pattern = build_sparsity_pattern(element_assembler, config.format.diagonal_storage())?;
        let mut matrix = config.build_matrix();
        matrix.allocate(&pattern)?;

        let mut system = Self {
            config,
            rhs: DVector::zeros(pattern.num_equations()),
            pattern,
            matrix,
            solver: config.build_solver(),
            assembler: GlobalAssembler::default(),
        };
        system.assemble_values(element_assembler)?;
        info!(
            "Assembled system with {} equations and {} stored entries ({:?})",
            system.num_equations(),
            system.pattern.nnz(),
            system.config.format
        );
        Ok(system)
    }

    /// Discards the current values and assembles new ones with the same structure.
    ///
    /// The element assembler must have the same connectivity as the one the system was
    /// built from.
    pub fn reassemble<A>(&mut self, element_assembler: &A) -> eyre::Result<()>
    where
        A: ElementMatrixAssembler + ElementVectorAssembler,
    {
        self.matrix.init()?;
        self.rhs.fill(0.0);
        self.assemble_values(element_assembler)
    }

    fn assemble_values<A>(&mut self, element_assembler: &A) -> eyre::Result<()>
    where
        A: ElementMatrixAssembler + ElementVectorAssembler,
    {
        self.assembler
            .assemble_into(&mut *self.matrix, element_assembler)?;
        self.assembler
            .assemble_vector_into(&mut self.rhs, element_assembler)?;
        Ok(())
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn num_equations(&self) -> usize {
        self.matrix.num_equations()
    }

    pub fn pattern(&self) -> &SparsityPattern {
        &self.pattern
    }

    pub fn matrix(&self) -> &dyn Matrix {
        &*self.matrix
    }

    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    /// Solves from a zero initial guess.
    pub fn solve(&mut self) -> Result<(DVector<f64>, SolveOutput), SolveError> {
        let mut solution = DVector::zeros(self.num_equations());
        let output = self.solve_with_guess(&mut solution)?;
        Ok((solution, output))
    }

    /// Solves starting from `solution`, which receives the result (or the last iterate on failure).
    pub fn solve_with_guess(&mut self, solution: &mut DVector<f64>) -> Result<SolveOutput, SolveError> {
        self.solver
            .solve(&mut *self.matrix, solution, &self.rhs)
    }
}
