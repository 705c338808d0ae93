//! Scattering of element contributions into the global system.
use crate::connectivity::{Dof, DofConnectivity, DofTopology};
use crate::sparse::Matrix;
use eyre::eyre;
use log::debug;
use nalgebra::{DMatrix, DVector};
use std::cell::RefCell;

pub trait ElementMatrixAssembler: DofConnectivity {
    /// Writes the dense matrix of the element into `output`.
    ///
    /// `output` is zeroed and sized to the number of local dofs of the element.
    fn assemble_element_matrix_into(&self, element: usize, output: &mut DMatrix<f64>) -> eyre::Result<()>;
}

pub trait ElementVectorAssembler: DofConnectivity {
    /// Writes the load vector of the element into `output`.
    ///
    /// `output` is zeroed and sized to the number of local dofs of the element.
    fn assemble_element_vector_into(&self, element: usize, output: &mut DVector<f64>) -> eyre::Result<()>;
}

/// Precomputed element matrices, and optionally load vectors, over a [`DofTopology`].
#[derive(Debug, Clone)]
pub struct ElementMatrices {
    topology: DofTopology,
    matrices: Vec<DMatrix<f64>>,
    load_vectors: Option<Vec<DVector<f64>>>,
}

impl ElementMatrices {
    /// Pairs every element of the topology with its matrix.
    ///
    /// Each matrix must be square with one row per local dof of its element.
    pub fn new(topology: DofTopology, matrices: Vec<DMatrix<f64>>) -> eyre::Result<Self> {
        if matrices.len() != topology.num_elements() {
            return Err(eyre!(
                "Expected {} element matrices, got {}",
                topology.num_elements(),
                matrices.len()
            ));
        }
        for (element, matrix) in matrices.iter().enumerate() {
            let n = topology.element_dofs(element).len();
            if matrix.shape() != (n, n) {
                return Err(eyre!(
                    "Element {} has {} dofs, but its matrix has shape {:?}",
                    element,
                    n,
                    matrix.shape()
                ));
            }
        }
        Ok(Self {
            topology,
            matrices,
            load_vectors: None,
        })
    }

    /// Attaches a load vector to every element.
    pub fn with_load_vectors(self, load_vectors: Vec<DVector<f64>>) -> eyre::Result<Self> {
        if load_vectors.len() != self.topology.num_elements() {
            return Err(eyre!(
                "Expected {} element load vectors, got {}",
                self.topology.num_elements(),
                load_vectors.len()
            ));
        }
        for (element, vector) in load_vectors.iter().enumerate() {
            let n = self.topology.element_dofs(element).len();
            if vector.len() != n {
                return Err(eyre!(
                    "Element {} has {} dofs, but its load vector has length {}",
                    element,
                    n,
                    vector.len()
                ));
            }
        }
        Ok(Self {
            load_vectors: Some(load_vectors),
            ..self
        })
    }

    pub fn topology(&self) -> &DofTopology {
        &self.topology
    }

    pub fn element_matrix(&self, element: usize) -> &DMatrix<f64> {
        &self.matrices[element]
    }
}

impl DofConnectivity for ElementMatrices {
    fn num_equations(&self) -> usize {
        self.topology.num_equations()
    }

    fn num_elements(&self) -> usize {
        self.topology.num_elements()
    }

    fn element_dofs(&self, element: usize) -> &[Dof] {
        self.topology.element_dofs(element)
    }

    fn adjacent_elements(&self, equation: usize) -> &[usize] {
        self.topology.adjacent_elements(equation)
    }
}

impl ElementMatrixAssembler for ElementMatrices {
    fn assemble_element_matrix_into(&self, element: usize, output: &mut DMatrix<f64>) -> eyre::Result<()> {
        let matrix = self
            .matrices
            .get(element)
            .ok_or_else(|| eyre!("Element index {} out of bounds", element))?;
        output.copy_from(matrix);
        Ok(())
    }
}

/// Elements without load vectors contribute nothing.
impl ElementVectorAssembler for ElementMatrices {
    fn assemble_element_vector_into(&self, element: usize, output: &mut DVector<f64>) -> eyre::Result<()> {
        if let Some(load_vectors) = &self.load_vectors {
            let vector = load_vectors
                .get(element)
                .ok_or_else(|| eyre!("Element index {} out of bounds", element))?;
            output.copy_from(vector);
        }
        Ok(())
    }
}

/// Accumulates element matrices and vectors into global storage.
#[derive(Debug, Clone, Default)]
pub struct GlobalAssembler {
    // Buffers reused across elements and calls
    workspace: RefCell<GlobalAssemblerWorkspace>,
}

#[derive(Debug, Clone)]
struct GlobalAssemblerWorkspace {
    element_matrix: DMatrix<f64>,
    element_vector: DVector<f64>,
}

impl Default for GlobalAssemblerWorkspace {
    fn default() -> Self {
        Self {
            element_matrix: DMatrix::zeros(0, 0),
            element_vector: DVector::zeros(0),
        }
    }
}

impl GlobalAssembler {
    /// Adds every element matrix to `matrix` and marks it assembled.
    ///
    /// Entry `(a, b)` of the matrix of an element lands at `(i, j)`, where `i` and `j` are
    /// the equations of its local dofs `a` and `b`. Rows and columns of excluded dofs are
    /// skipped. Contributions are added to the values already present.
    pub fn assemble_into(
        &self,
        matrix: &mut dyn Matrix,
        element_assembler: &dyn ElementMatrixAssembler,
    ) -> eyre::Result<()> {
        if matrix.num_equations() != element_assembler.num_equations() {
            return Err(eyre!(
                "Matrix has {} equations, but the element assembler has {}",
                matrix.num_equations(),
                element_assembler.num_equations()
            ));
        }

        let ws = &mut *self.workspace.borrow_mut();
        let element_matrix = &mut ws.element_matrix;

        for element in 0..element_assembler.num_elements() {
            let dofs = element_assembler.element_dofs(element);
            let n = dofs.len();
            element_matrix.resize_mut(n, n, 0.0);
            element_matrix.fill(0.0);
            element_assembler.assemble_element_matrix_into(element, element_matrix)?;
            if element_matrix.shape() != (n, n) {
                return Err(eyre!(
                    "Element {} produced a matrix of shape {:?}, expected ({}, {})",
                    element,
                    element_matrix.shape(),
                    n,
                    n
                ));
            }

            for (a, row) in dofs.iter().enumerate() {
                let Some(i) = row.equation() else { continue };
                for (b, col) in dofs.iter().enumerate() {
                    if let Some(j) = col.equation() {
                        matrix.add_entry(i, j, element_matrix[(a, b)])?;
                    }
                }
            }
        }

        matrix.mark_assembled()?;
        debug!(
            "Assembled {} element matrices into {} equations",
            element_assembler.num_elements(),
            matrix.num_equations()
        );
        Ok(())
    }

    /// Adds every element vector to `rhs`, skipping excluded dofs.
    pub fn assemble_vector_into(
        &self,
        rhs: &mut DVector<f64>,
        element_assembler: &dyn ElementVectorAssembler,
    ) -> eyre::Result<()> {
        if rhs.len() != element_assembler.num_equations() {
            return Err(eyre!(
                "Vector has length {}, but the element assembler has {} equations",
                rhs.len(),
                element_assembler.num_equations()
            ));
        }

        let ws = &mut *self.workspace.borrow_mut();
        let element_vector = &mut ws.element_vector;

        for element in 0..element_assembler.num_elements() {
            let dofs = element_assembler.element_dofs(element);
            element_vector.resize_vertically_mut(dofs.len(), 0.0);
            element_vector.fill(0.0);
            element_assembler.assemble_element_vector_into(element, element_vector)?;
            if element_vector.len() != dofs.len() {
                return Err(eyre!(
                    "Element {} produced a vector of length {}, expected {}",
                    element,
                    element_vector.len(),
                    dofs.len()
                ));
            }

            for (a, dof) in dofs.iter().enumerate() {
                if let Some(i) = dof.equation() {
                    rhs[i] += element_vector[a];
                }
            }
        }
        Ok(())
    }
}
