use eyre::eyre;
use matrixcompare::assert_matrix_eq;
use numpro::assembly::{ElementMatrices, ElementMatrixAssembler, GlobalAssembler};
use numpro::connectivity::{build_sparsity_pattern, Dof, DofConnectivity, DofTopology};
use numpro::nalgebra::{DMatrix, DVector};
use numpro::sparse::{DenseMatrix, DiagonalStorage, Matrix, MatrixError, MatrixState, MsrMatrix};

use super::fixed_bar_chain;

fn expected_chain_matrix() -> DMatrix<f64> {
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        2.0, -1.0, 0.0,
        -1.0, 2.0, -1.0,
        0.0, -1.0, 1.0,
    ]);
    expected
}

#[test]
fn assemble_chain_into_msr() {
    let elements = fixed_bar_chain(3);
    let pattern = build_sparsity_pattern(&elements, DiagonalStorage::Separate).unwrap();
    let mut matrix = MsrMatrix::from_pattern(&pattern).unwrap();

    GlobalAssembler::default()
        .assemble_into(&mut matrix, &elements)
        .unwrap();

    assert_eq!(matrix.state(), MatrixState::Assembled);
    assert_eq!(matrix.to_dense(), expected_chain_matrix());
}

#[test]
fn assemble_chain_into_dense() {
    let elements = fixed_bar_chain(3);
    let pattern = build_sparsity_pattern(&elements, DiagonalStorage::Inline).unwrap();
    let mut matrix = DenseMatrix::new();
    matrix.allocate(&pattern).unwrap();

    GlobalAssembler::default()
        .assemble_into(&mut matrix, &elements)
        .unwrap();

    assert_eq!(matrix.as_dmatrix(), &expected_chain_matrix());
}

#[test]
fn assemble_load_vectors_skips_excluded_dofs() {
    let elements = fixed_bar_chain(3);
    let mut rhs = DVector::zeros(3);
    GlobalAssembler::default()
        .assemble_vector_into(&mut rhs, &elements)
        .unwrap();
    assert_eq!(rhs, DVector::from_column_slice(&[1.0, 1.0, 0.5]));
}

#[test]
fn assembly_accumulates_into_existing_values() {
    let elements = fixed_bar_chain(3);
    let pattern = build_sparsity_pattern(&elements, DiagonalStorage::Separate).unwrap();
    let mut matrix = MsrMatrix::from_pattern(&pattern).unwrap();
    let assembler = GlobalAssembler::default();

    assembler.assemble_into(&mut matrix, &elements).unwrap();
    assembler.assemble_into(&mut matrix, &elements).unwrap();
    assert_eq!(matrix.to_dense(), expected_chain_matrix() * 2.0);

    matrix.init().unwrap();
    assembler.assemble_into(&mut matrix, &elements).unwrap();
    assert_eq!(matrix.to_dense(), expected_chain_matrix());
}

#[test]
fn element_order_does_not_matter() {
    use Dof::Free;
    let element_dofs = vec![
        vec![Free(0), Free(1), Free(2)],
        vec![Free(2), Free(3), Free(0)],
        vec![Free(1), Free(3)],
    ];
    let matrices = vec![
        DMatrix::from_fn(3, 3, |i, j| 0.1 + (i + 2 * j) as f64),
        DMatrix::from_fn(3, 3, |i, j| 1.0 / (1 + i + j) as f64),
        DMatrix::from_row_slice(2, 2, &[3.0, 0.25, 0.25, 7.0]),
    ];
    let order = [2, 0, 1];
    let reordered_dofs = order.iter().map(|&e| element_dofs[e].clone()).collect();
    let reordered_matrices = order.iter().map(|&e| matrices[e].clone()).collect();

    let assemble = |dofs: Vec<Vec<Dof>>, matrices: Vec<DMatrix<f64>>| {
        let topology = DofTopology::from_element_dofs(4, dofs).unwrap();
        let elements = ElementMatrices::new(topology, matrices).unwrap();
        let pattern = build_sparsity_pattern(&elements, DiagonalStorage::Separate).unwrap();
        let mut matrix = MsrMatrix::from_pattern(&pattern).unwrap();
        GlobalAssembler::default()
            .assemble_into(&mut matrix, &elements)
            .unwrap();
        matrix.to_dense()
    };

    let original = assemble(element_dofs, matrices);
    let reordered = assemble(reordered_dofs, reordered_matrices);
    assert_matrix_eq!(original, reordered, comp = abs, tol = 1e-12);
}

#[test]
fn entry_outside_pattern_is_reported() {
    let elements = fixed_bar_chain(3);
    // Only the diagonal is stored
    let pattern = numpro::sparse::SparsityPattern::empty(3, DiagonalStorage::Separate);
    let mut matrix = MsrMatrix::from_pattern(&pattern).unwrap();

    let err = GlobalAssembler::default()
        .assemble_into(&mut matrix, &elements)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MatrixError>(),
        Some(MatrixError::StructuralAccess { .. })
    ));
}

#[test]
fn size_mismatch_is_reported() {
    let elements = fixed_bar_chain(3);
    let mut matrix = DenseMatrix::with_size(4).unwrap();
    assert!(GlobalAssembler::default()
        .assemble_into(&mut matrix, &elements)
        .is_err());

    let mut rhs = DVector::zeros(2);
    assert!(GlobalAssembler::default()
        .assemble_vector_into(&mut rhs, &elements)
        .is_err());
}

#[test]
fn element_matrices_are_validated() {
    let topology = DofTopology::from_element_dofs(2, vec![vec![Dof::Free(0), Dof::Free(1)]]).unwrap();
    assert!(ElementMatrices::new(topology.clone(), vec![]).is_err());
    assert!(ElementMatrices::new(topology.clone(), vec![DMatrix::identity(3, 3)]).is_err());

    let elements = ElementMatrices::new(topology, vec![DMatrix::identity(2, 2)]).unwrap();
    assert!(elements
        .clone()
        .with_load_vectors(vec![DVector::zeros(3)])
        .is_err());
    assert!(elements.with_load_vectors(vec![DVector::zeros(2)]).is_ok());
}

struct FailingAssembler {
    topology: DofTopology,
}

impl DofConnectivity for FailingAssembler {
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

impl ElementMatrixAssembler for FailingAssembler {
    fn assemble_element_matrix_into(&self, element: usize, _output: &mut DMatrix<f64>) -> eyre::Result<()> {
        Err(eyre!("Element {} has a degenerate geometry", element))
    }
}

#[test]
fn element_assembler_errors_are_propagated() {
    let topology = DofTopology::from_element_dofs(1, vec![vec![Dof::Free(0)]]).unwrap();
    let assembler = FailingAssembler { topology };
    let mut matrix = DenseMatrix::with_size(1).unwrap();
    let err = GlobalAssembler::default()
        .assemble_into(&mut matrix, &assembler)
        .unwrap_err();
    assert_eq!(err.to_string(), "Element 0 has a degenerate geometry");
    assert_eq!(matrix.state(), MatrixState::Masked);
}
