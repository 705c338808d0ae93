use numpro::connectivity::{build_sparsity_pattern, Dof, DofConnectivity, DofTopology, TopologyError};
use numpro::sparse::DiagonalStorage;
use proptest::collection::vec;
use proptest::prelude::*;

use super::fixed_bar_chain;

fn chain_topology() -> DofTopology {
    use Dof::{Excluded, Free};
    let element_dofs = vec![vec![Excluded, Free(0)], vec![Free(0), Free(1)], vec![Free(1), Free(2)]];
    DofTopology::from_element_dofs(3, element_dofs).unwrap()
}

#[test]
fn adjacency_is_derived_from_element_dofs() {
    let topology = chain_topology();
    assert_eq!(topology.num_equations(), 3);
    assert_eq!(topology.num_elements(), 3);
    assert_eq!(topology.adjacent_elements(0), &[0, 1]);
    assert_eq!(topology.adjacent_elements(1), &[1, 2]);
    assert_eq!(topology.adjacent_elements(2), &[2]);
}

#[test]
fn separate_diagonal_pattern_of_chain() {
    let pattern = build_sparsity_pattern(&chain_topology(), DiagonalStorage::Separate).unwrap();
    let rows: Vec<_> = pattern.rows().map(|row| row.to_vec()).collect();
    assert_eq!(rows, vec![vec![1], vec![0, 2], vec![1]]);
    assert_eq!(pattern.nnz(), 7);
}

#[test]
fn inline_diagonal_pattern_of_chain() {
    let pattern = build_sparsity_pattern(&chain_topology(), DiagonalStorage::Inline).unwrap();
    let rows: Vec<_> = pattern.rows().map(|row| row.to_vec()).collect();
    assert_eq!(rows, vec![vec![0, 1], vec![0, 1, 2], vec![1, 2]]);
    assert_eq!(pattern.nnz(), 7);
}

#[test]
fn isolated_equation_has_empty_row() {
    use Dof::Free;
    let topology = DofTopology::from_element_dofs(3, vec![vec![Free(0), Free(1)]]).unwrap();
    let pattern = build_sparsity_pattern(&topology, DiagonalStorage::Separate).unwrap();
    assert_eq!(pattern.row(2), Some([].as_slice()));
    assert_eq!(pattern.nnz(), 2 + 3);
}

#[test]
fn repeated_dofs_are_deduplicated() {
    use Dof::Free;
    let element_dofs = vec![vec![Free(1), Free(0), Free(1)], vec![Free(0), Free(1)]];
    let topology = DofTopology::from_element_dofs(2, element_dofs).unwrap();
    assert_eq!(topology.adjacent_elements(1), &[0, 1]);
    let pattern = build_sparsity_pattern(&topology, DiagonalStorage::Inline).unwrap();
    assert_eq!(pattern.row(0), Some([0, 1].as_slice()));
    assert_eq!(pattern.row(1), Some([0, 1].as_slice()));
}

#[test]
fn explicit_adjacency_may_widen_pattern() {
    use Dof::Free;
    let element_dofs = vec![vec![Free(0), Free(1)], vec![Free(1), Free(2)]];
    // Equation 0 also lists element 1, as a node-based adjacency might
    let adjacency = vec![vec![0, 1], vec![0, 1], vec![1]];
    let topology = DofTopology::new(3, element_dofs, adjacency).unwrap();
    let pattern = build_sparsity_pattern(&topology, DiagonalStorage::Separate).unwrap();
    assert_eq!(pattern.row(0), Some([1, 2].as_slice()));
    assert_eq!(pattern.row(2), Some([1].as_slice()));
}

#[test]
fn invalid_topologies_are_rejected() {
    use Dof::Free;
    assert_eq!(
        DofTopology::from_element_dofs(3, vec![vec![Free(0), Free(5)]]),
        Err(TopologyError::EquationOutOfBounds {
            element: 0,
            equation: 5,
            num_equations: 3
        })
    );
    assert_eq!(
        DofTopology::new(2, vec![vec![Free(0), Free(1)]], vec![vec![0], vec![7]]),
        Err(TopologyError::ElementOutOfBounds {
            equation: 1,
            element: 7,
            num_elements: 1
        })
    );
    assert_eq!(
        DofTopology::new(2, vec![vec![Free(0), Free(1)]], vec![vec![0]]),
        Err(TopologyError::AdjacencyLength { expected: 2, actual: 1 })
    );
    assert_eq!(
        DofTopology::new(1, vec![vec![Free(0), Free(1)]], vec![vec![0]]),
        Err(TopologyError::EquationOutOfBounds {
            element: 0,
            equation: 1,
            num_equations: 1
        })
    );
}

#[test]
fn topology_serializes() {
    let topology = chain_topology();
    let json = serde_json::to_string(&topology).unwrap();
    let deserialized: DofTopology = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, topology);
}

#[test]
fn element_matrices_expose_connectivity() {
    let elements = fixed_bar_chain(4);
    assert_eq!(elements.num_equations(), 4);
    assert_eq!(elements.num_elements(), 4);
    assert_eq!(elements.element_dofs(0), &[Dof::Excluded, Dof::Free(0)]);
    let pattern = build_sparsity_pattern(&elements, DiagonalStorage::Separate).unwrap();
    assert_eq!(pattern.nnz(), 4 + 2 * 3);
}

/// Element dof lists over `n` equations.
fn topology() -> impl Strategy<Value = (usize, Vec<Vec<Dof>>)> {
    (1..10usize).prop_flat_map(|n| {
        let dof = prop_oneof![Just(Dof::Excluded), (0..n).prop_map(Dof::Free)];
        (Just(n), vec(vec(dof, 1..5), 0..8))
    })
}

proptest! {
    #[test]
    fn pattern_couples_exactly_the_dofs_sharing_an_element(
        (n, element_dofs) in topology(),
        separate in any::<bool>()
    ) {
        let diagonal = if separate { DiagonalStorage::Separate } else { DiagonalStorage::Inline };
        let topology = DofTopology::from_element_dofs(n, element_dofs.clone()).unwrap();
        let pattern = build_sparsity_pattern(&topology, diagonal).unwrap();

        let mut num_row_entries = 0;
        for (i, row) in pattern.rows().enumerate() {
            prop_assert!(row.windows(2).all(|w| w[0] < w[1]));
            num_row_entries += row.len();

            for j in 0..n {
                let shares_element = element_dofs
                    .iter()
                    .any(|dofs| dofs.contains(&Dof::Free(i)) && dofs.contains(&Dof::Free(j)));
                let expected = shares_element && !(separate && i == j);
                prop_assert_eq!(row.contains(&j), expected);
            }
        }

        let reserved = if separate { n } else { 0 };
        prop_assert_eq!(pattern.nnz(), num_row_entries + reserved);
    }
}
