mod assembly;
mod connectivity;
mod system;

use numpro::assembly::ElementMatrices;
use numpro::connectivity::{Dof, DofTopology};
use numpro::nalgebra::DVector;

/// A chain of `num_elements` unit bar elements whose first node is fixed.
///
/// Node `k > 0` is equation `k - 1`. Every element carries the load vector `[0.5, 0.5]`.
pub fn fixed_bar_chain(num_elements: usize) -> ElementMatrices {
    let (nodes, matrices) = util::bar_chain_elements(num_elements);
    let element_dofs = nodes
        .iter()
        .map(|element_nodes| {
            element_nodes
                .iter()
                .map(|&node| if node == 0 { Dof::Excluded } else { Dof::Free(node - 1) })
                .collect()
        })
        .collect();
    let topology = DofTopology::from_element_dofs(num_elements, element_dofs).unwrap();
    let loads = vec![DVector::from_element(2, 0.5); num_elements];
    ElementMatrices::new(topology, matrices)
        .unwrap()
        .with_load_vectors(loads)
        .unwrap()
}
