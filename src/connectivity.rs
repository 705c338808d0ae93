//! Element-to-equation topology and the sparsity patterns derived from it.
use crate::sparse::{DiagonalStorage, SparsityPattern, SparsityPatternError};
use log::debug;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// A local degree of freedom of an element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dof {
    /// The dof is the unknown with the given global equation index.
    Free(usize),
    /// The dof is fixed or constrained and takes no part in the system.
    Excluded,
}

impl Dof {
    pub fn equation(&self) -> Option<usize> {
        match self {
            Self::Free(equation) => Some(*equation),
            Self::Excluded => None,
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, Self::Excluded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopologyError {
    /// An element references an equation index outside `[0, num_equations)`.
    EquationOutOfBounds {
        element: usize,
        equation: usize,
        num_equations: usize,
    },
    /// An equation lists an adjacent element that does not exist.
    ElementOutOfBounds {
        equation: usize,
        element: usize,
        num_elements: usize,
    },
    /// The adjacency lists do not have one entry per equation.
    AdjacencyLength { expected: usize, actual: usize },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EquationOutOfBounds {
                element,
                equation,
                num_equations,
            } => write!(
                f,
                "Element {} references equation {}, but there are only {} equations",
                element, equation, num_equations
            ),
            Self::ElementOutOfBounds {
                equation,
                element,
                num_elements,
            } => write!(
                f,
                "Equation {} is adjacent to element {}, but there are only {} elements",
                equation, element, num_elements
            ),
            Self::AdjacencyLength { expected, actual } => write!(
                f,
                "Expected adjacency lists for {} equations, got {}",
                expected, actual
            ),
        }
    }
}

impl Error for TopologyError {}

/// Connectivity between elements and the equations of the global system.
pub trait DofConnectivity {
    fn num_equations(&self) -> usize;

    fn num_elements(&self) -> usize;

    /// Local dofs of the element, in the order of its element matrix rows.
    fn element_dofs(&self, element: usize) -> &[Dof];

    /// Elements whose dofs may couple with the given equation.
    fn adjacent_elements(&self, equation: usize) -> &[usize];
}

/// Index-based storage of the element/equation adjacency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DofTopology {
    num_equations: usize,
    element_dofs: Vec<Vec<Dof>>,
    equation_elements: Vec<Vec<usize>>,
}

impl DofTopology {
    /// Builds the topology from the element dof lists, deriving which elements touch each equation.
    pub fn from_element_dofs(num_equations: usize, element_dofs: Vec<Vec<Dof>>) -> Result<Self, TopologyError> {
        let mut equation_elements = vec![Vec::new(); num_equations];
        for (element, dofs) in element_dofs.iter().enumerate() {
            for equation in dofs.iter().filter_map(Dof::equation) {
                let adjacent = equation_elements
                    .get_mut(equation)
                    .ok_or(TopologyError::EquationOutOfBounds {
                        element,
                        equation,
                        num_equations,
                    })?;
                if adjacent.last() != Some(&element) {
                    adjacent.push(element);
                }
            }
        }
        Ok(Self {
            num_equations,
            element_dofs,
            equation_elements,
        })
    }

    /// Builds the topology from explicit adjacency lists.
    ///
    /// The adjacency of an equation may include elements that do not reference it, for example
    /// all elements around the node the equation belongs to. Such elements only widen the
    /// resulting sparsity pattern.
    pub fn new(
        num_equations: usize,
        element_dofs: Vec<Vec<Dof>>,
        equation_elements: Vec<Vec<usize>>,
    ) -> Result<Self, TopologyError> {
        if equation_elements.len() != num_equations {
            return Err(TopologyError::AdjacencyLength {
                expected: num_equations,
                actual: equation_elements.len(),
            });
        }
        for (element, dofs) in element_dofs.iter().enumerate() {
            if let Some(equation) = dofs
                .iter()
                .filter_map(Dof::equation)
                .find(|&equation| equation >= num_equations)
            {
                return Err(TopologyError::EquationOutOfBounds {
                    element,
                    equation,
                    num_equations,
                });
            }
        }
        let num_elements = element_dofs.len();
        for (equation, elements) in equation_elements.iter().enumerate() {
            if let Some(&element) = elements.iter().find(|&&element| element >= num_elements) {
                return Err(TopologyError::ElementOutOfBounds {
                    equation,
                    element,
                    num_elements,
                });
            }
        }
        Ok(Self {
            num_equations,
            element_dofs,
            equation_elements,
        })
    }
}

impl DofConnectivity for DofTopology {
    fn num_equations(&self) -> usize {
        self.num_equations
    }

    fn num_elements(&self) -> usize {
        self.element_dofs.len()
    }

    fn element_dofs(&self, element: usize) -> &[Dof] {
        &self.element_dofs[element]
    }

    fn adjacent_elements(&self, equation: usize) -> &[usize] {
        &self.equation_elements[equation]
    }
}

/// Derives the sparsity pattern of the global system.
///
/// Row `i` collects every free dof of every element adjacent to equation `i`. Excluded dofs
/// never appear. With [`DiagonalStorage::Separate`] the row does not reference `i` itself
/// and the pattern reserves a diagonal slot per row instead.
///
/// Fails only if the connectivity references equations outside `[0, num_equations)`, which a
/// [`DofTopology`] rules out on construction.
pub fn build_sparsity_pattern(
    connectivity: &dyn DofConnectivity,
    diagonal: DiagonalStorage,
) -> Result<SparsityPattern, SparsityPatternError> {
    let num_equations = connectivity.num_equations();
    let mut offsets = Vec::with_capacity(num_equations + 1);
    let mut column_indices = Vec::new();
    let mut row_entries = FxHashSet::default();
    let mut sorted_row = Vec::new();

    offsets.push(0);
    for equation in 0..num_equations {
        row_entries.clear();
        for &element in connectivity.adjacent_elements(equation) {
            row_entries.extend(
                connectivity
                    .element_dofs(element)
                    .iter()
                    .filter_map(Dof::equation),
            );
        }
        if diagonal == DiagonalStorage::Separate {
            row_entries.remove(&equation);
        }

        sorted_row.clear();
        sorted_row.extend(row_entries.iter().copied());
        sorted_row.sort_unstable();
        column_indices.extend_from_slice(&sorted_row);
        offsets.push(column_indices.len());
    }

    let pattern = SparsityPattern::try_from_offsets_and_indices(offsets, column_indices, diagonal)?;
    debug!(
        "Built sparsity pattern with {} equations and {} stored entries",
        pattern.num_equations(),
        pattern.nnz()
    );
    Ok(pattern)
}
