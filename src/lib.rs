//! Assembly and solution of the sparse linear systems arising from discretized models.
//!
//! The pipeline runs from the element/equation [`connectivity`] to a [`SparsityPattern`](sparse::SparsityPattern),
//! allocates a [`Matrix`](sparse::Matrix) of the configured format, scatters the element
//! contributions into it with the [`assembly`] routines and hands it to a solver.
//! [`system::LinearSystem`] wires these steps together.

pub mod assembly;
pub mod connectivity;
pub mod system;

pub mod sparse {
    pub use numpro_sparse::*;
}

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
