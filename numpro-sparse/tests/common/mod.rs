#![allow(dead_code)]

use nalgebra::DMatrix;
use numpro_sparse::{DenseMatrix, DiagonalStorage, Matrix, MsrMatrix, SparsityPattern};

/// An assembled MSR matrix storing exactly the nonzero off-diagonals of `a`.
pub fn msr_from_dense(a: &DMatrix<f64>) -> MsrMatrix {
    let n = a.nrows();
    let rows: Vec<Vec<usize>> = (0..n)
        .map(|i| (0..n).filter(|&j| j != i && a[(i, j)] != 0.0).collect())
        .collect();
    let pattern = SparsityPattern::from_rows(rows, DiagonalStorage::Separate).unwrap();
    let mut matrix = MsrMatrix::from_pattern(&pattern).unwrap();
    for i in 0..n {
        for j in 0..n {
            if i == j || a[(i, j)] != 0.0 {
                matrix.add_entry(i, j, a[(i, j)]).unwrap();
            }
        }
    }
    matrix.mark_assembled().unwrap();
    matrix
}

pub fn dense_from(a: &DMatrix<f64>) -> DenseMatrix {
    DenseMatrix::from_row_slice(a.nrows(), a.transpose().as_slice()).unwrap()
}

/// Both storage formats of the same matrix.
pub fn both_formats(a: &DMatrix<f64>) -> Vec<Box<dyn Matrix>> {
    let dense: Box<dyn Matrix> = Box::new(dense_from(a));
    let msr: Box<dyn Matrix> = Box::new(msr_from_dense(a));
    vec![dense, msr]
}
