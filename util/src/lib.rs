use nalgebra::{DMatrix, DVector};

/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
        }
        assert!(approx_eq);
    }};
}

/// The `n x n` matrix of the 1D Laplacian with Dirichlet ends, `tridiag(-1, 2, -1)`.
pub fn laplacian_1d(n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            2.0
        } else if i.abs_diff(j) == 1 {
            -1.0
        } else {
            0.0
        }
    })
}

/// Element matrices of `num_elements` linear bar elements in a chain, each coupling
/// node `e` with node `e + 1` through the stiffness `[[1, -1], [-1, 1]]`.
pub fn bar_chain_elements(num_elements: usize) -> (Vec<Vec<usize>>, Vec<DMatrix<f64>>) {
    let stiffness = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]);
    let dofs = (0..num_elements).map(|e| vec![e, e + 1]).collect();
    let matrices = vec![stiffness; num_elements];
    (dofs, matrices)
}

/// A symmetric, strictly diagonally dominant matrix with the given off-diagonal couplings.
///
/// Each `(i, j, value)` contributes to both `(i, j)` and `(j, i)`. The diagonal is chosen as
/// one plus the absolute row sum of the off-diagonals.
pub fn diagonally_dominant_spd(n: usize, couplings: &[(usize, usize, f64)]) -> DMatrix<f64> {
    let mut matrix = DMatrix::<f64>::zeros(n, n);
    for &(i, j, value) in couplings {
        if i != j {
            matrix[(i, j)] += value;
            matrix[(j, i)] += value;
        }
    }
    for i in 0..n {
        let row_sum: f64 = matrix.row(i).iter().map(|v| v.abs()).sum();
        matrix[(i, i)] = 1.0 + row_sum;
    }
    matrix
}

/// Relative residual `||b - A x|| / ||b||`, or the absolute residual when `b` is zero.
pub fn relative_residual(a: &DMatrix<f64>, x: &DVector<f64>, b: &DVector<f64>) -> f64 {
    let residual = (b - a * x).norm();
    let b_norm = b.norm();
    if b_norm > 0.0 {
        residual / b_norm
    } else {
        residual
    }
}
