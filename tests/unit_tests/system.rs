use numpro::assembly::ElementMatrices;
use numpro::connectivity::DofConnectivity;
use numpro::nalgebra::{DMatrix, DVector};
use numpro::sparse::{
    IterativeSettings, Matrix, MatrixFormat, MatrixState, PreconditionerKind, SolveErrorKind, SolverConfig,
    SolverKind,
};
use numpro::system::LinearSystem;
use util::assert_approx_matrix_eq;

use super::fixed_bar_chain;

fn all_configs() -> Vec<SolverConfig> {
    let settings = IterativeSettings {
        tolerance: 1e-12,
        max_iterations: 10_000,
    };
    let solvers = [
        SolverKind::Lu,
        SolverKind::GaussSeidel(settings),
        SolverKind::ConjugateGradient {
            settings,
            preconditioner: PreconditionerKind::Identity,
        },
        SolverKind::ConjugateGradient {
            settings,
            preconditioner: PreconditionerKind::Jacobi,
        },
        SolverKind::ConjugateGradient {
            settings,
            preconditioner: PreconditionerKind::SymmetricGaussSeidel,
        },
    ];
    [MatrixFormat::Dense, MatrixFormat::Msr]
        .into_iter()
        .flat_map(|format| solvers.map(|solver| SolverConfig::new(format, solver)))
        .collect()
}

/// Displacements of the fixed bar chain under its element loads.
///
/// The load accumulated from node `k` to the free end is carried by every element to its left,
/// so `u_k = sum_{m=1..k} (n - m + 1/2)`.
fn chain_solution(n: usize) -> DVector<f64> {
    let mut u = DVector::zeros(n);
    let mut displacement = 0.0;
    for k in 1..=n {
        displacement += (n - k) as f64 + 0.5;
        u[k - 1] = displacement;
    }
    u
}

#[test]
fn every_configuration_solves_the_chain() {
    let n = 8;
    let elements = fixed_bar_chain(n);
    let expected = chain_solution(n);
    for config in all_configs() {
        let mut system = LinearSystem::assemble(config, &elements).unwrap();
        assert_eq!(system.num_equations(), n);
        assert_eq!(system.matrix().state(), MatrixState::Assembled);

        let (solution, output) = system.solve().unwrap();
        assert_approx_matrix_eq!(&solution, &expected, abstol = 1e-8);
        if let SolverKind::Lu = config.solver {
            assert_eq!(output.num_iterations, 0);
            assert_eq!(system.matrix().state(), MatrixState::Factorized);
        }
    }
}

#[test]
fn pattern_matches_format() {
    let elements = fixed_bar_chain(4);
    let msr = LinearSystem::assemble(SolverConfig::new(MatrixFormat::Msr, SolverKind::Lu), &elements).unwrap();
    let dense = LinearSystem::assemble(SolverConfig::new(MatrixFormat::Dense, SolverKind::Lu), &elements).unwrap();
    assert_eq!(msr.pattern().nnz(), 10);
    assert_eq!(dense.pattern().nnz(), 10);
    assert_eq!(msr.pattern().num_row_entries(), 6);
    assert_eq!(dense.pattern().num_row_entries(), 10);
    assert_eq!(msr.rhs(), dense.rhs());
}

#[test]
fn reassembly_replaces_values_and_invalidates_factorization() {
    let n = 5;
    let elements = fixed_bar_chain(n);
    let config = SolverConfig::new(MatrixFormat::Msr, SolverKind::Lu);
    let mut system = LinearSystem::assemble(config, &elements).unwrap();
    let (first, _) = system.solve().unwrap();

    // Twice as stiff, same loads
    let topology = elements.topology().clone();
    let matrices = (0..n).map(|e| elements.element_matrix(e) * 2.0).collect();
    let loads = vec![DVector::from_element(2, 0.5); n];
    let stiffer = ElementMatrices::new(topology, matrices)
        .unwrap()
        .with_load_vectors(loads)
        .unwrap();

    system.reassemble(&stiffer).unwrap();
    assert_eq!(system.matrix().state(), MatrixState::Assembled);
    let (second, _) = system.solve().unwrap();
    assert_approx_matrix_eq!(&second, &(&first * 0.5), abstol = 1e-12);
}

#[test]
fn failed_solve_keeps_last_iterate() {
    let elements = fixed_bar_chain(20);
    let settings = IterativeSettings {
        tolerance: 1e-12,
        max_iterations: 3,
    };
    let config = SolverConfig::new(MatrixFormat::Msr, SolverKind::GaussSeidel(settings));
    let mut system = LinearSystem::assemble(config, &elements).unwrap();

    let mut solution = DVector::zeros(system.num_equations());
    let err = system.solve_with_guess(&mut solution).unwrap_err();
    assert_eq!(err.kind, SolveErrorKind::MaxIterationsReached { max_iter: 3 });
    assert_eq!(err.output.num_iterations, 3);
    assert!(solution.iter().any(|&u| u > 0.0));
}

#[test]
fn configuration_can_be_read_from_json() {
    let json = r#"{ "format": "Dense", "solver": { "ConjugateGradient": { "settings": { "tolerance": 1e-12 } } } }"#;
    let config: SolverConfig = serde_json::from_str(json).unwrap();
    let elements = fixed_bar_chain(6);
    let mut system = LinearSystem::assemble(config, &elements).unwrap();
    let (solution, output) = system.solve().unwrap();
    assert_eq!(output.solver, "CG");
    assert_approx_matrix_eq!(&solution, &chain_solution(6), abstol = 1e-8);
}

#[test]
fn assembled_matrix_matches_element_sum() {
    let elements = fixed_bar_chain(3);
    let system = LinearSystem::assemble(SolverConfig::default(), &elements).unwrap();
    let mut assembled = DMatrix::zeros(3, 3);
    for i in 0..3 {
        for j in 0..3 {
            assembled[(i, j)] = system.matrix().get_entry(i, j).unwrap();
        }
    }
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        2.0, -1.0, 0.0,
        -1.0, 2.0, -1.0,
        0.0, -1.0, 1.0,
    ]);
    assert_eq!(assembled, expected);
    assert_eq!(elements.num_equations(), system.num_equations());
}
