//! Benchmarks for the pseudo-time drivers and the LU-SGS sweep.
//!
//! Run with: `cargo bench --bench driver_bench`

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fv_march::linalg::{LuSgsSweep, block};
use fv_march::{
    BoundaryCondition, EulerFlux, FirstOrderFv, MatrixFreeImplicitSolver, Mesh2D,
    SpatialOperator, StateVector, SteadyBackwardEulerSolver, SteadyForwardEulerSolver,
    SteadySolver, SteadySolverConfig, TvdRkSolver, UnsteadySolverConfig,
};

const GAMMA: f64 = 1.4;

/// Subsonic free stream on a square with a density bump in the middle.
fn setup_problem(n: usize) -> (FirstOrderFv<4, EulerFlux>, StateVector<4>) {
    let free = EulerFlux::conserved_from_primitive(1.0, 0.5, 0.0, 1.0 / GAMMA, GAMMA);
    let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, n, n).unwrap();
    let u = StateVector::from_fn(mesh.n_cells(), |k| {
        let (x, y) = mesh.centroid(k);
        let r2 = (x - 0.5).powi(2) + (y - 0.5).powi(2);
        let rho = 1.0 + 0.1 * (-50.0 * r2).exp();
        EulerFlux::conserved_from_primitive(rho, 0.5, 0.0, 1.0 / GAMMA, GAMMA)
    });
    let op = FirstOrderFv::new(mesh, EulerFlux::new(GAMMA), BoundaryCondition::Farfield(free));
    (op, u)
}

/// Fixed number of iterations per driver call.
fn bench_steady_drivers(c: &mut Criterion) {
    let mut group = c.benchmark_group("steady_10_iterations");
    group.sample_size(20);

    for n in [16, 32] {
        let (op, u0) = setup_problem(n);
        let n_cells = n * n;
        let config = SteadySolverConfig::new(1e-14, 10)
            .with_cfl_ramp(2.0, 50.0, 0, 5)
            .with_linear_iterations(1e-3, 10, 20);

        group.bench_with_input(
            BenchmarkId::new("forward_euler", n_cells),
            &n_cells,
            |b, _| {
                let mut solver =
                    SteadyForwardEulerSolver::new(&op, config.clone().with_cfl(0.8)).unwrap();
                b.iter(|| {
                    let mut u = u0.clone();
                    black_box(solver.solve(&mut u).unwrap())
                })
            },
        );

        for (linear, precond) in [("BCGSTB", "SGS"), ("GMRES", "ILU0")] {
            group.bench_with_input(
                BenchmarkId::new(format!("backward_euler_{linear}_{precond}"), n_cells),
                &n_cells,
                |b, _| {
                    let mut solver = SteadyBackwardEulerSolver::new(
                        &op,
                        config.clone().with_linear_solver(linear, precond),
                    )
                    .unwrap();
                    b.iter(|| {
                        let mut u = u0.clone();
                        black_box(solver.solve(&mut u).unwrap())
                    })
                },
            );
        }

        group.bench_with_input(BenchmarkId::new("lusgs", n_cells), &n_cells, |b, _| {
            let mut solver =
                MatrixFreeImplicitSolver::new(&op, *op.flux(), config.clone()).unwrap();
            b.iter(|| {
                let mut u = u0.clone();
                black_box(solver.solve(&mut u).unwrap())
            })
        });
    }

    group.finish();
}

/// One forward + backward sweep in isolation.
fn bench_lusgs_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("lusgs_sweep");

    for n in [16, 32, 64] {
        let (op, u) = setup_problem(n);
        let n_cells = n * n;
        let mut residual = StateVector::zeros(n_cells);
        let mut dt = vec![0.0; n_cells];
        op.compute_residual(&u, &mut residual, true, &mut dt);
        let diag = vec![block::scaled_identity::<4>(4.0); n_cells];

        group.bench_with_input(BenchmarkId::new("euler", n_cells), &n_cells, |b, _| {
            let mut sweep = LuSgsSweep::new();
            let mut du = StateVector::zeros(n_cells);
            b.iter(|| {
                du.fill(0.0);
                sweep
                    .sweep(op.mesh(), op.flux(), &u, &residual, &diag, &mut du)
                    .unwrap();
                black_box(&du);
            })
        });
    }

    group.finish();
}

fn bench_tvd_rk(c: &mut Criterion) {
    let mut group = c.benchmark_group("tvd_rk");
    group.sample_size(20);

    let (op, u0) = setup_problem(32);
    for order in 1..=3 {
        group.bench_with_input(BenchmarkId::new("order", order), &order, |b, &order| {
            let mut solver = TvdRkSolver::new(&op, UnsteadySolverConfig::new(order, 0.8)).unwrap();
            b.iter(|| {
                let mut u = u0.clone();
                black_box(solver.solve(&mut u, 0.01).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_steady_drivers, bench_lusgs_sweep, bench_tvd_rk);
criterion_main!(benches);
