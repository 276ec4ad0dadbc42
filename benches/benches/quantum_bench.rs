//! # Quantum System Benchmarks
//!
//! Measures gate application, merge and measurement as the system grows.
//! Gate application builds the padded operator, so cost grows as O(4^n).
//!
//! Run: `cargo bench --bench quantum_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qfab_quantum::{cnot, Hadamard, QuantumGate, QuantumSystem, SystemId};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Sistema de `n` qubits em superposição uniforme
fn uniform(n: usize) -> QuantumSystem {
    let h = Hadamard.matrix();
    let mut sys = QuantumSystem::new(SystemId(0));
    for i in 1..n {
        sys.merge(&QuantumSystem::new(SystemId(i as u64)));
    }
    for q in 0..n {
        sys.apply_gate(&h, q).unwrap();
    }
    sys
}

/// Benchmark single-qubit gate application at growing widths
fn bench_apply_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_gate");
    let h = Hadamard.matrix();

    for n in [1usize, 2, 4, 6, 8] {
        let sys = uniform(n);
        group.bench_with_input(BenchmarkId::new("hadamard", n), &n, |b, &n| {
            b.iter(|| {
                let mut s = sys.clone();
                s.apply_gate(black_box(&h), n - 1).unwrap();
                black_box(s)
            })
        });
    }

    let cx = cnot();
    for n in [2usize, 4, 6] {
        let sys = uniform(n);
        group.bench_with_input(BenchmarkId::new("cnot", n), &n, |b, _| {
            b.iter(|| {
                let mut s = sys.clone();
                s.apply_gate(black_box(&cx), 0).unwrap();
                black_box(s)
            })
        });
    }

    group.finish();
}

/// Benchmark tensor-product merge
fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for n in [1usize, 3, 5] {
        let left = uniform(n);
        let right = uniform(n);
        group.bench_with_input(BenchmarkId::new("pair", 2 * n), &n, |b, _| {
            b.iter(|| {
                let mut s = left.clone();
                s.merge(black_box(&right));
                black_box(s)
            })
        });
    }

    group.bench_function("self_merge_noop", |b| {
        let sys = QuantumSystem::new(SystemId(1));
        b.iter(|| {
            let mut s = sys.clone();
            s.merge(black_box(&sys));
            black_box(s)
        })
    });

    group.finish();
}

/// Benchmark measurement and marginal probabilities
fn bench_measure(c: &mut Criterion) {
    let mut group = c.benchmark_group("measure");
    let sys = uniform(8);
    let mut rng = StdRng::seed_from_u64(42);

    group.bench_function("sample_8q", |b| {
        b.iter(|| black_box(sys.measure(&mut rng)))
    });

    group.bench_function("marginal_8q", |b| {
        b.iter(|| black_box(sys.qubit_excitation_probability(black_box(3))))
    });

    group.finish();
}

criterion_group!(benches, bench_apply_gate, bench_merge, bench_measure);
criterion_main!(benches);
