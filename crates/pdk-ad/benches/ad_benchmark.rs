use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pdk_ad::tape::Tape;
use std::hint::black_box;

fn bench_tape_build_and_backward(c: &mut Criterion) {
    let mut group = c.benchmark_group("ad_tape");

    for n_vars in [4usize, 16, 64, 256, 1024] {
        group.bench_with_input(BenchmarkId::new("build_and_backward", n_vars), &n_vars, |b, &n| {
            b.iter(|| {
                let mut t = Tape::with_capacity(n * 6);
                let vars: Vec<_> = (0..n).map(|i| t.var(1.0 + (i as f64) * 1e-3)).collect();

                // f(x) = sum_i ln(x_i^2 + 1)
                let one = t.constant(1.0);
                let mut acc = t.constant(0.0);
                for &x in &vars {
                    let x2 = t.mul(x, x);
                    let x2p1 = t.add(x2, one);
                    let ln = t.ln(x2p1);
                    acc = t.add(acc, ln);
                }

                t.backward(acc);
                black_box((t.adjoint(vars[0]), t.adjoint(vars[n / 2])));
            })
        });

        group.bench_with_input(BenchmarkId::new("precomputed", n_vars), &n_vars, |b, &n| {
            let mut t = Tape::with_capacity(n + 1);
            b.iter(|| {
                t.clear();
                let xs: Vec<f64> = (0..n).map(|i| 1.0 + (i as f64) * 1e-3).collect();
                let vars: Vec<_> = xs.iter().map(|&x| t.var(x)).collect();

                // Same f, recorded as one node with d/dx_i = 2 x_i / (x_i^2 + 1)
                let val: f64 = xs.iter().map(|&x| (x * x + 1.0).ln()).sum();
                let partials = vars.iter().zip(&xs).map(|(&v, &x)| (v, 2.0 * x / (x * x + 1.0)));
                let f = t.precomputed(val, partials);

                t.backward(f);
                black_box(t.adjoint(vars[0]));
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tape_build_and_backward);
criterion_main!(benches);
