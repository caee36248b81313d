//! Performance benchmarks for pull and relay chains.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use function_chain::{PullChain, RelayChain, Step, Value};
use serde_json::json;

fn nested(depth: usize) -> Value {
    let mut value = json!("leaf");
    for _ in 0..depth {
        value = json!({ "next": value });
    }
    Value::from(value)
}

/// Benchmark pull chains with varying step counts
fn bench_pull_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("pull_depth");

    for depth in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::new("named", depth), &depth, |b, &depth| {
            let chain = PullChain::with_steps(nested(depth), vec![Step::name("next"); depth]).unwrap();
            b.iter(|| black_box(chain.call().unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("expression", depth), &depth, |b, &depth| {
            let path = vec!["self[:next]"; depth].join("/");
            let chain = PullChain::with_steps(nested(depth), [path]).unwrap();
            b.iter(|| black_box(chain.call().unwrap()));
        });
    }

    group.finish();
}

/// Benchmark relay chains of bound callables
fn bench_relay_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("relay_length");

    for length in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, &length| {
            let mut chain = RelayChain::new();
            for _ in 0..length {
                chain
                    .add(Step::func(|args| args[0].invoke("+", &[Value::Int(1)], None)))
                    .unwrap();
            }
            b.iter(|| black_box(chain.call([Value::Int(0)]).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark parsing string steps on insertion
fn bench_insertion(c: &mut Criterion) {
    let path = "@s = shelves/keys/@k = first/s[k]/select(:x)/self.length * 2 + 1";

    c.bench_function("insert_path", |b| {
        b.iter(|| {
            let mut chain = PullChain::new(Value::Nil);
            chain.add(black_box(path)).unwrap();
            black_box(chain.len())
        });
    });
}

criterion_group!(benches, bench_pull_depth, bench_relay_length, bench_insertion);
criterion_main!(benches);
