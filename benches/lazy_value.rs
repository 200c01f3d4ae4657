use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_scoped::*;
use std::sync::Arc;

// ===== Lazy Value Reads =====

fn bench_thread_local_hit(c: &mut Criterion) {
    let value = LazyScopedValue::new(
        UniqueId::new(),
        || Arc::new(42u64),
        Arc::new(NoAmbientScope),
    )
    .unwrap();

    // Prime the per-thread slot
    let _ = value.value();

    c.bench_function("lazy_value_thread_local_hit", |b| {
        b.iter(|| black_box(value.get().unwrap()))
    });
}

fn bench_ambient_hit(c: &mut Criterion) {
    let requests = RequestCache::new();
    let value = LazyScopedValue::new(
        UniqueId::new(),
        || Arc::new(42u64),
        Arc::new(requests),
    )
    .unwrap();

    let _request = requests.begin();
    let _ = value.value();

    c.bench_function("lazy_value_ambient_hit", |b| {
        b.iter(|| black_box(value.get().unwrap()))
    });
}

fn bench_materialize_and_dispose(c: &mut Criterion) {
    c.bench_function("lazy_value_materialize_dispose", |b| {
        b.iter(|| {
            let value = LazyScopedValue::new(
                UniqueId::new(),
                || Arc::new(ExecutorConcrete::new(ExecutorOptions::default())),
                Arc::new(NoAmbientScope),
            )
            .unwrap();
            black_box(value.value());
            value.dispose();
        })
    });
}

// ===== Facade Resolution =====

fn bench_facade_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("facade_resolution");

    let mut sc = ServiceCollection::new();
    sc.add_executor_factory();
    let provider = sc.build();
    let _ = provider.get_required_trait::<dyn ExecutorFactory>().current_handler();

    for scopes in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("forward_in_scope", scopes), &scopes, |b, &n| {
            b.iter(|| {
                for _ in 0..n {
                    let scope = provider.create_scope();
                    let factory = scope.get_required_trait::<dyn ExecutorFactory>();
                    black_box(factory.current_handler().unwrap());
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_thread_local_hit,
    bench_ambient_hit,
    bench_materialize_and_dispose,
    bench_facade_resolution
);

criterion_main!(benches);
