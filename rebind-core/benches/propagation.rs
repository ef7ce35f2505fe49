//! Write fan-out benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use rebind_core::{Store, Value, Watcher};

fn watched_store(watchers: usize) -> (Store, Vec<Watcher>) {
    let store = Store::new(json!({ "user": { "profile": { "age": 0 } }, "list": [] })).unwrap();
    let handles = (0..watchers)
        .map(|_| store.watch("user.profile.age", || Ok(())).unwrap())
        .collect();
    (store, handles)
}

fn write_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_fan_out");
    for watchers in [1, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(watchers), &watchers, |b, &watchers| {
            let (store, _handles) = watched_store(watchers);
            let mut n = 0i64;
            b.iter(|| {
                n += 1;
                store.write("user.profile.age", black_box(n)).unwrap();
            });
        });
    }
    group.finish();
}

fn array_push(c: &mut Criterion) {
    c.bench_function("array_push_16_watchers", |b| {
        let (store, _handles) = watched_store(0);
        let _watchers: Vec<_> = (0..16).map(|_| store.watch("list.length", || Ok(())).unwrap()).collect();
        let list = store.resolve("list").unwrap();
        let list = list.as_array().unwrap().clone();
        b.iter(|| list.push(black_box(Value::from(1))).unwrap());
    });
}

fn resolve_deep_path(c: &mut Criterion) {
    let (store, _handles) = watched_store(0);
    c.bench_function("resolve_deep_path", |b| {
        b.iter(|| store.resolve(black_box("user.profile.age")).unwrap());
    });
}

criterion_group!(benches, write_fan_out, array_push, resolve_deep_path);
criterion_main!(benches);
