//! Open-addressing map and property table benchmarks
//!
//! Run with: cargo bench -p marten-object

use criterion::{Criterion, criterion_group, criterion_main};
use marten_object::maps::{IntMap, KeyToIntMap};
use marten_object::{OrdinaryObject, PropertyKey, Value};
use std::hint::black_box;
use std::sync::Arc;

/// Benchmark: name -> int map with interned keys
fn bench_key_to_int(c: &mut Criterion) {
    let keys: Vec<Arc<str>> = (0..256).map(|i| Arc::from(format!("prop{i}"))).collect();

    c.bench_function("key_to_int_put_256", |b| {
        b.iter(|| {
            let mut map = KeyToIntMap::new();
            for (i, key) in keys.iter().enumerate() {
                map.put(key.clone(), i as i32);
            }
            black_box(map)
        });
    });

    c.bench_function("key_to_int_get_256", |b| {
        let mut map = KeyToIntMap::new();
        for (i, key) in keys.iter().enumerate() {
            map.put(key.clone(), i as i32);
        }
        b.iter(|| {
            let mut sum = 0i64;
            for key in &keys {
                sum += map.get_or(key, 0) as i64;
            }
            black_box(sum)
        });
    });

    c.bench_function("key_to_int_churn", |b| {
        b.iter(|| {
            let mut map = KeyToIntMap::new();
            for (i, key) in keys.iter().enumerate() {
                map.put(key.clone(), i as i32);
                if i % 2 == 0 {
                    map.remove(key);
                }
            }
            black_box(map.len())
        });
    });
}

/// Benchmark: indexed storage
fn bench_int_map(c: &mut Criterion) {
    c.bench_function("int_map_sequential_1024", |b| {
        b.iter(|| {
            let mut map = IntMap::new();
            for i in 0..1024u32 {
                map.put(i, i);
            }
            black_box(map)
        });
    });
}

/// Benchmark: object property access through the full contract
fn bench_object_access(c: &mut Criterion) {
    let keys: Vec<PropertyKey> = (0..50).map(|i| PropertyKey::name(format!("prop{i}"))).collect();

    c.bench_function("object_get_50_props", |b| {
        let obj = OrdinaryObject::create(None);
        for (i, key) in keys.iter().enumerate() {
            let _ = obj.put(key, Value::from(i as u32));
        }
        b.iter(|| {
            let mut sum = 0.0;
            for key in &keys {
                if let Ok(Some(Value::Number(n))) = obj.get(key) {
                    sum += n;
                }
            }
            black_box(sum)
        });
    });

    c.bench_function("object_inherited_get", |b| {
        let proto = OrdinaryObject::create(None);
        let _ = proto.put(&keys[0], Value::from(1));
        let mut obj = proto;
        for _ in 0..8 {
            obj = OrdinaryObject::create(Some(obj));
        }
        b.iter(|| black_box(obj.get(&keys[0])));
    });
}

criterion_group!(benches, bench_key_to_int, bench_int_map, bench_object_access);
criterion_main!(benches);
