use criterion::{black_box, criterion_group, criterion_main, Criterion};
use transmap::{json, Entity, Mapper, MappingRegistry, Record, Transform, Value};

fn plus_one(v: Value) -> Value {
    v.as_i64().map_or(Value::Null, |n| json!(n + 1))
}

fn minus_one(v: Value) -> Value {
    v.as_i64().map_or(Value::Null, |n| json!(n - 1))
}

fn registry(width: usize) -> MappingRegistry {
    let mut registry = MappingRegistry::new();
    registry.simple_map((0..width).map(|i| (format!("field_{i}"), format!("externalField{i}"))));
    for i in 0..width {
        registry.transform_map(
            format!("derived_{i}"),
            format!("externalDerived{i}"),
            Transform::Resolved(minus_one),
            Transform::Resolved(plus_one),
        );
    }
    registry
}

fn sample(width: usize) -> Record {
    let mut record = Record::new();
    for i in 0..width {
        record.insert(format!("externalField{i}"), json!(i));
        record.insert(format!("externalDerived{i}"), json!(i));
        record.insert(format!("unmapped{i}"), json!(true));
    }
    record
}

fn from_record_bench(c: &mut Criterion) {
    let registry = registry(16);
    let mapper = Mapper::new(&registry).with_observer(());
    let record = sample(16);

    c.bench_function("from_record", |b| {
        b.iter(|| mapper.from_record::<Entity>(black_box(&record)))
    });
}

fn to_record_bench(c: &mut Criterion) {
    let registry = registry(16);
    let mapper = Mapper::new(&registry).with_observer(());
    let entity: Entity = match mapper.from_record(&sample(16)) {
        Ok(entity) => entity,
        Err(err) => panic!("{err}"),
    };

    c.bench_function("to_record", |b| b.iter(|| mapper.to_record(black_box(&entity))));
}

criterion_group!(benches, from_record_bench, to_record_bench);
criterion_main!(benches);
