use clausal_core::{Bindings, FactBase, asc, eq, ge, ph_named};
use clausal_types::{FieldPath, IntegerCodec, Record, RecordType, Schema, StringCodec, Term};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

fn types() -> (RecordType, RecordType) {
    let mut schema = Schema::new();
    let person = schema
        .define("person")
        .field("id", IntegerCodec)
        .field("age", IntegerCodec)
        .field("city", StringCodec)
        .build()
        .unwrap();
    let order = schema.define("order").field("id", IntegerCodec).field("person", IntegerCodec).build().unwrap();
    (person, order)
}

fn generate_records(person: &RecordType, order: &RecordType, count: usize) -> Vec<Record> {
    let people = (0..count as i64).map(|i| {
        person
            .record(vec![Term::number(i), Term::number(18 + i % 60), Term::string(format!("city_{}", i % 20))])
            .unwrap()
    });
    let orders = (0..count as i64 * 2)
        .map(|i| order.record(vec![Term::number(i), Term::number(i % count as i64)]).unwrap());
    people.chain(orders).collect()
}

fn indexed_base(person: &RecordType, order: &RecordType, count: usize) -> FactBase {
    let indexes: Vec<FieldPath> =
        vec![person.field("city").unwrap(), person.field("id").unwrap(), order.field("person").unwrap()];
    FactBase::from_records(generate_records(person, order, count), indexes)
}

fn bench_population(c: &mut Criterion) {
    let (person, order) = types();
    let mut group = c.benchmark_group("population");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(10);

    for size in [1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("from_records", size), size, |b, &size| {
            b.iter_batched(
                || generate_records(&person, &order, size),
                |records| {
                    black_box(FactBase::from_records(
                        records,
                        [person.field("city").unwrap(), order.field("person").unwrap()],
                    ))
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let (person, order) = types();
    let mut group = c.benchmark_group("select");
    group.sample_size(20);

    for size in [1_000, 10_000].iter() {
        let base = indexed_base(&person, &order, *size);
        let plain = FactBase::from_records(generate_records(&person, &order, *size), Vec::<FieldPath>::new());
        let city = person.field("city").unwrap();

        group.bench_with_input(BenchmarkId::new("indexed_eq", size), &base, |b, base| {
            let query = base.select([&person]).unwrap().where_(eq(city.clone(), ph_named("city"))).unwrap();
            b.iter(|| black_box(query.bind(Bindings::new().named("city", "city_7")).unwrap().count().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("scan_eq", size), &plain, |b, base| {
            let query = base.select([&person]).unwrap().where_(eq(city.clone(), "city_7")).unwrap();
            b.iter(|| black_box(query.count().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("range_ordered", size), &base, |b, base| {
            let age = person.field("age").unwrap();
            let query =
                base.select([&person]).unwrap().where_(ge(age.clone(), 60)).unwrap().order_by([asc(age)]).unwrap();
            b.iter(|| black_box(query.all().unwrap().count()));
        });
    }
    group.finish();
}

fn bench_join(c: &mut Criterion) {
    let (person, order) = types();
    let mut group = c.benchmark_group("join");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(10);

    for size in [1_000, 5_000].iter() {
        let base = indexed_base(&person, &order, *size);
        group.bench_with_input(BenchmarkId::new("person_orders", size), &base, |b, base| {
            let query = base
                .select([&person, &order])
                .unwrap()
                .join([eq(person.field("id").unwrap(), order.field("person").unwrap())])
                .unwrap()
                .where_(eq(person.field("city").unwrap(), "city_3"))
                .unwrap();
            b.iter(|| black_box(query.count().unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_population, bench_select, bench_join);
criterion_main!(benches);
