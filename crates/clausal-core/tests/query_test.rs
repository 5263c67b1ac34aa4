//! Select queries over a single record type: index-backed filtering,
//! placeholders, ordering, grouping and projection.

mod common;

use clausal_core::*;
use clausal_types::{Record, Value};
use common::{anum, init_tracing, pair, pairs, triple, triple_type};

fn records(rows: Rows<'_>) -> Vec<Record> {
    rows.filter_map(|row| row.unwrap().as_record().cloned()).collect()
}

#[test]
fn test_where_served_by_index() {
    init_tracing();
    let f = triple_type();
    let aint = f.field("aint").unwrap();
    let base = FactBase::from_records(
        [triple(&f, 1, 10, "bbb"), triple(&f, 2, 20, "aaa"), triple(&f, 3, 20, "aaa")],
        [aint.clone()],
    );

    let query = base.select([&f]).unwrap().where_(eq(aint.clone(), 20)).unwrap();
    let found = records(query.all().unwrap());
    assert_eq!(found.iter().map(anum).collect::<Vec<_>>(), vec![2, 3]);

    let plan = query.query_plan().unwrap();
    let key = plan.prejoin_key(&f.path()).expect("plan should use the index");
    assert_eq!(key.path, aint);
    assert_eq!(key.lookups[0].op, ComparisonOp::Eq);
    assert_eq!(key.priority, 0);
    let rendered = plan.to_string();
    println!("{rendered}");
    assert!(rendered.contains("prejoin key: f.aint == 20"));
}

#[test]
fn test_disjunction_on_indexed_field_uses_index() {
    let f = triple_type();
    let aint = f.field("aint").unwrap();
    let base = FactBase::from_records(
        (1..=5).map(|n| triple(&f, n, n * 10, "x")),
        [aint.clone()],
    );

    let query = base
        .select([&f])
        .unwrap()
        .where_(or_([eq(aint.clone(), 10), eq(aint.clone(), 30)]))
        .unwrap();
    let key = query.query_plan().unwrap().prejoin_key(&f.path()).cloned().expect("plan should use the index");
    assert_eq!(key.lookups.len(), 2);
    assert_eq!(records(query.all().unwrap()).iter().map(anum).collect::<Vec<_>>(), vec![1, 3]);

    // overlapping lookups return each record once
    let overlapping = base
        .select([&f])
        .unwrap()
        .where_(or_([lt(aint.clone(), 40), ge(aint.clone(), 20)]))
        .unwrap();
    assert!(overlapping.query_plan().unwrap().prejoin_key(&f.path()).is_some());
    assert_eq!(overlapping.count().unwrap(), 5);

    let placeholders = base
        .select([&f])
        .unwrap()
        .where_(or_([eq(aint.clone(), PH1), eq(aint, PH2)]))
        .unwrap()
        .bind(Bindings::positional([50, 20]))
        .unwrap();
    let mut found: Vec<i64> = records(placeholders.all().unwrap()).iter().map(anum).collect();
    found.sort();
    assert_eq!(found, vec![2, 5]);
}

#[test]
fn test_rows_are_results_ordered_or_not() {
    let (f, _) = common::pair_types();
    let base = FactBase::from_records(pairs(&f, &[(2, "b"), (1, "a")]), Vec::<clausal_types::FieldPath>::new());
    let query = base.select([&f]).unwrap().select([f.field("astr").unwrap()]).unwrap();

    let unordered: Vec<Output> = query.all().unwrap().collect::<QueryResult<_>>().unwrap();
    assert_eq!(unordered, vec![Output::from(Value::from("b")), Output::from(Value::from("a"))]);

    let ordered = query.order_by([asc(f.field("anum").unwrap())]).unwrap();
    let sorted: Vec<Output> = ordered.all().unwrap().collect::<QueryResult<_>>().unwrap();
    assert_eq!(sorted, vec![Output::from(Value::from("a")), Output::from(Value::from("b"))]);
    assert!(ordered.all().unwrap().all(|row| row.is_ok()));
    assert_eq!(ordered.count().unwrap(), 2);
}

#[test]
fn test_where_without_index_scans() {
    let f = triple_type();
    let base = FactBase::from_records(
        [triple(&f, 1, 10, "bbb"), triple(&f, 2, 20, "aaa"), triple(&f, 3, 20, "aaa")],
        Vec::<clausal_types::FieldPath>::new(),
    );
    let query = base.select([&f]).unwrap().where_(ne(f.field("astr").unwrap(), "aaa")).unwrap();
    assert!(query.query_plan().unwrap().prejoin_key(&f.path()).is_none());
    assert_eq!(records(query.all().unwrap()).iter().map(anum).collect::<Vec<_>>(), vec![1]);
}

#[test]
fn test_range_and_compound_conditions() {
    let f = triple_type();
    let anum_path = f.field("anum").unwrap();
    let aint = f.field("aint").unwrap();
    let base = FactBase::from_records(
        (1..=10).map(|n| triple(&f, n, n * 10, if n % 2 == 0 { "even" } else { "odd" })),
        [aint.clone()],
    );

    let query = base
        .select([&f])
        .unwrap()
        .where_(and_([ge(aint.clone(), 30), lt(aint.clone(), 70), eq(f.field("astr").unwrap(), "odd")]))
        .unwrap();
    assert_eq!(records(query.all().unwrap()).iter().map(anum).collect::<Vec<_>>(), vec![3, 5]);

    let either = base.select([&f]).unwrap().where_(or_([lt(anum_path.clone(), 2), gt(anum_path.clone(), 9)])).unwrap();
    assert_eq!(either.count().unwrap(), 2);

    let negated = base.select([&f]).unwrap().where_(not_(le(anum_path, 8))).unwrap();
    assert_eq!(negated.count().unwrap(), 2);
}

#[test]
fn test_function_condition() {
    let f = triple_type();
    let base = FactBase::from_records([triple(&f, 1, 10, "x"), triple(&f, 2, 21, "y")], [f.field("aint").unwrap()]);
    let odd = func([f.field("aint").unwrap()], |values: &[Value]| {
        values[0].as_term().and_then(|t| t.as_number()).is_some_and(|n| n % 2 == 1)
    });
    let found = records(base.select([&f]).unwrap().where_(odd).unwrap().all().unwrap());
    assert_eq!(found.iter().map(anum).collect::<Vec<_>>(), vec![2]);
}

#[test]
fn test_named_placeholder_default_matches_literal() {
    let f = triple_type();
    let aint = f.field("aint").unwrap();
    let base = FactBase::from_records(
        [triple(&f, 1, 10, "bbb"), triple(&f, 2, 20, "aaa"), triple(&f, 3, 20, "aaa")],
        [aint.clone()],
    );

    let literal = records(base.select([&f]).unwrap().where_(eq(aint.clone(), 20)).unwrap().all().unwrap());
    let defaulted = base.select([&f]).unwrap().where_(eq(aint.clone(), ph_named_default("v", 20))).unwrap();
    assert_eq!(records(defaulted.all().unwrap()), literal);

    let rebound = defaulted.bind(Bindings::new().named("v", 10)).unwrap();
    assert_eq!(records(rebound.all().unwrap()).iter().map(anum).collect::<Vec<_>>(), vec![1]);
}

#[test]
fn test_positional_placeholder_binding() {
    let f = triple_type();
    let anum_path = f.field("anum").unwrap();
    let base = FactBase::from_records([triple(&f, 1, 10, "a"), triple(&f, 2, 20, "b")], [anum_path.clone()]);

    let query = base.select([&f]).unwrap().where_(eq(anum_path, PH1)).unwrap();
    assert!(matches!(query.all(), Err(QueryError::UnboundPlaceholder { .. })));
    assert_eq!(query.query_plan().unwrap().placeholders(), &[PH1]);

    let bound = query.bind(Bindings::positional([2])).unwrap();
    assert_eq!(bound.singleton().unwrap().as_record().map(anum), Some(2));
    assert!(matches!(query.bind(Bindings::new().named("missing", 1)), Err(QueryError::InvalidExpression { .. })));
}

#[test]
fn test_group_by_first_order_key() {
    let (f, _) = common::pair_types();
    let astr = f.field("astr").unwrap();
    let base = FactBase::from_records(pairs(&f, &[(1, "a"), (2, "a"), (3, "b")]), [astr.clone()]);

    let groups: Vec<(Vec<Value>, Vec<i64>)> = base
        .select([&f])
        .unwrap()
        .order_by([desc(astr)])
        .unwrap()
        .group_by(1)
        .unwrap()
        .all()
        .unwrap()
        .map(|(key, members)| (key, members.filter_map(|m| m.as_record().map(anum)).collect()))
        .collect();

    assert_eq!(groups, vec![(vec![Value::from("b")], vec![3]), (vec![Value::from("a")], vec![1, 2])]);
}

#[test]
fn test_group_by_requires_order_keys() {
    let (f, _) = common::pair_types();
    let base = FactBase::from_records(pairs(&f, &[(1, "a")]), Vec::<clausal_types::FieldPath>::new());
    assert!(base.select([&f]).unwrap().group_by(1).is_err());
}

#[test]
fn test_order_by_is_stable() {
    let f = triple_type();
    let aint = f.field("aint").unwrap();
    let base = FactBase::from_records(
        [triple(&f, 1, 10, "c"), triple(&f, 2, 20, "b"), triple(&f, 3, 20, "a"), triple(&f, 4, 10, "d")],
        Vec::<clausal_types::FieldPath>::new(),
    );

    let ascending = records(base.select([&f]).unwrap().order_by([asc(aint.clone())]).unwrap().all().unwrap());
    assert_eq!(ascending.iter().map(anum).collect::<Vec<_>>(), vec![1, 4, 2, 3]);

    let descending = records(base.select([&f]).unwrap().order_by([desc(aint.clone())]).unwrap().all().unwrap());
    assert_eq!(descending.iter().map(anum).collect::<Vec<_>>(), vec![2, 3, 1, 4]);

    let two_keys = records(
        base.select([&f]).unwrap().order_by([asc(aint), desc(f.field("astr").unwrap())]).unwrap().all().unwrap(),
    );
    assert_eq!(two_keys.iter().map(anum).collect::<Vec<_>>(), vec![4, 1, 2, 3]);
}

#[test]
fn test_projection_and_count() {
    let (f, _) = common::pair_types();
    let astr = f.field("astr").unwrap();
    let base = FactBase::from_records(pairs(&f, &[(1, "a"), (2, "a"), (3, "b")]), [astr.clone()]);

    let query = base.select([&f]).unwrap().order_by([asc(astr.clone())]).unwrap().select([astr.clone()]).unwrap();
    let values: Vec<Output> = query.all().unwrap().collect::<QueryResult<_>>().unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[0], Output::from(Value::from("a")));

    let distinct: Vec<Output> = query.unique().all().unwrap().collect::<QueryResult<_>>().unwrap();
    assert_eq!(distinct, vec![Output::from(Value::from("a")), Output::from(Value::from("b"))]);
    assert_eq!(query.unique().count().unwrap(), 2);

    let both = base
        .select([&f])
        .unwrap()
        .where_(eq(astr.clone(), "b"))
        .unwrap()
        .select([f.field("anum").unwrap(), astr])
        .unwrap();
    let row = both.singleton().unwrap();
    assert_eq!(row.values().len(), 2);
    assert_eq!(row.values()[1], Value::from("b"));
}

#[test]
fn test_first_and_singleton() {
    let (f, _) = common::pair_types();
    let base = FactBase::from_records(pairs(&f, &[(5, "q"), (6, "r")]), Vec::<clausal_types::FieldPath>::new());
    let query = base.select([&f]).unwrap();
    assert_eq!(query.first().unwrap().as_record(), Some(&pair(&f, 5, "q")));
    assert_eq!(query.singleton(), Err(QueryError::AmbiguousResult));
    let nothing = query.where_(gt(f.field("anum").unwrap(), 100)).unwrap();
    assert_eq!(nothing.count().unwrap(), 0);
    assert_eq!(nothing.first(), Err(QueryError::EmptyResult));
}

#[test]
fn test_query_on_absent_type_is_empty() {
    let (f, g) = common::pair_types();
    let base = FactBase::from_records(pairs(&f, &[(1, "a")]), Vec::<clausal_types::FieldPath>::new());
    assert_eq!(base.select([&g]).unwrap().count().unwrap(), 0);
}

#[test]
fn test_clause_errors() {
    let (f, g) = common::pair_types();
    let base = FactBase::new();
    let query = base.select([&f]).unwrap();
    let foreign = query.where_(eq(g.field("anum").unwrap(), 1));
    assert!(matches!(foreign, Err(QueryError::InvalidExpression { .. })));
    let ordered = query.order_by([asc(f.field("anum").unwrap())]).unwrap();
    assert!(matches!(ordered.order_by([desc(f.field("anum").unwrap())]), Err(QueryError::MultipleClause { .. })));
    assert!(base.select(Vec::<clausal_types::FieldPath>::new()).is_err());
}

mod stability {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        /// Records with equal sort keys keep their insertion order
        #[test]
        fn order_by_keeps_insertion_order_of_ties(keys in prop::collection::vec("[a-c]", 0..30), descending in any::<bool>()) {
            let (f, _) = common::pair_types();
            let astr = f.field("astr").unwrap();
            let inserted: Vec<Record> = keys.iter().enumerate().map(|(i, k)| pair(&f, i as i64, k)).collect();
            let base = FactBase::from_records(inserted.clone(), Vec::<clausal_types::FieldPath>::new());

            let ordering = if descending { desc(astr.clone()) } else { asc(astr.clone()) };
            let sorted = records(base.select([&f]).unwrap().order_by([ordering]).unwrap().all().unwrap());

            let mut expected = inserted;
            expected.sort_by(|a, b| {
                let by_key = a.field(1).cmp(&b.field(1));
                if descending { by_key.reverse() } else { by_key }
            });
            prop_assert_eq!(sorted, expected);
        }
    }
}
