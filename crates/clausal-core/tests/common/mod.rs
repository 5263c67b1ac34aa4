//! Shared fixtures for the integration tests
#![allow(dead_code)]

use clausal_types::{IntegerCodec, Record, RecordType, Schema, StringCodec, Term};

/// `f(anum, astr)` and `g(anum, astr)`
pub fn pair_types() -> (RecordType, RecordType) {
    let mut schema = Schema::new();
    let f = schema.define("f").field("anum", IntegerCodec).field("astr", StringCodec).build().unwrap();
    let g = schema.define("g").field("anum", IntegerCodec).field("astr", StringCodec).build().unwrap();
    (f, g)
}

/// `f(anum, aint, astr)`
pub fn triple_type() -> RecordType {
    let mut schema = Schema::new();
    schema
        .define("f")
        .field("anum", IntegerCodec)
        .field("aint", IntegerCodec)
        .field("astr", StringCodec)
        .build()
        .unwrap()
}

pub fn pair(record_type: &RecordType, n: i64, s: &str) -> Record {
    record_type.record(vec![Term::number(n), Term::string(s)]).unwrap()
}

pub fn triple(record_type: &RecordType, n: i64, i: i64, s: &str) -> Record {
    record_type.record(vec![Term::number(n), Term::number(i), Term::string(s)]).unwrap()
}

pub fn pairs(record_type: &RecordType, values: &[(i64, &str)]) -> Vec<Record> {
    values.iter().map(|(n, s)| pair(record_type, *n, s)).collect()
}

/// First field of a record as an integer
pub fn anum(record: &Record) -> i64 {
    record.field(0).and_then(Term::as_number).unwrap()
}

/// Install a test subscriber once; repeated calls are ignored
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("clausal_core=debug").try_init();
}
