//! Ordered field indexes
//!
//! A `FactIndex` maps the values of one field path to the records holding
//! them. Keys are kept in a sorted vector so that every comparison operator is
//! answered with a binary search: equality hits a single bucket, range
//! operators take a contiguous run of buckets.

use crate::condition::ComparisonOp;
use crate::error::{QueryError, QueryResult};
use crate::fact_set::FactSet;
use ahash::RandomState;
use clausal_types::{FieldPath, Record, Value};
use std::collections::HashMap;

/// Ordered index over one field path of a record type
#[derive(Debug, Clone)]
pub struct FactIndex {
    path: FieldPath,
    /// Distinct key values in ascending order
    keys: Vec<Value>,
    /// Key value -> records holding it, in insertion order
    buckets: HashMap<Value, FactSet, RandomState>,
}

impl FactIndex {
    /// Create an empty index over `path`. Aliases are ignored.
    pub fn new(path: &FieldPath) -> Self {
        Self { path: path.dealiased(), keys: Vec::new(), buckets: HashMap::default() }
    }

    /// The indexed path
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Add a record under the value of the indexed path
    pub fn insert(&mut self, record: &Record) -> QueryResult<()> {
        let key = self.path.resolve(record)?;
        match self.buckets.get_mut(&key) {
            Some(bucket) => {
                bucket.insert(record.clone());
            }
            None => {
                let at = self.keys.partition_point(|k| k < &key);
                self.keys.insert(at, key.clone());
                let mut bucket = FactSet::new();
                bucket.insert(record.clone());
                self.buckets.insert(key, bucket);
            }
        }
        Ok(())
    }

    /// Remove a record. Returns `true` if it was indexed.
    pub fn discard(&mut self, record: &Record) -> QueryResult<bool> {
        let key = self.path.resolve(record)?;
        let Some(bucket) = self.buckets.get_mut(&key) else {
            return Ok(false);
        };
        let removed = bucket.remove(record);
        if bucket.is_empty() {
            self.buckets.remove(&key);
            if let Ok(at) = self.keys.binary_search(&key) {
                self.keys.remove(at);
            }
        }
        Ok(removed)
    }

    /// Remove a record that must be present
    pub fn remove(&mut self, record: &Record) -> QueryResult<()> {
        if self.discard(record)? { Ok(()) } else { Err(QueryError::not_found("index remove", record)) }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.buckets.clear();
    }

    /// Distinct indexed values in ascending order
    pub fn keys(&self) -> &[Value] {
        &self.keys
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.buckets.values().map(FactSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Records whose indexed value satisfies `value <op> key`, in key order
    pub fn find(&self, op: ComparisonOp, key: &Value) -> FactSet {
        let lower = self.keys.partition_point(|k| k < key);
        let upper = self.keys.partition_point(|k| k <= key);
        let ranges: [&[Value]; 2] = match op {
            ComparisonOp::Eq => [&self.keys[lower..upper], &[]],
            ComparisonOp::Ne => [&self.keys[..lower], &self.keys[upper..]],
            ComparisonOp::Lt => [&self.keys[..lower], &[]],
            ComparisonOp::Le => [&self.keys[..upper], &[]],
            ComparisonOp::Gt => [&self.keys[upper..], &[]],
            ComparisonOp::Ge => [&self.keys[lower..], &[]],
        };
        ranges
            .into_iter()
            .flatten()
            .filter_map(|k| self.buckets.get(k))
            .flat_map(|bucket| bucket.iter().cloned())
            .collect()
    }

    /// Get statistics about the index
    pub fn stats(&self) -> FactIndexStats {
        FactIndexStats { path: self.path.to_string(), distinct_keys: self.keys.len(), total_records: self.len() }
    }
}

/// Statistics about an index
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FactIndexStats {
    pub path: String,
    pub distinct_keys: usize,
    pub total_records: usize,
}

impl FactIndexStats {
    /// Average records per distinct key (lower means better selectivity)
    pub fn avg_records_per_key(&self) -> f64 {
        if self.distinct_keys == 0 { 0.0 } else { self.total_records as f64 / self.distinct_keys as f64 }
    }
}
