//! Per-type record containers
//!
//! A `FactMap` holds every record of one record type together with the
//! indexes declared for that type. The record set and all indexes are kept in
//! step: every mutation either updates all of them or fails before touching any.

use crate::condition::ComparisonOp;
use crate::config::FactTextConfig;
use crate::error::{QueryError, QueryResult};
use crate::fact_index::{FactIndex, FactIndexStats};
use crate::fact_set::FactSet;
use crate::serialization::fact_map_text;
use clausal_types::{FieldPath, Record, RecordType, RecordTypeId, Value};
use tracing::trace;

/// Records of a single type plus their indexes. Index declaration order is
/// index priority: earlier indexes win when several could serve a lookup.
#[derive(Debug, Clone)]
pub struct FactMap {
    record_type: RecordType,
    facts: FactSet,
    indexes: Vec<FactIndex>,
}

impl FactMap {
    /// Empty map without indexes
    pub fn new(record_type: &RecordType) -> Self {
        Self { record_type: record_type.clone(), facts: FactSet::new(), indexes: Vec::new() }
    }

    /// Empty map indexed on `paths`. Duplicate paths (after dealiasing) are
    /// collapsed onto their first declaration.
    pub fn with_indexes<'p>(
        record_type: &RecordType,
        paths: impl IntoIterator<Item = &'p FieldPath>,
    ) -> QueryResult<Self> {
        let mut map = Self::new(record_type);
        for path in paths {
            if path.type_id() != record_type.id() {
                return Err(QueryError::type_mismatch(format!(
                    "cannot index '{path}' on a fact map of '{record_type}'"
                )));
            }
            if map.get_index(path).is_none() {
                map.indexes.push(FactIndex::new(path));
            }
        }
        Ok(map)
    }

    fn with_contents(&self, facts: FactSet) -> QueryResult<Self> {
        let mut map = Self::with_indexes(&self.record_type, self.indexes.iter().map(FactIndex::path))?;
        for record in facts {
            map.add(record)?;
        }
        Ok(map)
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn type_id(&self) -> RecordTypeId {
        self.record_type.id()
    }

    fn check_type(&self, record: &Record) -> QueryResult<()> {
        if record.type_id() == self.type_id() {
            Ok(())
        } else {
            Err(QueryError::type_mismatch(format!(
                "record '{record}' does not belong in a fact map of '{}'",
                self.record_type
            )))
        }
    }

    /// Insert a record into the set and every index. Returns `false` if the
    /// record was already present.
    pub fn add(&mut self, record: Record) -> QueryResult<bool> {
        self.check_type(&record)?;
        if self.facts.contains(&record) {
            return Ok(false);
        }
        for index in &mut self.indexes {
            index.insert(&record)?;
        }
        trace!(record = %record, indexes = self.indexes.len(), "Indexed record");
        Ok(self.facts.insert(record))
    }

    /// Remove a record if present. Returns `true` if it was removed.
    pub fn discard(&mut self, record: &Record) -> QueryResult<bool> {
        self.check_type(record)?;
        if !self.facts.remove(record) {
            return Ok(false);
        }
        for index in &mut self.indexes {
            index.discard(record)?;
        }
        trace!(record = %record, "Unindexed record");
        Ok(true)
    }

    /// Remove a record that must be present
    pub fn remove(&mut self, record: &Record) -> QueryResult<()> {
        if self.discard(record)? { Ok(()) } else { Err(QueryError::not_found("remove", record)) }
    }

    /// Remove and return the earliest inserted record
    pub fn pop(&mut self) -> QueryResult<Option<Record>> {
        let Some(record) = self.facts.pop_first() else {
            return Ok(None);
        };
        for index in &mut self.indexes {
            index.discard(&record)?;
        }
        trace!(record = %record, "Unindexed record");
        Ok(Some(record))
    }

    pub fn clear(&mut self) {
        self.facts.clear();
        self.indexes.iter_mut().for_each(FactIndex::clear);
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.facts.contains(record)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn facts(&self) -> &FactSet {
        &self.facts
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.facts.iter()
    }

    /// Indexes in priority order
    pub fn indexes(&self) -> &[FactIndex] {
        &self.indexes
    }

    /// Index over `path`, ignoring aliases
    pub fn get_index(&self, path: &FieldPath) -> Option<&FactIndex> {
        let path = path.dealiased();
        self.indexes.iter().find(|index| *index.path() == path)
    }

    /// Priority (declaration position) of the index over `path`
    pub fn index_priority(&self, path: &FieldPath) -> Option<usize> {
        let path = path.dealiased();
        self.indexes.iter().position(|index| *index.path() == path)
    }

    /// Index lookup. Returns `None` when `path` is not indexed.
    pub fn find(&self, path: &FieldPath, op: ComparisonOp, key: &Value) -> Option<FactSet> {
        self.get_index(path).map(|index| index.find(op, key))
    }

    fn check_other(&self, other: &FactMap) -> QueryResult<()> {
        if other.type_id() == self.type_id() {
            Ok(())
        } else {
            Err(QueryError::type_mismatch(format!(
                "cannot combine fact maps of '{}' and '{}'",
                self.record_type, other.record_type
            )))
        }
    }

    /// Records in either map. The result keeps this map's indexes.
    pub fn union(&self, other: &FactMap) -> QueryResult<FactMap> {
        self.check_other(other)?;
        self.with_contents(self.facts.union(&other.facts))
    }

    pub fn intersection(&self, other: &FactMap) -> QueryResult<FactMap> {
        self.check_other(other)?;
        self.with_contents(self.facts.intersection(&other.facts))
    }

    pub fn difference(&self, other: &FactMap) -> QueryResult<FactMap> {
        self.check_other(other)?;
        self.with_contents(self.facts.difference(&other.facts))
    }

    pub fn symmetric_difference(&self, other: &FactMap) -> QueryResult<FactMap> {
        self.check_other(other)?;
        self.with_contents(self.facts.symmetric_difference(&other.facts))
    }

    pub fn update(&mut self, other: &FactMap) -> QueryResult<()> {
        self.check_other(other)?;
        for record in other.iter() {
            self.add(record.clone())?;
        }
        Ok(())
    }

    pub fn intersection_update(&mut self, other: &FactMap) -> QueryResult<()> {
        self.check_other(other)?;
        let doomed = self.facts.difference(&other.facts);
        for record in &doomed {
            self.discard(record)?;
        }
        Ok(())
    }

    pub fn difference_update(&mut self, other: &FactMap) -> QueryResult<()> {
        self.check_other(other)?;
        for record in other.iter() {
            self.discard(record)?;
        }
        Ok(())
    }

    pub fn symmetric_difference_update(&mut self, other: &FactMap) -> QueryResult<()> {
        self.check_other(other)?;
        for record in other.iter() {
            if !self.discard(record)? {
                self.add(record.clone())?;
            }
        }
        Ok(())
    }

    pub fn is_subset(&self, other: &FactMap) -> bool {
        self.type_id() == other.type_id() && self.facts.is_subset(&other.facts)
    }

    /// Fact text of this map, one statement per line
    pub fn asp_str(&self) -> String {
        fact_map_text(self, &FactTextConfig::default())
    }

    /// Get statistics about the map and its indexes
    pub fn stats(&self) -> FactMapStats {
        FactMapStats {
            record_type: self.record_type.to_string(),
            facts: self.facts.len(),
            indexes: self.indexes.iter().map(FactIndex::stats).collect(),
        }
    }
}

/// Statistics about a fact map
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FactMapStats {
    pub record_type: String,
    pub facts: usize,
    pub indexes: Vec<FactIndexStats>,
}
