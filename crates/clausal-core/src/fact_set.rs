//! Insertion-ordered record sets
//!
//! `FactSet` is the storage primitive shared by fact maps and index buckets.
//! Iteration follows insertion order, which keeps scans and index lookups
//! deterministic across runs.

use ahash::RandomState;
use clausal_types::Record;
use indexmap::IndexSet;

/// Insertion-ordered set of records
#[derive(Debug, Clone, Default)]
pub struct FactSet {
    records: IndexSet<Record, RandomState>,
}

impl FactSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning `true` if it was not already present
    pub fn insert(&mut self, record: Record) -> bool {
        self.records.insert(record)
    }

    /// Remove a record, preserving the order of the remaining records
    pub fn remove(&mut self, record: &Record) -> bool {
        self.records.shift_remove(record)
    }

    /// Remove and return the earliest inserted record
    pub fn pop_first(&mut self) -> Option<Record> {
        self.records.shift_remove_index(0)
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.records.contains(record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Record at an insertion position
    pub fn get_index(&self, index: usize) -> Option<&Record> {
        self.records.get_index(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.records.iter()
    }

    /// Records in `self` or `other`; `self`'s records come first
    pub fn union(&self, other: &FactSet) -> FactSet {
        let mut result = self.clone();
        result.extend(other.iter().cloned());
        result
    }

    /// Records in both `self` and `other`, in `self`'s order
    pub fn intersection(&self, other: &FactSet) -> FactSet {
        self.iter().filter(|r| other.contains(r)).cloned().collect()
    }

    /// Records in `self` but not in `other`
    pub fn difference(&self, other: &FactSet) -> FactSet {
        self.iter().filter(|r| !other.contains(r)).cloned().collect()
    }

    /// Records in exactly one of `self` and `other`
    pub fn symmetric_difference(&self, other: &FactSet) -> FactSet {
        let mut result = self.difference(other);
        result.extend(other.iter().filter(|r| !self.contains(r)).cloned());
        result
    }

    pub fn is_subset(&self, other: &FactSet) -> bool {
        self.len() <= other.len() && self.iter().all(|r| other.contains(r))
    }

    pub fn is_superset(&self, other: &FactSet) -> bool {
        other.is_subset(self)
    }

    /// Consume the set into a vector in insertion order
    pub fn into_vec(self) -> Vec<Record> {
        self.records.into_iter().collect()
    }
}

impl PartialEq for FactSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }
}

impl Eq for FactSet {}

impl FromIterator<Record> for FactSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut set = FactSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<Record> for FactSet {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl IntoIterator for FactSet {
    type Item = Record;
    type IntoIter = indexmap::set::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a FactSet {
    type Item = &'a Record;
    type IntoIter = indexmap::set::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
