//! The fact base
//!
//! A `FactBase` maps record types to their [`FactMap`]s. It behaves like a set
//! of records (membership, set algebra, equality by content) and is the entry
//! point for declarative queries through [`FactBase::select`] and
//! [`FactBase::delete`].
//!
//! A fact base can defer its population to a factory that runs on first
//! access. Until then the base is in its pending state; the first read or
//! write moves it to the ready state exactly once.

use crate::config::{EngineConfig, FactTextConfig};
use crate::error::{QueryError, QueryResult};
use crate::fact_map::{FactMap, FactMapStats};
use crate::planner::IndexCatalog;
use crate::query::{Delete, Select};
use crate::query_spec::QuerySpec;
use crate::serialization::fact_maps_text;
use clausal_types::{FieldPath, Record, RecordType, RecordTypeId};
use indexmap::IndexMap;
use indexmap::map::Entry;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::{info, instrument, warn};

type Factory = Box<dyn FnOnce() -> Vec<Record> + Send>;

/// Fact maps keyed by record type, in order of first use
#[derive(Debug, Clone, Default)]
struct FactStore {
    maps: IndexMap<RecordTypeId, FactMap>,
}

impl FactStore {
    fn populated(records: impl IntoIterator<Item = Record>, indexes: &[FieldPath]) -> Self {
        let mut store = Self::default();
        for record in records {
            if let Err(err) = store.add(record, indexes) {
                warn!(error = %err, "Skipping record during population");
            }
        }
        store
    }

    fn map(&self, type_id: RecordTypeId) -> Option<&FactMap> {
        self.maps.get(&type_id)
    }

    fn map_mut(&mut self, type_id: RecordTypeId) -> Option<&mut FactMap> {
        self.maps.get_mut(&type_id)
    }

    /// Fact map of `record_type`, created with the matching index paths
    fn map_or_create(&mut self, record_type: &RecordType, indexes: &[FieldPath]) -> QueryResult<&mut FactMap> {
        match self.maps.entry(record_type.id()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let paths = indexes.iter().filter(|p| p.type_id() == record_type.id());
                Ok(entry.insert(FactMap::with_indexes(record_type, paths)?))
            }
        }
    }

    fn add(&mut self, record: Record, indexes: &[FieldPath]) -> QueryResult<bool> {
        let record_type = record.record_type().clone();
        self.map_or_create(&record_type, indexes)?.add(record)
    }
}

/// Population that has not run yet
struct Pending {
    factory: Mutex<Option<Factory>>,
    store: OnceLock<FactStore>,
}

impl Pending {
    fn force(&self, indexes: &[FieldPath]) -> &FactStore {
        self.store.get_or_init(|| {
            let factory = self.factory.lock().unwrap_or_else(PoisonError::into_inner).take();
            let records = factory.map(|produce| produce()).unwrap_or_default();
            info!(records = records.len(), "Populating deferred fact base");
            FactStore::populated(records, indexes)
        })
    }

    fn into_store(self, indexes: &[FieldPath]) -> FactStore {
        self.force(indexes);
        self.store.into_inner().unwrap_or_default()
    }
}

/// A set of records grouped by type, with optional field indexes
pub struct FactBase {
    store: FactStore,
    pending: Option<Box<Pending>>,
    indexes: Vec<FieldPath>,
    config: EngineConfig,
}

impl FactBase {
    /// Empty fact base without indexes
    pub fn new() -> Self {
        Self::with_indexes(Vec::<FieldPath>::new())
    }

    /// Empty fact base indexed on `indexes`. Declaration order is index
    /// priority.
    pub fn with_indexes<I, P>(indexes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPath>,
    {
        let mut paths: Vec<FieldPath> = Vec::new();
        for path in indexes.into_iter().map(|p| p.into().dealiased()) {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        Self { store: FactStore::default(), pending: None, indexes: paths, config: EngineConfig::default() }
    }

    /// Fact base holding `records`
    #[instrument(skip_all)]
    pub fn from_records<R, I, P>(records: R, indexes: I) -> Self
    where
        R: IntoIterator<Item = Record>,
        I: IntoIterator<Item = P>,
        P: Into<FieldPath>,
    {
        let mut base = Self::with_indexes(indexes);
        base.store = FactStore::populated(records, &base.indexes);
        base
    }

    /// Fact base populated by `factory` on first access
    pub fn deferred<F, I, P>(factory: F, indexes: I) -> Self
    where
        F: FnOnce() -> Vec<Record> + Send + 'static,
        I: IntoIterator<Item = P>,
        P: Into<FieldPath>,
    {
        let mut base = Self::with_indexes(indexes);
        base.pending =
            Some(Box::new(Pending { factory: Mutex::new(Some(Box::new(factory))), store: OnceLock::new() }));
        base
    }

    /// Replace the engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a deferred population is still waiting to run
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| p.store.get().is_none())
    }

    fn store(&self) -> &FactStore {
        match &self.pending {
            Some(pending) => pending.force(&self.indexes),
            None => &self.store,
        }
    }

    fn store_mut(&mut self) -> &mut FactStore {
        if let Some(pending) = self.pending.take() {
            self.store = pending.into_store(&self.indexes);
        }
        &mut self.store
    }

    /// Index paths in priority order
    pub fn indexes(&self) -> &[FieldPath] {
        &self.indexes
    }

    pub(crate) fn catalog(&self) -> IndexCatalog {
        self.indexes.iter().collect()
    }

    /// Fact map of each root's type, `None` where the type has no map yet
    pub(crate) fn maps_for(&self, roots: &[FieldPath]) -> Vec<Option<&FactMap>> {
        let store = self.store();
        roots.iter().map(|root| store.map(root.type_id())).collect()
    }

    pub(crate) fn map_mut(&mut self, type_id: RecordTypeId) -> Option<&mut FactMap> {
        self.store_mut().map_mut(type_id)
    }

    /// Add a record. Returns `false` if it was already present.
    pub fn add(&mut self, record: Record) -> QueryResult<bool> {
        let indexes = self.indexes.clone();
        self.store_mut().add(record, &indexes)
    }

    /// Add every record, returning how many were new
    pub fn add_all(&mut self, records: impl IntoIterator<Item = Record>) -> QueryResult<usize> {
        let mut added = 0;
        for record in records {
            added += usize::from(self.add(record)?);
        }
        Ok(added)
    }

    /// Remove a record. With strict removal configured (the default) a missing
    /// record is [`QueryError::NotFound`].
    pub fn remove(&mut self, record: &Record) -> QueryResult<()> {
        if self.discard(record)? || !self.config.strict_remove {
            Ok(())
        } else {
            Err(QueryError::not_found("remove", record))
        }
    }

    /// Remove a record if present. Returns `true` if it was removed.
    pub fn discard(&mut self, record: &Record) -> QueryResult<bool> {
        match self.map_mut(record.type_id()) {
            Some(map) => map.discard(record),
            None => Ok(false),
        }
    }

    /// Remove and return some record: the earliest inserted of the first
    /// non-empty type
    pub fn pop(&mut self) -> QueryResult<Option<Record>> {
        match self.store_mut().maps.values_mut().find(|m| !m.is_empty()) {
            Some(map) => map.pop(),
            None => Ok(None),
        }
    }

    /// Remove every record, keeping the per-type maps and their indexes
    pub fn clear(&mut self) {
        self.store_mut().maps.values_mut().for_each(FactMap::clear);
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.store().map(record.type_id()).is_some_and(|m| m.contains(record))
    }

    pub fn len(&self) -> usize {
        self.store().maps.values().map(FactMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.store().maps.values().all(FactMap::is_empty)
    }

    /// Records grouped by type, each type in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.store().maps.values().flat_map(FactMap::iter)
    }

    /// All records
    pub fn facts(&self) -> Vec<Record> {
        self.iter().cloned().collect()
    }

    /// Record types that have a fact map
    pub fn record_types(&self) -> Vec<RecordType> {
        self.store().maps.values().map(|m| m.record_type().clone()).collect()
    }

    /// The fact map of one type
    pub fn fact_map(&self, record_type: &RecordType) -> Option<&FactMap> {
        self.store().map(record_type.id())
    }

    /// Get statistics about every fact map
    pub fn stats(&self) -> FactBaseStats {
        let maps: Vec<FactMapStats> = self.store().maps.values().map(FactMap::stats).collect();
        FactBaseStats { record_types: maps.len(), facts: maps.iter().map(|m| m.facts).sum(), maps }
    }

    /// Start a query over `roots`
    pub fn select<I, P>(&self, roots: I) -> QueryResult<Select<'_>>
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPath>,
    {
        let spec = QuerySpec::new(roots.into_iter().map(Into::into).collect())?;
        Ok(Select::new(self, spec))
    }

    /// Start a deletion over `roots`
    pub fn delete<I, P>(&mut self, roots: I) -> QueryResult<Delete<'_>>
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPath>,
    {
        let spec = QuerySpec::new(roots.into_iter().map(Into::into).collect())?;
        Ok(Delete::new(self, spec))
    }

    /// Remove every record taking part in a match of `spec`, typically a
    /// [`Select`] released with [`Select::into_spec`]. Ordering, grouping and
    /// projection clauses do not change what is removed.
    pub fn delete_matching(&mut self, spec: QuerySpec) -> QueryResult<usize> {
        Delete::new(self, spec).execute()
    }

    /// Fact text using the configured format
    pub fn asp_str(&self) -> String {
        self.asp_str_with(&self.config.fact_text)
    }

    /// Fact text using an explicit format
    pub fn asp_str_with(&self, config: &FactTextConfig) -> String {
        fact_maps_text(self.store().maps.values(), config)
    }

    /// A fact base with this base's indexes and configuration holding `store`
    fn derived(&self, store: FactStore) -> FactBase {
        FactBase { store, pending: None, indexes: self.indexes.clone(), config: self.config.clone() }
    }

    /// Records in either base. The result keeps this base's indexes.
    pub fn union(&self, other: &FactBase) -> QueryResult<FactBase> {
        let mut result = self.clone();
        result.update(other)?;
        Ok(result)
    }

    pub fn intersection(&self, other: &FactBase) -> QueryResult<FactBase> {
        let mut result = self.clone();
        result.intersection_update(other)?;
        Ok(result)
    }

    pub fn difference(&self, other: &FactBase) -> QueryResult<FactBase> {
        let mut result = self.clone();
        result.difference_update(other)?;
        Ok(result)
    }

    pub fn symmetric_difference(&self, other: &FactBase) -> QueryResult<FactBase> {
        let mut result = self.clone();
        result.symmetric_difference_update(other)?;
        Ok(result)
    }

    pub fn update(&mut self, other: &FactBase) -> QueryResult<()> {
        let indexes = self.indexes.clone();
        let store = self.store_mut();
        for theirs in other.store().maps.values() {
            store.map_or_create(theirs.record_type(), &indexes)?.update(theirs)?;
        }
        Ok(())
    }

    pub fn intersection_update(&mut self, other: &FactBase) -> QueryResult<()> {
        let theirs = other.store();
        for ours in self.store_mut().maps.values_mut() {
            match theirs.map(ours.type_id()) {
                Some(map) => ours.intersection_update(map)?,
                None => ours.clear(),
            }
        }
        Ok(())
    }

    pub fn difference_update(&mut self, other: &FactBase) -> QueryResult<()> {
        let theirs = other.store();
        for ours in self.store_mut().maps.values_mut() {
            if let Some(map) = theirs.map(ours.type_id()) {
                ours.difference_update(map)?;
            }
        }
        Ok(())
    }

    pub fn symmetric_difference_update(&mut self, other: &FactBase) -> QueryResult<()> {
        let indexes = self.indexes.clone();
        let store = self.store_mut();
        for theirs in other.store().maps.values() {
            store.map_or_create(theirs.record_type(), &indexes)?.symmetric_difference_update(theirs)?;
        }
        Ok(())
    }

    /// Whether every record of this base is in `other`
    pub fn is_subset(&self, other: &FactBase) -> bool {
        self.len() <= other.len() && self.iter().all(|r| other.contains(r))
    }

    pub fn is_superset(&self, other: &FactBase) -> bool {
        other.is_subset(self)
    }
}

impl Default for FactBase {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for FactBase {
    fn clone(&self) -> Self {
        self.derived(self.store().clone())
    }
}

impl fmt::Debug for FactBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pending() {
            return f.debug_struct("FactBase").field("pending", &true).field("indexes", &self.indexes).finish();
        }
        f.debug_struct("FactBase")
            .field("facts", &self.store().maps.values().collect::<Vec<_>>())
            .field("indexes", &self.indexes)
            .finish()
    }
}

impl fmt::Display for FactBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, record) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{record}")?;
        }
        f.write_str("}")
    }
}

/// Content equality, independent of insertion order and indexes
impl PartialEq for FactBase {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }
}

impl Eq for FactBase {}

/// Ordered by the subset relation
impl PartialOrd for FactBase {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.is_subset(other), other.is_subset(self)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }
}

impl FromIterator<Record> for FactBase {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::from_records(iter, Vec::<FieldPath>::new())
    }
}

impl Extend<Record> for FactBase {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        let indexes = self.indexes.clone();
        let store = self.store_mut();
        for record in iter {
            if let Err(err) = store.add(record, &indexes) {
                warn!(error = %err, "Skipping record");
            }
        }
    }
}

/// Statistics about a fact base
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FactBaseStats {
    pub record_types: usize,
    pub facts: usize,
    pub maps: Vec<FactMapStats>,
}
