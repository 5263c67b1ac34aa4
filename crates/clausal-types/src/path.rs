//! Field paths.
//!
//! A [`FieldPath`] is a typed reference to a record or to a (possibly nested)
//! field of a record. Paths are the vocabulary of queries: conditions, orderings,
//! projections and indexes are all expressed with them. Two paths are equal when
//! they share the root type, alias and field positions; field names are carried
//! for display only.

use crate::error::SchemaError;
use crate::record::Record;
use crate::schema::{RecordType, RecordTypeId};
use crate::term::Term;
use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Typed reference to a record root or one of its fields
#[derive(Clone)]
pub struct FieldPath {
    root_type: RecordType,
    alias: Option<Arc<str>>,
    steps: Vec<usize>,
    labels: Vec<Arc<str>>,
    target: Option<RecordType>,
}

impl FieldPath {
    pub(crate) fn root_of(root_type: RecordType, alias: Option<Arc<str>>) -> Self {
        Self {
            target: Some(root_type.clone()),
            root_type,
            alias,
            steps: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Identifier of the root record type
    #[must_use]
    pub fn type_id(&self) -> RecordTypeId {
        self.root_type.id()
    }

    /// Root record type
    #[must_use]
    pub const fn record_type(&self) -> &RecordType {
        &self.root_type
    }

    /// Alias of the root, if any
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Field positions from the root
    #[must_use]
    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    /// Whether this path designates the record itself
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Nested record type designated by this path (root type for root paths)
    #[must_use]
    pub const fn target_type(&self) -> Option<&RecordType> {
        self.target.as_ref()
    }

    /// The root of this path, keeping the alias
    #[must_use]
    pub fn root(&self) -> Self {
        Self::root_of(self.root_type.clone(), self.alias.clone())
    }

    /// The same path with the alias removed
    #[must_use]
    pub fn dealiased(&self) -> Self {
        Self { alias: None, ..self.clone() }
    }

    /// Sub-path of a named field.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NotComplex`] when this path does not designate a
    /// record or complex term, and [`SchemaError::UnknownField`] when the field
    /// does not exist.
    pub fn field(&self, name: &str) -> Result<Self, SchemaError> {
        let target = self.target.as_ref().ok_or_else(|| SchemaError::NotComplex { field: self.to_string() })?;
        let (index, def) = target.field_def(name).ok_or_else(|| SchemaError::UnknownField {
            record_type: target.name_or_tuple().to_string(),
            field: name.to_string(),
        })?;
        Ok(self.extended(index, def.name(), def.record_type().cloned()))
    }

    /// Sub-path of a field by position.
    ///
    /// # Errors
    ///
    /// Same as [`FieldPath::field`].
    pub fn field_at(&self, index: usize) -> Result<Self, SchemaError> {
        let target = self.target.as_ref().ok_or_else(|| SchemaError::NotComplex { field: self.to_string() })?;
        let def = target.fields().get(index).ok_or_else(|| SchemaError::UnknownField {
            record_type: target.name_or_tuple().to_string(),
            field: index.to_string(),
        })?;
        Ok(self.extended(index, def.name(), def.record_type().cloned()))
    }

    fn extended(&self, index: usize, label: &str, target: Option<RecordType>) -> Self {
        let mut steps = self.steps.clone();
        steps.push(index);
        let mut labels = self.labels.clone();
        labels.push(Arc::from(label));
        Self { root_type: self.root_type.clone(), alias: self.alias.clone(), steps, labels, target }
    }

    /// Borrow the term this path designates within `record`. Returns `None` for
    /// root paths, records of another type, or malformed nested terms.
    #[must_use]
    pub fn resolve_term<'r>(&self, record: &'r Record) -> Option<&'r Term> {
        if record.type_id() != self.type_id() {
            return None;
        }
        let (first, rest) = self.steps.split_first()?;
        let mut term = record.field(*first)?;
        for step in rest {
            term = match term {
                Term::Function { args, .. } => args.get(*step)?,
                _ => return None,
            };
        }
        Some(term)
    }

    /// Extract the value this path designates from `record`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::TypeMismatch`] when the record is not of the root
    /// type, and [`SchemaError::NotComplex`] when a nested value has the wrong shape.
    pub fn resolve(&self, record: &Record) -> Result<Value, SchemaError> {
        if record.type_id() != self.type_id() {
            return Err(SchemaError::type_mismatch(
                self.root_type.name_or_tuple(),
                record.record_type().name_or_tuple(),
            ));
        }
        if self.is_root() {
            return Ok(Value::Record(record.clone()));
        }
        self.resolve_term(record)
            .cloned()
            .map(Value::Term)
            .ok_or_else(|| SchemaError::NotComplex { field: self.to_string() })
    }
}

impl From<&RecordType> for FieldPath {
    fn from(record_type: &RecordType) -> Self {
        record_type.path()
    }
}

impl PartialEq for FieldPath {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id() && self.alias == other.alias && self.steps == other.steps
    }
}

impl Eq for FieldPath {}

impl Hash for FieldPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id().hash(state);
        self.alias.hash(state);
        self.steps.hash(state);
    }
}

impl Ord for FieldPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_id()
            .cmp(&other.type_id())
            .then_with(|| self.alias.cmp(&other.alias))
            .then_with(|| self.steps.cmp(&other.steps))
    }
}

impl PartialOrd for FieldPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => f.write_str(alias)?,
            None => f.write_str(self.root_type.name_or_tuple())?,
        }
        for label in &self.labels {
            write!(f, ".{label}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPath({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{IntegerCodec, StringCodec};
    use crate::schema::Schema;

    fn fixture() -> (RecordType, RecordType) {
        let mut schema = Schema::new();
        let pair = schema.define_tuple().field("x", IntegerCodec).field("y", IntegerCodec).build().unwrap();
        let g = schema
            .define("g")
            .field("name", StringCodec)
            .complex("pos", &pair)
            .build()
            .unwrap();
        (pair, g)
    }

    #[test]
    fn test_nested_paths_resolve() {
        let (_, g) = fixture();
        let record = g
            .record(vec![Term::string("a"), Term::tuple(vec![Term::number(3), Term::number(4)])])
            .unwrap();
        let y = g.field("pos").unwrap().field("y").unwrap();
        assert_eq!(y.steps(), &[1, 1]);
        assert_eq!(y.to_string(), "g.pos.y");
        assert_eq!(y.resolve(&record).unwrap(), Value::Term(Term::number(4)));
        assert_eq!(g.path().resolve(&record).unwrap(), Value::Record(record.clone()));
    }

    #[test]
    fn test_field_errors() {
        let (_, g) = fixture();
        assert!(matches!(g.field("nope"), Err(SchemaError::UnknownField { .. })));
        let name = g.field("name").unwrap();
        assert!(matches!(name.field("x"), Err(SchemaError::NotComplex { .. })));
        assert!(matches!(g.path().field_at(5), Err(SchemaError::UnknownField { .. })));
    }

    #[test]
    fn test_resolve_type_mismatch() {
        let (pair, g) = fixture();
        let record = pair.record(vec![Term::number(1), Term::number(2)]).unwrap();
        assert!(matches!(g.field("name").unwrap().resolve(&record), Err(SchemaError::TypeMismatch { .. })));
    }

    #[test]
    fn test_alias_identity() {
        let (_, g) = fixture();
        let plain = g.field("name").unwrap();
        let aliased = g.alias("G2").field("name").unwrap();
        assert_ne!(plain, aliased);
        assert_eq!(plain, aliased.dealiased());
        assert_eq!(aliased.to_string(), "G2.name");
        assert_eq!(aliased.root(), g.alias("G2"));
        assert_eq!(g.path().field_at(0).unwrap(), plain);
    }
}
