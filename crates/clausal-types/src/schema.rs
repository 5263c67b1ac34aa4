//! Record type definitions and the schema registry.
//!
//! Record types are registered in a [`Schema`]. Each type gets a
//! [`RecordTypeId`] that is unique for the lifetime of the process, so records
//! built from different schemas never compare equal. Nested (complex) field
//! types refer to other registered types by handle rather than by ownership.

use crate::codec::{ComplexCodec, TermCodec};
use crate::error::SchemaError;
use crate::path::FieldPath;
use crate::record::Record;
use crate::term::Term;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_TYPE_ID: AtomicU32 = AtomicU32::new(0);

/// Process-wide identifier of a record type. Identifiers increase in
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordTypeId(u32);

impl fmt::Display for RecordTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, positioned field of a record type
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    codec: Arc<dyn TermCodec>,
}

impl FieldDef {
    /// Field name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Codec governing accepted terms
    #[must_use]
    pub fn codec(&self) -> &dyn TermCodec {
        self.codec.as_ref()
    }

    /// Nested record type, when this is a complex field
    #[must_use]
    pub fn record_type(&self) -> Option<&RecordType> {
        self.codec.record_type()
    }
}

struct RecordTypeData {
    id: RecordTypeId,
    name: String,
    fields: Vec<FieldDef>,
    is_tuple: bool,
}

/// Shared handle to a registered record type
#[derive(Clone)]
pub struct RecordType(Arc<RecordTypeData>);

impl RecordType {
    /// Process-wide identifier
    #[must_use]
    pub fn id(&self) -> RecordTypeId {
        self.0.id
    }

    /// Predicate name (empty for tuple types)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Predicate name, or `"tuple"` for tuple types
    #[must_use]
    pub fn name_or_tuple(&self) -> &str {
        if self.0.is_tuple { "tuple" } else { &self.0.name }
    }

    /// Whether instances render as anonymous tuples
    #[must_use]
    pub fn is_tuple(&self) -> bool {
        self.0.is_tuple
    }

    /// Number of fields
    #[must_use]
    pub fn arity(&self) -> usize {
        self.0.fields.len()
    }

    /// Field definitions in declaration order
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.0.fields
    }

    /// Position and definition of a named field
    #[must_use]
    pub fn field_def(&self, name: &str) -> Option<(usize, &FieldDef)> {
        self.0.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    /// Build a positive record of this type, validating every field value.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Arity`] when the number of values differs from the
    /// arity and [`SchemaError::InvalidField`] when a codec rejects a value.
    pub fn record(&self, fields: Vec<Term>) -> Result<Record, SchemaError> {
        self.build_record(true, fields)
    }

    /// Build a classically negated record of this type.
    ///
    /// # Errors
    ///
    /// Same as [`RecordType::record`].
    pub fn negative_record(&self, fields: Vec<Term>) -> Result<Record, SchemaError> {
        self.build_record(false, fields)
    }

    fn build_record(&self, positive: bool, fields: Vec<Term>) -> Result<Record, SchemaError> {
        if fields.len() != self.arity() {
            return Err(SchemaError::Arity {
                record_type: self.name_or_tuple().to_string(),
                expected: self.arity(),
                actual: fields.len(),
            });
        }
        for (def, term) in self.0.fields.iter().zip(&fields) {
            if !def.codec.unifies(term) {
                return Err(SchemaError::InvalidField {
                    field: def.name.clone(),
                    codec: def.codec.name().to_string(),
                    term: term.to_string(),
                });
            }
        }
        Ok(Record::from_parts(self.clone(), positive, fields))
    }

    /// Whether a raw term unifies with this type
    #[must_use]
    pub fn unifies(&self, term: &Term) -> bool {
        match term {
            Term::Function { name, args, .. } => {
                let name_matches = if self.0.is_tuple { name.is_empty() } else { *name == self.0.name };
                name_matches
                    && args.len() == self.arity()
                    && self.0.fields.iter().zip(args).all(|(def, arg)| def.codec.unifies(arg))
            }
            _ => false,
        }
    }

    /// Convert a raw term into a record of this type, if it unifies
    #[must_use]
    pub fn unify(&self, term: &Term) -> Option<Record> {
        if !self.unifies(term) {
            return None;
        }
        match term {
            Term::Function { args, positive, .. } => {
                Some(Record::from_parts(self.clone(), *positive, args.clone()))
            }
            _ => None,
        }
    }

    /// Root path of this type (the record itself)
    #[must_use]
    pub fn path(&self) -> FieldPath {
        FieldPath::root_of(self.clone(), None)
    }

    /// Aliased root path, used to reference the same type twice in a query
    #[must_use]
    pub fn alias(&self, name: impl Into<Arc<str>>) -> FieldPath {
        FieldPath::root_of(self.clone(), Some(name.into()))
    }

    /// Path of a top-level field.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownField`] if no such field exists.
    pub fn field(&self, name: &str) -> Result<FieldPath, SchemaError> {
        self.path().field(name)
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for RecordType {}

impl Hash for RecordType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("id", &self.0.id)
            .field("name", &self.name_or_tuple())
            .field("arity", &self.arity())
            .finish()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name_or_tuple(), self.arity())
    }
}

/// Registry of record types
#[derive(Debug, Default)]
pub struct Schema {
    types: Vec<RecordType>,
    by_id: HashMap<RecordTypeId, usize>,
    signatures: HashMap<(String, usize), RecordTypeId>,
}

impl Schema {
    /// Create an empty schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start defining a named record type
    pub fn define(&mut self, name: impl Into<String>) -> RecordTypeBuilder<'_> {
        RecordTypeBuilder { schema: self, name: name.into(), is_tuple: false, fields: Vec::new() }
    }

    /// Start defining an anonymous tuple type
    pub fn define_tuple(&mut self) -> RecordTypeBuilder<'_> {
        RecordTypeBuilder { schema: self, name: String::new(), is_tuple: true, fields: Vec::new() }
    }

    /// Look up a type by identifier
    #[must_use]
    pub fn get(&self, id: RecordTypeId) -> Option<&RecordType> {
        self.by_id.get(&id).and_then(|i| self.types.get(*i))
    }

    /// Look up a named type by predicate signature
    #[must_use]
    pub fn lookup(&self, name: &str, arity: usize) -> Option<&RecordType> {
        self.signatures.get(&(name.to_string(), arity)).and_then(|id| self.get(*id))
    }

    /// All registered types in registration order
    pub fn iter(&self) -> impl Iterator<Item = &RecordType> {
        self.types.iter()
    }

    /// Number of registered types
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Convert raw solver terms into records of the registered named types.
    /// Terms that match no type are skipped.
    pub fn unify<'t>(&self, terms: impl IntoIterator<Item = &'t Term>) -> Vec<Record> {
        terms
            .into_iter()
            .filter_map(|term| match term {
                Term::Function { name, args, .. } if !name.is_empty() => {
                    self.lookup(name, args.len()).and_then(|rt| rt.unify(term))
                }
                _ => None,
            })
            .collect()
    }
}

/// Builder returned by [`Schema::define`] and [`Schema::define_tuple`]
pub struct RecordTypeBuilder<'s> {
    schema: &'s mut Schema,
    name: String,
    is_tuple: bool,
    fields: Vec<FieldDef>,
}

impl RecordTypeBuilder<'_> {
    /// Add a field with the given codec
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, codec: impl TermCodec + 'static) -> Self {
        self.fields.push(FieldDef { name: name.into(), codec: Arc::new(codec) });
        self
    }

    /// Add a field holding values of a nested record type
    #[must_use]
    pub fn complex(self, name: impl Into<String>, record_type: &RecordType) -> Self {
        self.field(name, ComplexCodec::new(record_type.clone()))
    }

    /// Register the type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Definition`] for an empty predicate name, duplicate
    /// field names, or a signature that is already registered.
    pub fn build(self) -> Result<RecordType, SchemaError> {
        if !self.is_tuple && self.name.is_empty() {
            return Err(SchemaError::definition("record type name must not be empty"));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(SchemaError::definition(format!("field {i} has an empty name")));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::definition(format!("duplicate field name '{}'", field.name)));
            }
        }
        let signature = (self.name.clone(), self.fields.len());
        if !self.is_tuple && self.schema.signatures.contains_key(&signature) {
            return Err(SchemaError::definition(format!(
                "record type '{}/{}' is already registered",
                signature.0, signature.1
            )));
        }

        let id = RecordTypeId(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed));
        let record_type = RecordType(Arc::new(RecordTypeData {
            id,
            name: self.name,
            fields: self.fields,
            is_tuple: self.is_tuple,
        }));
        if !self.is_tuple {
            self.schema.signatures.insert(signature, id);
        }
        self.schema.by_id.insert(id, self.schema.types.len());
        self.schema.types.push(record_type.clone());
        Ok(record_type)
    }
}
