use crate::schema::{RecordType, RecordTypeId};
use crate::term::Term;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

struct RecordData {
    record_type: RecordType,
    positive: bool,
    fields: Vec<Term>,
}

/// An immutable, typed fact.
///
/// Records are cheap to clone (shared handle) and compare by value: record
/// type, then sign (negative before positive), then fields in order.
#[derive(Clone)]
pub struct Record(Arc<RecordData>);

impl Record {
    pub(crate) fn from_parts(record_type: RecordType, positive: bool, fields: Vec<Term>) -> Self {
        Self(Arc::new(RecordData { record_type, positive, fields }))
    }

    /// The record's type
    #[must_use]
    pub fn record_type(&self) -> &RecordType {
        &self.0.record_type
    }

    /// Identifier of the record's type
    #[must_use]
    pub fn type_id(&self) -> RecordTypeId {
        self.0.record_type.id()
    }

    /// Predicate name of the record's type
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.record_type.name()
    }

    /// Whether the record is positive (not classically negated)
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0.positive
    }

    /// Field values in declaration order
    #[must_use]
    pub fn fields(&self) -> &[Term] {
        &self.0.fields
    }

    /// Field value by position
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Term> {
        self.0.fields.get(index)
    }

    /// Field value by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.0.record_type.field_def(name).and_then(|(i, _)| self.0.fields.get(i))
    }

    /// Number of fields
    #[must_use]
    pub fn arity(&self) -> usize {
        self.0.fields.len()
    }

    /// A copy of this record with the sign flipped
    #[must_use]
    pub fn negated(&self) -> Self {
        Self::from_parts(self.0.record_type.clone(), !self.0.positive, self.0.fields.clone())
    }

    /// Raw solver term for this record
    #[must_use]
    pub fn to_term(&self) -> Term {
        Term::Function {
            name: self.0.record_type.name().to_string(),
            args: self.0.fields.clone(),
            positive: self.0.positive,
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.type_id() == other.type_id()
                && self.0.positive == other.0.positive
                && self.0.fields == other.0.fields)
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id().hash(state);
        self.0.positive.hash(state);
        self.0.fields.hash(state);
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_id()
            .cmp(&other.type_id())
            .then_with(|| self.0.positive.cmp(&other.0.positive))
            .then_with(|| self.0.fields.cmp(&other.0.fields))
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_term())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({self})")
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Record", 3)?;
        state.serialize_field("type", self.0.record_type.name_or_tuple())?;
        state.serialize_field("positive", &self.0.positive)?;
        state.serialize_field("fields", &self.0.fields)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::{IntegerCodec, StringCodec};
    use crate::schema::Schema;
    use crate::term::Term;

    #[test]
    fn test_record_order_sign_then_fields() {
        let mut schema = Schema::new();
        let f = schema.define("f").field("a", IntegerCodec).field("b", StringCodec).build().unwrap();
        let pos1 = f.record(vec![Term::number(1), Term::string("b")]).unwrap();
        let pos2 = f.record(vec![Term::number(2), Term::string("a")]).unwrap();
        let neg9 = f.negative_record(vec![Term::number(9), Term::string("z")]).unwrap();
        let mut records = vec![pos2.clone(), pos1.clone(), neg9.clone()];
        records.sort();
        assert_eq!(records, vec![neg9, pos1, pos2]);
    }

    #[test]
    fn test_record_accessors_and_display() {
        let mut schema = Schema::new();
        let f = schema.define("f").field("a", IntegerCodec).field("b", StringCodec).build().unwrap();
        let record = f.record(vec![Term::number(1), Term::string("x")]).unwrap();
        assert_eq!(record.get("b"), Some(&Term::string("x")));
        assert_eq!(record.get("c"), None);
        assert_eq!(record.to_string(), "f(1,\"x\")");
        assert_eq!(record.negated().to_string(), "-f(1,\"x\")");
        assert_eq!(record, f.record(vec![Term::number(1), Term::string("x")]).unwrap());
    }
}
