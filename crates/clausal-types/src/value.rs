use crate::record::Record;
use crate::term::Term;
use serde::Serialize;
use std::fmt;

/// A value produced by resolving a field path: a term for field paths, a whole
/// record for root paths. Terms order before records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A field value
    Term(Term),
    /// A whole record
    Record(Record),
}

impl Value {
    /// The term, if this is a field value
    #[must_use]
    pub const fn as_term(&self) -> Option<&Term> {
        match self {
            Self::Term(term) => Some(term),
            Self::Record(_) => None,
        }
    }

    /// The record, if this is a whole record
    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Term(_) => None,
        }
    }

    /// Convert to a raw term (records become function terms)
    #[must_use]
    pub fn into_term(self) -> Term {
        match self {
            Self::Term(term) => term,
            Self::Record(record) => record.to_term(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term(term) => write!(f, "{term}"),
            Self::Record(record) => write!(f, "{record}"),
        }
    }
}

impl From<Term> for Value {
    fn from(term: Term) -> Self {
        Self::Term(term)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<&Record> for Value {
    fn from(record: &Record) -> Self {
        Self::Record(record.clone())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Term(Term::Number(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Term(Term::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Term(Term::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Term(Term::String(value))
    }
}
