//! Field codecs.
//!
//! A codec decides which solver terms a field accepts. Unification of raw terms
//! against record types is driven entirely by the codecs of each field.

use crate::schema::RecordType;
use crate::term::Term;
use std::fmt;

/// Term acceptance rule for a record field
pub trait TermCodec: fmt::Debug + Send + Sync {
    /// Short codec name used in error messages
    fn name(&self) -> &str;

    /// Whether the term is a valid value for this codec
    fn unifies(&self, term: &Term) -> bool;

    /// The record type described by this codec, for complex fields
    fn record_type(&self) -> Option<&RecordType> {
        None
    }
}

/// Accepts number terms
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerCodec;

/// Accepts string terms
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

/// Accepts positive constants (function terms without arguments)
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantCodec;

/// Accepts any term
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

/// Accepts terms that unify with a nested record type
#[derive(Debug, Clone)]
pub struct ComplexCodec {
    record_type: RecordType,
}

impl TermCodec for IntegerCodec {
    fn name(&self) -> &str {
        "integer"
    }

    fn unifies(&self, term: &Term) -> bool {
        matches!(term, Term::Number(_))
    }
}

impl TermCodec for StringCodec {
    fn name(&self) -> &str {
        "string"
    }

    fn unifies(&self, term: &Term) -> bool {
        matches!(term, Term::String(_))
    }
}

impl TermCodec for ConstantCodec {
    fn name(&self) -> &str {
        "constant"
    }

    fn unifies(&self, term: &Term) -> bool {
        matches!(term, Term::Function { name, args, positive: true } if !name.is_empty() && args.is_empty())
    }
}

impl TermCodec for RawCodec {
    fn name(&self) -> &str {
        "raw"
    }

    fn unifies(&self, _term: &Term) -> bool {
        true
    }
}

impl ComplexCodec {
    /// Codec for fields holding values of `record_type`
    #[must_use]
    pub const fn new(record_type: RecordType) -> Self {
        Self { record_type }
    }
}

impl TermCodec for ComplexCodec {
    fn name(&self) -> &str {
        self.record_type.name_or_tuple()
    }

    fn unifies(&self, term: &Term) -> bool {
        self.record_type.unifies(term)
    }

    fn record_type(&self) -> Option<&RecordType> {
        Some(&self.record_type)
    }
}
