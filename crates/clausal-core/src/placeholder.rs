//! Query placeholders and their bindings
//!
//! Placeholders stand in for values that are supplied when a query is bound.
//! Positional placeholders are filled by position, named placeholders by key
//! and may carry a default used when no value is bound.

use crate::error::{QueryError, QueryResult};
use clausal_types::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A stand-in for a value supplied at bind time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// Zero-based positional placeholder
    Positional(usize),
    /// Named placeholder with an optional default
    Named { name: String, default: Option<Value> },
}

/// First positional placeholder
pub const PH1: Placeholder = Placeholder::Positional(0);
/// Second positional placeholder
pub const PH2: Placeholder = Placeholder::Positional(1);
/// Third positional placeholder
pub const PH3: Placeholder = Placeholder::Positional(2);
/// Fourth positional placeholder
pub const PH4: Placeholder = Placeholder::Positional(3);

/// Positional placeholder by 1-based position.
///
/// # Panics
///
/// Panics if `position` is zero.
pub fn ph(position: usize) -> Placeholder {
    assert!(position > 0, "positional placeholders are numbered from 1");
    Placeholder::Positional(position - 1)
}

/// Named placeholder without a default
pub fn ph_named(name: impl Into<String>) -> Placeholder {
    Placeholder::Named { name: name.into(), default: None }
}

/// Named placeholder that falls back to `default` when unbound
pub fn ph_named_default(name: impl Into<String>, default: impl Into<Value>) -> Placeholder {
    Placeholder::Named { name: name.into(), default: Some(default.into()) }
}

impl Placeholder {
    /// Name of a named placeholder
    pub fn name(&self) -> Option<&str> {
        match self {
            Placeholder::Named { name, .. } => Some(name),
            Placeholder::Positional(_) => None,
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::Positional(index) => write!(f, "${}", index + 1),
            Placeholder::Named { name, default: None } => write!(f, "${name}"),
            Placeholder::Named { name, default: Some(value) } => write!(f, "${name}={value}"),
        }
    }
}

/// Values bound to placeholders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings from positional arguments
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self { positional: values.into_iter().map(Into::into).collect(), named: BTreeMap::new() }
    }

    /// Append the next positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Bind a named placeholder
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    pub fn named_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.named.keys().map(String::as_str)
    }

    /// Combine with later bindings; values in `later` take precedence.
    /// A non-empty positional list in `later` replaces the earlier one.
    pub fn merged(&self, later: &Bindings) -> Bindings {
        let positional =
            if later.positional.is_empty() { self.positional.clone() } else { later.positional.clone() };
        let mut named = self.named.clone();
        named.extend(later.named.iter().map(|(k, v)| (k.clone(), v.clone())));
        Bindings { positional, named }
    }

    /// Value for a placeholder, falling back to a named default.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnboundPlaceholder`] when no value is bound and the
    /// placeholder has no default.
    pub fn resolve(&self, placeholder: &Placeholder) -> QueryResult<Value> {
        let found = match placeholder {
            Placeholder::Positional(index) => self.positional.get(*index).cloned(),
            Placeholder::Named { name, default } => self.named.get(name).or(default.as_ref()).cloned(),
        };
        found.ok_or_else(|| QueryError::unbound_placeholder(placeholder))
    }
}
