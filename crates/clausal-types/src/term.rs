use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A ground solver term.
///
/// Terms are the values that populate record fields. Their total order follows
/// the solver convention: `Infimum < Number < String < Function < Supremum`.
/// Functions compare by name, then by arguments, then by sign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// The smallest term
    Infimum,
    /// Integer term
    Number(i64),
    /// Quoted string term
    String(String),
    /// Function term. Constants are functions without arguments and tuples are
    /// functions with an empty name.
    Function {
        /// Function name (empty for tuples)
        name: String,
        /// Argument terms
        args: Vec<Term>,
        /// Classical negation sign (`false` renders as `-name(...)`)
        positive: bool,
    },
    /// The largest term
    Supremum,
}

impl Term {
    /// Create an integer term
    #[must_use]
    pub const fn number(value: i64) -> Self {
        Self::Number(value)
    }

    /// Create a string term
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Create a constant (a function term without arguments)
    #[must_use]
    pub fn constant(name: impl Into<String>) -> Self {
        Self::function(name, Vec::new())
    }

    /// Create a positive function term
    #[must_use]
    pub fn function(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Function { name: name.into(), args, positive: true }
    }

    /// Create a tuple term
    #[must_use]
    pub const fn tuple(args: Vec<Self>) -> Self {
        Self::Function { name: String::new(), args, positive: true }
    }

    /// Returns the same term with the sign flipped. Only function terms carry a
    /// sign; other terms are returned unchanged.
    #[must_use]
    pub fn negated(self) -> Self {
        match self {
            Self::Function { name, args, positive } => {
                Self::Function { name, args, positive: !positive }
            }
            other => other,
        }
    }

    /// Function name, or `None` for non-function terms
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Function { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Function arguments (empty for non-function terms)
    #[must_use]
    pub fn arguments(&self) -> &[Self] {
        match self {
            Self::Function { args, .. } => args,
            _ => &[],
        }
    }

    /// Whether this is a positive term. Non-function terms are always positive.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        match self {
            Self::Function { positive, .. } => *positive,
            _ => true,
        }
    }

    /// Whether this is a tuple (a function with an empty name)
    #[must_use]
    pub fn is_tuple(&self) -> bool {
        matches!(self, Self::Function { name, .. } if name.is_empty())
    }

    /// Integer value, if this is a number term
    #[must_use]
    pub const fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String value, if this is a string term
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Infimum => 0,
            Self::Number(_) => 1,
            Self::String(_) => 2,
            Self::Function { .. } => 3,
            Self::Supremum => 4,
        }
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (
                Self::Function { name: n1, args: a1, positive: p1 },
                Self::Function { name: n2, args: a2, positive: p2 },
            ) => n1
                .cmp(n2)
                .then_with(|| a1.len().cmp(&a2.len()))
                .then_with(|| a1.cmp(a2))
                .then_with(|| p1.cmp(p2)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in value.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infimum => f.write_str("#inf"),
            Self::Supremum => f.write_str("#sup"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write_quoted(f, s),
            Self::Function { name, args, positive } => {
                if !positive {
                    f.write_str("-")?;
                }
                f.write_str(name)?;
                if args.is_empty() && !name.is_empty() {
                    return Ok(());
                }
                f.write_str("(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{arg}")?;
                }
                if name.is_empty() && args.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Term {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_order_across_kinds() {
        let mut terms = vec![
            Term::Supremum,
            Term::constant("a"),
            Term::string("z"),
            Term::number(10),
            Term::Infimum,
            Term::number(-3),
        ];
        terms.sort();
        assert_eq!(
            terms,
            vec![
                Term::Infimum,
                Term::number(-3),
                Term::number(10),
                Term::string("z"),
                Term::constant("a"),
                Term::Supremum,
            ]
        );
    }

    #[test]
    fn test_function_order_name_then_arity_then_args() {
        let f1 = Term::function("f", vec![Term::number(2)]);
        let f2 = Term::function("f", vec![Term::number(1), Term::number(1)]);
        let g = Term::function("g", vec![]);
        assert!(f1 < f2);
        assert!(f2 < g);
        assert!(Term::function("f", vec![Term::number(1)]) < f1);
    }

    #[test]
    fn test_display() {
        assert_eq!(Term::number(-4).to_string(), "-4");
        assert_eq!(Term::string("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(Term::constant("foo").to_string(), "foo");
        assert_eq!(Term::constant("foo").negated().to_string(), "-foo");
        assert_eq!(
            Term::function("p", vec![Term::number(1), Term::string("x")]).to_string(),
            "p(1,\"x\")"
        );
        assert_eq!(Term::tuple(vec![Term::number(1), Term::number(2)]).to_string(), "(1,2)");
        assert_eq!(Term::tuple(vec![Term::number(1)]).to_string(), "(1,)");
        assert_eq!(Term::tuple(vec![]).to_string(), "()");
    }

    #[test]
    fn test_serde_round_trip() {
        let term = Term::function("p", vec![Term::number(1), Term::tuple(vec![Term::string("s")])]);
        let json = serde_json::to_string(&term).unwrap();
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(term, back);
    }
}
