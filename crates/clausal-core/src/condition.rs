//! Condition trees
//!
//! Conditions are the filter and join language of queries. A condition is a
//! boolean tree whose leaves compare field paths with literal values,
//! placeholders, or other field paths, or apply an opaque predicate function
//! to a list of field values.
//!
//! The tree is simplified before planning: constant comparisons fold, nested
//! conjunctions flatten, and negations are pushed down to the leaves so that
//! indexable comparisons stay visible at the top level of a conjunction.

use crate::error::{QueryError, QueryResult};
use crate::placeholder::{Bindings, Placeholder};
use clausal_types::{FieldPath, Record, Term, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Binary comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// How attractive a comparison is as a join key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JoinPreference {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl ComparisonOp {
    /// Apply the operator to two values
    pub fn compare(self, left: &Value, right: &Value) -> bool {
        self.accepts(left.cmp(right))
    }

    /// Whether the operator holds for the given ordering of left to right
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Eq => ordering == Ordering::Equal,
            ComparisonOp::Ne => ordering != Ordering::Equal,
            ComparisonOp::Lt => ordering == Ordering::Less,
            ComparisonOp::Le => ordering != Ordering::Greater,
            ComparisonOp::Gt => ordering == Ordering::Greater,
            ComparisonOp::Ge => ordering != Ordering::Less,
        }
    }

    /// Operator to use when the operands are swapped
    pub fn mirrored(self) -> Self {
        match self {
            ComparisonOp::Eq => ComparisonOp::Eq,
            ComparisonOp::Ne => ComparisonOp::Ne,
            ComparisonOp::Lt => ComparisonOp::Gt,
            ComparisonOp::Le => ComparisonOp::Ge,
            ComparisonOp::Gt => ComparisonOp::Lt,
            ComparisonOp::Ge => ComparisonOp::Le,
        }
    }

    /// Logical complement
    pub fn negated(self) -> Self {
        match self {
            ComparisonOp::Eq => ComparisonOp::Ne,
            ComparisonOp::Ne => ComparisonOp::Eq,
            ComparisonOp::Lt => ComparisonOp::Ge,
            ComparisonOp::Le => ComparisonOp::Gt,
            ComparisonOp::Gt => ComparisonOp::Le,
            ComparisonOp::Ge => ComparisonOp::Lt,
        }
    }

    pub fn preference(self) -> JoinPreference {
        match self {
            ComparisonOp::Eq => JoinPreference::High,
            ComparisonOp::Ne => JoinPreference::Low,
            _ => JoinPreference::Medium,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Path(FieldPath),
    Value(Value),
    Placeholder(Placeholder),
}

impl Operand {
    pub fn as_path(&self) -> Option<&FieldPath> {
        match self {
            Operand::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Resolve to a value against a row; placeholders never resolve
    fn value(&self, row: &dyn RowSource) -> Option<Value> {
        match self {
            Operand::Path(path) => row.value(path),
            Operand::Value(value) => Some(value.clone()),
            Operand::Placeholder(_) => None,
        }
    }

    fn bind(&self, bindings: &Bindings) -> QueryResult<Operand> {
        match self {
            Operand::Placeholder(ph) => bindings.resolve(ph).map(Operand::Value),
            other => Ok(other.clone()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Path(path) => write!(f, "{path}"),
            Operand::Value(value) => write!(f, "{value}"),
            Operand::Placeholder(ph) => write!(f, "{ph}"),
        }
    }
}

impl From<FieldPath> for Operand {
    fn from(path: FieldPath) -> Self {
        Operand::Path(path)
    }
}

impl From<&FieldPath> for Operand {
    fn from(path: &FieldPath) -> Self {
        Operand::Path(path.clone())
    }
}

impl From<Placeholder> for Operand {
    fn from(ph: Placeholder) -> Self {
        Operand::Placeholder(ph)
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<Term> for Operand {
    fn from(term: Term) -> Self {
        Operand::Value(Value::Term(term))
    }
}

impl From<Record> for Operand {
    fn from(record: Record) -> Self {
        Operand::Value(Value::Record(record))
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Value(value.into())
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Value(value.into())
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Value(value.into())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::Value(value.into())
    }
}

/// A binary comparison leaf
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comparison {
    pub op: ComparisonOp,
    pub left: Operand,
    pub right: Operand,
}

impl Comparison {
    pub fn new(op: ComparisonOp, left: Operand, right: Operand) -> Self {
        Self { op, left, right }
    }

    /// The equivalent comparison with operands swapped
    pub fn swapped(&self) -> Self {
        Self { op: self.op.mirrored(), left: self.right.clone(), right: self.left.clone() }
    }

    /// Whether both sides are paths over different roots
    pub fn is_join(&self) -> bool {
        match (&self.left, &self.right) {
            (Operand::Path(l), Operand::Path(r)) => !same_root(l, r),
            _ => false,
        }
    }

    /// The comparison rearranged so that the left side is a path over `root`
    pub fn aligned_to(&self, root: &FieldPath) -> Option<Self> {
        let on_root = |op: &Operand| op.as_path().is_some_and(|p| same_root(p, root));
        if on_root(&self.left) {
            Some(self.clone())
        } else if on_root(&self.right) {
            Some(self.swapped())
        } else {
            None
        }
    }

    fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        [&self.left, &self.right].into_iter().filter_map(Operand::as_path)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

type PredicateFn = dyn Fn(&[Value]) -> bool + Send + Sync;

/// An opaque predicate over a list of field values
#[derive(Clone)]
pub struct FuncCondition {
    paths: Vec<FieldPath>,
    func: Arc<PredicateFn>,
    negated: bool,
}

impl FuncCondition {
    pub fn paths(&self) -> &[FieldPath] {
        &self.paths
    }

    fn evaluate(&self, row: &dyn RowSource) -> bool {
        let values: Option<Vec<Value>> = self.paths.iter().map(|p| row.value(p)).collect();
        match values {
            Some(values) => (self.func)(&values) != self.negated,
            None => false,
        }
    }
}

impl PartialEq for FuncCondition {
    fn eq(&self, other: &Self) -> bool {
        self.negated == other.negated && self.paths == other.paths && Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for FuncCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncCondition").field("paths", &self.paths).field("negated", &self.negated).finish()
    }
}

/// Resolves field paths against the records of a candidate row
pub trait RowSource {
    fn value(&self, path: &FieldPath) -> Option<Value>;
}

impl RowSource for Record {
    fn value(&self, path: &FieldPath) -> Option<Value> {
        path.resolve(self).ok()
    }
}

/// A tuple of records aligned with the root paths they were bound to
pub struct TupleRow<'a> {
    roots: &'a [FieldPath],
    records: &'a [Record],
}

impl<'a> TupleRow<'a> {
    pub fn new(roots: &'a [FieldPath], records: &'a [Record]) -> Self {
        Self { roots, records }
    }
}

impl RowSource for TupleRow<'_> {
    fn value(&self, path: &FieldPath) -> Option<Value> {
        let position = self.roots.iter().position(|root| same_root(root, path))?;
        self.records.get(position).and_then(|record| path.resolve(record).ok())
    }
}

pub(crate) fn same_root(a: &FieldPath, b: &FieldPath) -> bool {
    a.type_id() == b.type_id() && a.alias() == b.alias()
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Boolean condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Const(bool),
    Compare(Comparison),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Func(FuncCondition),
}

pub fn eq(left: impl Into<Operand>, right: impl Into<Operand>) -> Condition {
    compare(ComparisonOp::Eq, left, right)
}

pub fn ne(left: impl Into<Operand>, right: impl Into<Operand>) -> Condition {
    compare(ComparisonOp::Ne, left, right)
}

pub fn lt(left: impl Into<Operand>, right: impl Into<Operand>) -> Condition {
    compare(ComparisonOp::Lt, left, right)
}

pub fn le(left: impl Into<Operand>, right: impl Into<Operand>) -> Condition {
    compare(ComparisonOp::Le, left, right)
}

pub fn gt(left: impl Into<Operand>, right: impl Into<Operand>) -> Condition {
    compare(ComparisonOp::Gt, left, right)
}

pub fn ge(left: impl Into<Operand>, right: impl Into<Operand>) -> Condition {
    compare(ComparisonOp::Ge, left, right)
}

pub fn compare(op: ComparisonOp, left: impl Into<Operand>, right: impl Into<Operand>) -> Condition {
    Condition::Compare(Comparison::new(op, left.into(), right.into()))
}

/// Conjunction of conditions (an empty conjunction is true)
pub fn and_(conditions: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::And(conditions.into_iter().collect())
}

/// Disjunction of conditions (an empty disjunction is false)
pub fn or_(conditions: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::Or(conditions.into_iter().collect())
}

pub fn not_(condition: Condition) -> Condition {
    Condition::Not(Box::new(condition))
}

/// Predicate applied to the values of `paths`, in order
pub fn func<F>(paths: impl IntoIterator<Item = FieldPath>, f: F) -> Condition
where
    F: Fn(&[Value]) -> bool + Send + Sync + 'static,
{
    Condition::Func(FuncCondition { paths: paths.into_iter().collect(), func: Arc::new(f), negated: false })
}

impl Condition {
    /// Conjunction with another condition
    pub fn and(self, other: Condition) -> Condition {
        and_([self, other])
    }

    /// Disjunction with another condition
    pub fn or(self, other: Condition) -> Condition {
        or_([self, other])
    }

    /// Every field path referenced, in order of first appearance
    pub fn paths(&self) -> Vec<FieldPath> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths(&self, out: &mut Vec<FieldPath>) {
        match self {
            Condition::Const(_) => {}
            Condition::Compare(cmp) => cmp.paths().for_each(|p| push_unique(out, p.clone())),
            Condition::And(children) | Condition::Or(children) => {
                children.iter().for_each(|c| c.collect_paths(out));
            }
            Condition::Not(inner) => inner.collect_paths(out),
            Condition::Func(fc) => fc.paths.iter().for_each(|p| push_unique(out, p.clone())),
        }
    }

    /// Root paths referenced, in order of first appearance
    pub fn roots(&self) -> Vec<FieldPath> {
        let mut out = Vec::new();
        for path in self.paths() {
            push_unique(&mut out, path.root());
        }
        out
    }

    /// Placeholders referenced, in order of first appearance
    pub fn placeholders(&self) -> Vec<Placeholder> {
        let mut out = Vec::new();
        self.collect_placeholders(&mut out);
        out
    }

    fn collect_placeholders(&self, out: &mut Vec<Placeholder>) {
        match self {
            Condition::Compare(cmp) => {
                for operand in [&cmp.left, &cmp.right] {
                    if let Operand::Placeholder(ph) = operand {
                        push_unique(out, ph.clone());
                    }
                }
            }
            Condition::And(children) | Condition::Or(children) => {
                children.iter().for_each(|c| c.collect_placeholders(out));
            }
            Condition::Not(inner) => inner.collect_placeholders(out),
            Condition::Const(_) | Condition::Func(_) => {}
        }
    }

    /// Check that every leaf references a field path, rearranging comparisons
    /// so that a path is always on the left.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidExpression`] for comparisons between two
    /// non-path operands and predicate functions without paths.
    pub fn validated(self) -> QueryResult<Condition> {
        match self {
            Condition::Compare(cmp) => match (&cmp.left, &cmp.right) {
                (Operand::Path(_), _) => Ok(Condition::Compare(cmp)),
                (_, Operand::Path(_)) => Ok(Condition::Compare(cmp.swapped())),
                _ => Err(QueryError::invalid_expression(format!(
                    "comparison '{cmp}' does not reference a field path"
                ))),
            },
            Condition::Func(fc) if fc.paths.is_empty() => {
                Err(QueryError::invalid_expression("predicate function must reference at least one field path"))
            }
            Condition::And(children) => {
                Ok(Condition::And(children.into_iter().map(Condition::validated).collect::<QueryResult<_>>()?))
            }
            Condition::Or(children) => {
                Ok(Condition::Or(children.into_iter().map(Condition::validated).collect::<QueryResult<_>>()?))
            }
            Condition::Not(inner) => Ok(not_(inner.validated()?)),
            other => Ok(other),
        }
    }

    /// Logical negation pushed down to the leaves
    pub fn negate(self) -> Condition {
        match self {
            Condition::Const(b) => Condition::Const(!b),
            Condition::Compare(cmp) => {
                Condition::Compare(Comparison { op: cmp.op.negated(), left: cmp.left, right: cmp.right })
            }
            Condition::And(children) => Condition::Or(children.into_iter().map(Condition::negate).collect()),
            Condition::Or(children) => Condition::And(children.into_iter().map(Condition::negate).collect()),
            Condition::Not(inner) => *inner,
            Condition::Func(fc) => Condition::Func(FuncCondition { negated: !fc.negated, ..fc }),
        }
    }

    /// Fold constants, flatten nested connectives and push negations down
    pub fn simplify(self) -> Condition {
        match self {
            Condition::Compare(cmp) => match (&cmp.left, &cmp.right) {
                (Operand::Value(l), Operand::Value(r)) => Condition::Const(cmp.op.compare(l, r)),
                (Operand::Path(l), Operand::Path(r)) if l == r => Condition::Const(cmp.op.accepts(Ordering::Equal)),
                _ => Condition::Compare(cmp),
            },
            Condition::Not(inner) => inner.negate().simplify(),
            Condition::And(children) => {
                let mut out = Vec::with_capacity(children.len());
                for child in children.into_iter().map(Condition::simplify) {
                    match child {
                        Condition::Const(true) => {}
                        Condition::Const(false) => return Condition::Const(false),
                        Condition::And(nested) => out.extend(nested),
                        other => out.push(other),
                    }
                }
                match out.len() {
                    0 => Condition::Const(true),
                    1 => out.remove(0),
                    _ => Condition::And(out),
                }
            }
            Condition::Or(children) => {
                let mut out = Vec::with_capacity(children.len());
                for child in children.into_iter().map(Condition::simplify) {
                    match child {
                        Condition::Const(false) => {}
                        Condition::Const(true) => return Condition::Const(true),
                        Condition::Or(nested) => out.extend(nested),
                        other => out.push(other),
                    }
                }
                match out.len() {
                    0 => Condition::Const(false),
                    1 => out.remove(0),
                    _ => Condition::Or(out),
                }
            }
            other => other,
        }
    }

    /// Replace every placeholder with its bound value.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnboundPlaceholder`] for a placeholder without a
    /// value or default.
    pub fn bind(&self, bindings: &Bindings) -> QueryResult<Condition> {
        Ok(match self {
            Condition::Compare(cmp) => {
                Condition::Compare(Comparison::new(cmp.op, cmp.left.bind(bindings)?, cmp.right.bind(bindings)?))
            }
            Condition::And(children) => {
                Condition::And(children.iter().map(|c| c.bind(bindings)).collect::<QueryResult<_>>()?)
            }
            Condition::Or(children) => {
                Condition::Or(children.iter().map(|c| c.bind(bindings)).collect::<QueryResult<_>>()?)
            }
            Condition::Not(inner) => not_(inner.bind(bindings)?),
            other => other.clone(),
        })
    }

    /// Evaluate against a row. Leaves that cannot be resolved do not match.
    pub fn evaluate(&self, row: &dyn RowSource) -> bool {
        match self {
            Condition::Const(b) => *b,
            Condition::Compare(cmp) => match (cmp.left.value(row), cmp.right.value(row)) {
                (Some(l), Some(r)) => cmp.op.compare(&l, &r),
                _ => false,
            },
            Condition::And(children) => children.iter().all(|c| c.evaluate(row)),
            Condition::Or(children) => children.iter().any(|c| c.evaluate(row)),
            Condition::Not(inner) => !inner.evaluate(row),
            Condition::Func(fc) => fc.evaluate(row),
        }
    }

    /// Split a top-level conjunction into its members
    pub fn conjuncts(self) -> Vec<Condition> {
        match self {
            Condition::And(children) => children.into_iter().flat_map(Condition::conjuncts).collect(),
            Condition::Const(true) => Vec::new(),
            other => vec![other],
        }
    }

    /// Conjunctive normal form: clauses whose conjunction is equivalent to this
    /// condition. Each clause is a leaf or a disjunction of leaves; no clauses
    /// means always true.
    pub fn clauses(self) -> Vec<Condition> {
        match self.simplify() {
            Condition::Const(true) => Vec::new(),
            Condition::And(children) => children.into_iter().flat_map(Condition::clauses).collect(),
            Condition::Or(children) => {
                let mut product: Vec<Vec<Condition>> = vec![Vec::new()];
                for child in children {
                    let clauses = child.clauses();
                    product = product
                        .iter()
                        .flat_map(|prefix| {
                            clauses.iter().map(move |clause| {
                                let mut disjuncts = prefix.clone();
                                disjuncts.extend(clause.disjuncts());
                                disjuncts
                            })
                        })
                        .collect();
                }
                product.into_iter().map(|disjuncts| or_(disjuncts).simplify()).collect()
            }
            other => vec![other],
        }
    }

    fn disjuncts(&self) -> Vec<Condition> {
        match self {
            Condition::Or(children) => children.iter().flat_map(Condition::disjuncts).collect(),
            other => vec![other.clone()],
        }
    }

    /// A clause whose every disjunct compares the same path against a value or
    /// placeholder. An index over that path answers the clause as the union of
    /// one lookup per disjunct.
    pub fn index_lookups(&self) -> Option<(&FieldPath, Vec<(ComparisonOp, &Operand)>)> {
        let disjuncts: Vec<&Condition> = match self {
            Condition::Or(children) => children.iter().collect(),
            other => vec![other],
        };
        let mut path: Option<&FieldPath> = None;
        let mut lookups = Vec::with_capacity(disjuncts.len());
        for disjunct in disjuncts {
            let (p, op, operand) = disjunct.indexable()?;
            if path.is_some_and(|seen| seen != p) {
                return None;
            }
            path = Some(p);
            lookups.push((op, operand));
        }
        Some((path?, lookups))
    }

    /// A comparison of a path against a value or placeholder, which an index
    /// over that path can answer directly
    pub fn indexable(&self) -> Option<(&FieldPath, ComparisonOp, &Operand)> {
        match self {
            Condition::Compare(Comparison { op, left: Operand::Path(path), right })
                if !matches!(right, Operand::Path(_)) =>
            {
                Some((path, *op, right))
            }
            _ => None,
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Condition], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {sep} ")?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Const(b) => write!(f, "{b}"),
            Condition::Compare(cmp) => write!(f, "{cmp}"),
            Condition::And(children) => write_joined(f, children, "&"),
            Condition::Or(children) => write_joined(f, children, "|"),
            Condition::Not(inner) => write!(f, "~{inner}"),
            Condition::Func(fc) => {
                if fc.negated {
                    f.write_str("~")?;
                }
                f.write_str("func(")?;
                for (i, path) in fc.paths.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{path}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::{PH1, ph_named_default};
    use clausal_types::{IntegerCodec, RecordType, Schema, StringCodec};

    fn fixture() -> RecordType {
        let mut schema = Schema::new();
        schema.define("f").field("anum", IntegerCodec).field("astr", StringCodec).build().unwrap()
    }

    #[test]
    fn test_validated_swaps_literal_left() {
        let f = fixture();
        let anum = f.field("anum").unwrap();
        let cond = lt(3, anum.clone()).validated().unwrap();
        assert_eq!(cond, gt(anum, 3));
        assert!(matches!(eq(1, 2).validated(), Err(QueryError::InvalidExpression { .. })));
    }

    #[test]
    fn test_simplify_folds_constants_and_identical_paths() {
        let f = fixture();
        let anum = f.field("anum").unwrap();
        assert_eq!(eq(1, 1).simplify(), Condition::Const(true));
        assert_eq!(le(anum.clone(), anum.clone()).simplify(), Condition::Const(true));
        assert_eq!(ne(anum.clone(), anum.clone()).simplify(), Condition::Const(false));
        let cond = and_([eq(1, 1), gt(anum.clone(), 2)]).simplify();
        assert_eq!(cond, gt(anum.clone(), 2));
        assert_eq!(or_([eq(1, 2), eq(2, 2)]).simplify(), Condition::Const(true));
        assert_eq!(and_([gt(anum.clone(), 2), eq(1, 2)]).simplify(), Condition::Const(false));
    }

    #[test]
    fn test_negation_pushdown() {
        let f = fixture();
        let anum = f.field("anum").unwrap();
        let astr = f.field("astr").unwrap();
        let cond = not_(and_([lt(anum.clone(), 5), eq(astr.clone(), "x")])).simplify();
        assert_eq!(cond, or_([ge(anum, 5), ne(astr, "x")]));
    }

    #[test]
    fn test_clauses_distribute_or_over_and() {
        let f = fixture();
        let anum = f.field("anum").unwrap();
        let astr = f.field("astr").unwrap();
        let cond = or_([and_([eq(anum.clone(), 1), eq(astr.clone(), "a")]), eq(anum.clone(), 3)]);
        assert_eq!(
            cond.clauses(),
            vec![or_([eq(anum.clone(), 1), eq(anum.clone(), 3)]), or_([eq(astr.clone(), "a"), eq(anum.clone(), 3)])]
        );
        assert_eq!(and_([eq(1, 1), gt(anum.clone(), 2)]).clauses(), vec![gt(anum.clone(), 2)]);
        assert!(eq(1, 1).clauses().is_empty());

        let same_path = or_([eq(anum.clone(), 1), lt(anum.clone(), PH1)]);
        let (path, lookups) = same_path.index_lookups().unwrap();
        assert_eq!(path, &anum);
        assert_eq!(lookups.len(), 2);
        assert_eq!(lookups[1].0, ComparisonOp::Lt);
        assert!(or_([eq(anum.clone(), 1), eq(astr.clone(), "a")]).index_lookups().is_none());
        assert!(eq(anum, 1).index_lookups().is_some());
    }

    #[test]
    fn test_evaluate_and_bind() {
        let f = fixture();
        let anum = f.field("anum").unwrap();
        let record = f.record(vec![Term::number(4), Term::string("a")]).unwrap();
        let cond = and_([ge(anum.clone(), PH1), lt(anum.clone(), ph_named_default("hi", 10))]);
        assert!(!cond.evaluate(&record));
        assert_eq!(cond.placeholders().len(), 2);
        let bound = cond.bind(&Bindings::positional([4])).unwrap();
        assert!(bound.evaluate(&record));
        assert!(matches!(cond.bind(&Bindings::new()), Err(QueryError::UnboundPlaceholder { .. })));
    }

    #[test]
    fn test_func_condition() {
        let f = fixture();
        let anum = f.field("anum").unwrap();
        let even = func([anum], |vals| vals[0].as_term().and_then(Term::as_number).is_some_and(|n| n % 2 == 0));
        let record = f.record(vec![Term::number(4), Term::string("a")]).unwrap();
        assert!(even.evaluate(&record));
        assert!(!even.clone().negate().evaluate(&record));
        assert_eq!(even.roots(), vec![f.path()]);
    }

    #[test]
    fn test_indexable_and_conjuncts() {
        let f = fixture();
        let anum = f.field("anum").unwrap();
        let astr = f.field("astr").unwrap();
        let cond = and_([eq(anum.clone(), 1), and_([ne(astr.clone(), "a"), eq(anum.clone(), astr.clone())])]);
        let parts = cond.conjuncts();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].indexable().is_some());
        assert!(parts[2].indexable().is_none());
    }

    #[test]
    fn test_join_alignment() {
        let f = fixture();
        let other = f.alias("F2");
        let cmp = Comparison::new(
            ComparisonOp::Lt,
            f.field("anum").unwrap().into(),
            other.field("anum").unwrap().into(),
        );
        assert!(cmp.is_join());
        let aligned = cmp.aligned_to(&other).unwrap();
        assert_eq!(aligned.op, ComparisonOp::Gt);
        assert_eq!(aligned.left.as_path().and_then(FieldPath::alias), Some("F2"));
    }
}
