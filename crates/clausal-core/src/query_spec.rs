//! Declarative query specifications
//!
//! A `QuerySpec` records the clauses of a query: roots, join, filter,
//! ordering, grouping, projection, flags and placeholder bindings. Every
//! clause method validates its argument and returns a new specification, so a
//! partially built query can be shared and extended in different directions.

use crate::condition::{Comparison, Condition};
use crate::error::{QueryError, QueryResult, ResultExt};
use crate::placeholder::{Bindings, Placeholder};
use crate::planner::JoinOrder;
use clausal_types::FieldPath;
use std::fmt;

/// One sort key of an `order_by` clause
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    pub path: FieldPath,
    pub ascending: bool,
}

/// Ascending sort key
pub fn asc(path: FieldPath) -> OrderBy {
    OrderBy { path, ascending: true }
}

/// Descending sort key
pub fn desc(path: FieldPath) -> OrderBy {
    OrderBy { path, ascending: false }
}

impl From<FieldPath> for OrderBy {
    fn from(path: FieldPath) -> Self {
        asc(path)
    }
}

impl From<&FieldPath> for OrderBy {
    fn from(path: &FieldPath) -> Self {
        asc(path.clone())
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", if self.ascending { "asc" } else { "desc" }, self.path)
    }
}

/// The clauses of a query
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    roots: Vec<FieldPath>,
    join: Option<Vec<Comparison>>,
    where_: Option<Condition>,
    order_by: Option<Vec<OrderBy>>,
    group_by: Option<usize>,
    select: Option<Vec<FieldPath>>,
    unique: bool,
    tuple: bool,
    bindings: Bindings,
    join_order: Option<JoinOrder>,
}

impl QuerySpec {
    /// Specification over the given root paths
    pub fn new(roots: Vec<FieldPath>) -> QueryResult<Self> {
        if roots.is_empty() {
            return Err(QueryError::invalid_expression("a query needs at least one root"));
        }
        for (i, root) in roots.iter().enumerate() {
            if !root.is_root() {
                return Err(QueryError::invalid_expression(format!("'{root}' is not a root path")));
            }
            if roots[..i].contains(root) {
                return Err(QueryError::invalid_expression(format!(
                    "root '{root}' is declared twice; alias one of them"
                )));
            }
        }
        Ok(Self {
            roots,
            join: None,
            where_: None,
            order_by: None,
            group_by: None,
            select: None,
            unique: false,
            tuple: false,
            bindings: Bindings::default(),
            join_order: None,
        })
    }

    fn check_roots(&self, what: &str, roots: &[FieldPath]) -> QueryResult<()> {
        match roots.iter().find(|r| !self.roots.contains(r)) {
            Some(stray) => Err(QueryError::invalid_expression(format!(
                "{what} refers to '{stray}' which is not one of the query roots"
            ))),
            None => Ok(()),
        }
    }

    /// Clauses spanning several roots are only valid once the join is declared
    fn check_joined(&self, clause: &'static str, roots: &[FieldPath]) -> QueryResult<()> {
        let spans_roots = roots.iter().any(|r| *r != roots[0]);
        if spans_roots && self.join.is_none() {
            return Err(QueryError::invalid_clause(
                clause,
                format!("a {clause} clause over several roots must follow the join clause"),
            ));
        }
        Ok(())
    }

    /// Add the join clause. Every condition must be a conjunction of
    /// comparisons between fields of two different roots, and together they
    /// must connect all roots.
    pub fn with_join(&self, conditions: impl IntoIterator<Item = Condition>) -> QueryResult<Self> {
        if self.join.is_some() {
            return Err(QueryError::multiple_clause("join"));
        }
        let comparisons = self.validate_join(conditions).with_clause_context("join")?;
        Ok(Self { join: Some(comparisons), ..self.clone() })
    }

    fn validate_join(&self, conditions: impl IntoIterator<Item = Condition>) -> QueryResult<Vec<Comparison>> {
        if self.roots.len() < 2 {
            return Err(QueryError::invalid_expression("a join needs at least two roots"));
        }
        let mut comparisons = Vec::new();
        for condition in conditions {
            for part in condition.validated()?.conjuncts() {
                match part {
                    Condition::Compare(cmp) if cmp.is_join() => comparisons.push(cmp),
                    other => {
                        return Err(QueryError::invalid_expression(format!(
                            "join expression '{other}' must compare fields of two different roots"
                        )));
                    }
                }
            }
        }
        if comparisons.is_empty() {
            return Err(QueryError::invalid_expression("empty join expression"));
        }
        for cmp in &comparisons {
            let roots = Condition::Compare(cmp.clone()).roots();
            self.check_roots("join expression", &roots)?;
        }

        // every root must be reachable from the first through join comparisons
        let mut reached = vec![false; self.roots.len()];
        reached[0] = true;
        let mut changed = true;
        while changed {
            changed = false;
            for cmp in &comparisons {
                let positions: Vec<usize> = Condition::Compare(cmp.clone())
                    .roots()
                    .iter()
                    .filter_map(|r| self.roots.iter().position(|x| x == r))
                    .collect();
                if positions.iter().any(|p| reached[*p]) {
                    for p in positions {
                        if !reached[p] {
                            reached[p] = true;
                            changed = true;
                        }
                    }
                }
            }
        }
        if let Some(p) = reached.iter().position(|r| !r) {
            return Err(QueryError::invalid_expression(format!(
                "join does not connect root '{}' to the other roots",
                self.roots[p]
            )));
        }
        Ok(comparisons)
    }

    /// Add the filter clause
    pub fn with_where(&self, condition: Condition) -> QueryResult<Self> {
        if self.where_.is_some() {
            return Err(QueryError::multiple_clause("where"));
        }
        let condition = condition.validated().with_clause_context("where")?;
        let roots = condition.roots();
        self.check_roots("where clause", &roots).with_clause_context("where")?;
        self.check_joined("where", &roots)?;
        Ok(Self { where_: Some(condition.simplify()), ..self.clone() })
    }

    /// Add the ordering clause
    pub fn with_order_by<I, O>(&self, orderings: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = O>,
        O: Into<OrderBy>,
    {
        if self.order_by.is_some() {
            return Err(QueryError::multiple_clause("order_by"));
        }
        let orderings: Vec<OrderBy> = orderings.into_iter().map(Into::into).collect();
        if orderings.is_empty() {
            return Err(QueryError::invalid_clause("order_by", "empty order_by clause"));
        }
        let roots: Vec<FieldPath> = orderings.iter().map(|o| o.path.root()).collect();
        self.check_roots("order_by clause", &roots).with_clause_context("order_by")?;
        self.check_joined("order_by", &roots)?;
        Ok(Self { order_by: Some(orderings), ..self.clone() })
    }

    /// Group by the first `n` ordering keys
    pub fn with_group_by(&self, n: usize) -> QueryResult<Self> {
        if self.group_by.is_some() {
            return Err(QueryError::multiple_clause("group_by"));
        }
        let available = self.order_by.as_ref().map_or(0, Vec::len);
        if n == 0 || n > available {
            return Err(QueryError::invalid_clause(
                "group_by",
                format!("cannot group by {n} keys when {available} order_by keys are declared"),
            ));
        }
        Ok(Self { group_by: Some(n), ..self.clone() })
    }

    /// Add the projection clause
    pub fn with_select(&self, paths: impl IntoIterator<Item = FieldPath>) -> QueryResult<Self> {
        if self.select.is_some() {
            return Err(QueryError::multiple_clause("select"));
        }
        let paths: Vec<FieldPath> = paths.into_iter().collect();
        if paths.is_empty() {
            return Err(QueryError::invalid_clause("select", "empty select clause"));
        }
        let roots: Vec<FieldPath> = paths.iter().map(FieldPath::root).collect();
        self.check_roots("select clause", &roots).with_clause_context("select")?;
        self.check_joined("select", &roots)?;
        Ok(Self { select: Some(paths), ..self.clone() })
    }

    pub fn with_unique(&self) -> Self {
        Self { unique: true, ..self.clone() }
    }

    pub fn with_tuple(&self) -> Self {
        Self { tuple: true, ..self.clone() }
    }

    /// Bind placeholder values. Later bindings override earlier ones.
    pub fn with_bindings(&self, bindings: &Bindings) -> QueryResult<Self> {
        let declared = self.placeholders();
        for key in bindings.named_keys() {
            if !declared.iter().any(|ph| ph.name() == Some(key)) {
                return Err(QueryError::invalid_clause(
                    "bind",
                    format!("no named placeholder '{key}' in the query"),
                ));
            }
        }
        Ok(Self { bindings: self.bindings.merged(bindings), ..self.clone() })
    }

    /// Choose the join-order heuristic for this query
    pub fn with_join_order(&self, order: JoinOrder) -> QueryResult<Self> {
        order.validate(self.roots.len())?;
        Ok(Self { join_order: Some(order), ..self.clone() })
    }

    pub fn roots(&self) -> &[FieldPath] {
        &self.roots
    }

    /// Join comparisons (empty when no join was declared)
    pub fn join(&self) -> &[Comparison] {
        self.join.as_deref().unwrap_or_default()
    }

    pub fn has_join(&self) -> bool {
        self.join.is_some()
    }

    pub fn where_clause(&self) -> Option<&Condition> {
        self.where_.as_ref()
    }

    pub fn order_by(&self) -> &[OrderBy] {
        self.order_by.as_deref().unwrap_or_default()
    }

    pub fn group_by(&self) -> Option<usize> {
        self.group_by
    }

    pub fn projection(&self) -> Option<&[FieldPath]> {
        self.select.as_deref()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_tuple(&self) -> bool {
        self.tuple
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn join_order(&self) -> Option<&JoinOrder> {
        self.join_order.as_ref()
    }

    /// Placeholders referenced by the filter
    pub fn placeholders(&self) -> Vec<Placeholder> {
        self.where_.as_ref().map(Condition::placeholders).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{eq, gt, lt};
    use crate::placeholder::{ph_named, ph_named_default};
    use clausal_types::{IntegerCodec, RecordType, Schema, StringCodec};

    fn fixture() -> (RecordType, RecordType) {
        let mut schema = Schema::new();
        let f = schema.define("f").field("anum", IntegerCodec).field("astr", StringCodec).build().unwrap();
        let g = schema.define("g").field("anum", IntegerCodec).field("label", StringCodec).build().unwrap();
        (f, g)
    }

    #[test]
    fn test_roots_validation() {
        let (f, _) = fixture();
        assert!(QuerySpec::new(vec![]).is_err());
        assert!(QuerySpec::new(vec![f.field("anum").unwrap()]).is_err());
        assert!(QuerySpec::new(vec![f.path(), f.path()]).is_err());
        assert!(QuerySpec::new(vec![f.path(), f.alias("F2")]).is_ok());
    }

    #[test]
    fn test_repeated_clauses_rejected() {
        let (f, _) = fixture();
        let anum = f.field("anum").unwrap();
        let spec = QuerySpec::new(vec![f.path()]).unwrap().with_where(gt(anum.clone(), 1)).unwrap();
        assert_eq!(spec.with_where(lt(anum.clone(), 5)), Err(QueryError::MultipleClause { clause: "where" }));
        let ordered = spec.with_order_by([anum.clone()]).unwrap();
        assert!(matches!(ordered.with_order_by([anum]), Err(QueryError::MultipleClause { clause: "order_by" })));
    }

    #[test]
    fn test_where_must_follow_join_for_multiple_roots() {
        let (f, g) = fixture();
        let spec = QuerySpec::new(vec![f.path(), g.path()]).unwrap();
        let cross = eq(f.field("anum").unwrap(), g.field("anum").unwrap());
        assert!(matches!(
            spec.with_where(cross.clone()),
            Err(QueryError::InvalidExpression { clause: Some("where"), .. })
        ));
        let joined = spec.with_join([cross.clone()]).unwrap();
        assert!(joined.with_where(cross).is_ok());
    }

    #[test]
    fn test_order_by_and_select_must_follow_join_for_multiple_roots() {
        let (f, g) = fixture();
        let spec = QuerySpec::new(vec![f.path(), g.path()]).unwrap();
        let keys = [f.field("anum").unwrap(), g.field("label").unwrap()];
        assert!(matches!(
            spec.with_order_by(keys.clone()),
            Err(QueryError::InvalidExpression { clause: Some("order_by"), .. })
        ));
        assert!(matches!(
            spec.with_select(keys.clone()),
            Err(QueryError::InvalidExpression { clause: Some("select"), .. })
        ));
        assert!(spec.with_order_by([f.field("anum").unwrap(), f.field("astr").unwrap()]).is_ok());
        assert!(spec.with_select([g.field("label").unwrap()]).is_ok());

        let joined = spec.with_join([eq(f.field("anum").unwrap(), g.field("anum").unwrap())]).unwrap();
        assert!(joined.with_order_by(keys.clone()).is_ok());
        assert!(joined.with_select(keys).is_ok());
    }

    #[test]
    fn test_join_validation() {
        let (f, g) = fixture();
        let f2 = f.alias("F2");
        let spec = QuerySpec::new(vec![f.path(), g.path(), f2.clone()]).unwrap();
        let fg = eq(f.field("anum").unwrap(), g.field("anum").unwrap());
        assert!(matches!(spec.with_join([fg.clone()]), Err(QueryError::InvalidExpression { .. })));
        assert!(matches!(
            spec.with_join([eq(f.field("anum").unwrap(), 1)]),
            Err(QueryError::InvalidExpression { .. })
        ));
        let gf2 = lt(g.field("anum").unwrap(), f2.field("anum").unwrap());
        let joined = spec.with_join([fg, gf2]).unwrap();
        assert_eq!(joined.join().len(), 2);
        assert!(matches!(joined.with_join([]), Err(QueryError::MultipleClause { clause: "join" })));
    }

    #[test]
    fn test_stray_roots_rejected() {
        let (f, g) = fixture();
        let spec = QuerySpec::new(vec![f.path()]).unwrap();
        assert!(spec.with_where(eq(g.field("anum").unwrap(), 1)).is_err());
        assert!(spec.with_order_by([g.field("anum").unwrap()]).is_err());
        assert!(spec.with_select([g.field("label").unwrap()]).is_err());
    }

    #[test]
    fn test_group_by_requires_order_by() {
        let (f, _) = fixture();
        let spec = QuerySpec::new(vec![f.path()]).unwrap();
        assert!(spec.with_group_by(1).is_err());
        let ordered = spec.with_order_by([f.field("astr").unwrap(), f.field("anum").unwrap()]).unwrap();
        assert!(ordered.with_group_by(3).is_err());
        assert_eq!(ordered.with_group_by(2).unwrap().group_by(), Some(2));
    }

    #[test]
    fn test_bindings_checked_against_named_placeholders() {
        let (f, _) = fixture();
        let anum = f.field("anum").unwrap();
        let spec = QuerySpec::new(vec![f.path()])
            .unwrap()
            .with_where(gt(anum, ph_named_default("lo", 0)).and(eq(f.field("astr").unwrap(), ph_named("s"))))
            .unwrap();
        assert_eq!(spec.placeholders().len(), 2);
        assert!(spec.with_bindings(&Bindings::new().named("s", "x")).is_ok());
        assert!(matches!(
            spec.with_bindings(&Bindings::new().named("nope", 1)),
            Err(QueryError::InvalidExpression { .. })
        ));
    }
}
