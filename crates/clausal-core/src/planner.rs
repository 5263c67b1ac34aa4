//! Query planning
//!
//! The planner turns a [`QuerySpec`] and the indexes available on each root
//! type into a [`QueryPlan`]: one [`JoinStage`] per root, in join order. Each
//! stage carries an optional index-served pre-join key, the residual filter
//! for its own root, an optional index-served join key and the join filter
//! over the roots bound so far.
//!
//! Planning is pure and cheap. Plans are rebuilt for every execution because
//! the indexes of a fact base can differ between calls.

use crate::condition::{Comparison, ComparisonOp, Condition, JoinPreference, Operand, and_};
use crate::error::{QueryError, QueryResult};
use crate::placeholder::{Bindings, Placeholder};
use crate::query_spec::QuerySpec;
use clausal_types::{FieldPath, RecordTypeId, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Join-order heuristic
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOrder {
    /// Explicit order given as positions of the declared roots
    Fixed(Vec<usize>),
    /// Roots in the order they were declared
    DeclarationOrder,
    /// Roots with an index-served filter first, then declaration order
    #[default]
    IndexedFirst,
    /// Roots with the weakest join comparisons outermost
    JoinPreference,
}

impl JoinOrder {
    /// Check that the heuristic can order `roots` roots
    pub fn validate(&self, roots: usize) -> QueryResult<()> {
        if let JoinOrder::Fixed(order) = self {
            let mut seen = vec![false; roots];
            let permutation = order.len() == roots
                && order.iter().all(|&p| p < roots && !std::mem::replace(&mut seen[p], true));
            if !permutation {
                return Err(QueryError::invalid_clause(
                    "join_order",
                    format!("{order:?} is not a permutation of {roots} roots"),
                ));
            }
        }
        Ok(())
    }

    /// Root positions in join order
    pub fn order(&self, spec: &QuerySpec, catalog: &IndexCatalog) -> QueryResult<Vec<usize>> {
        let roots = spec.roots();
        self.validate(roots.len())?;
        let mut positions: Vec<usize> = (0..roots.len()).collect();
        match self {
            JoinOrder::Fixed(order) => positions = order.clone(),
            JoinOrder::DeclarationOrder => {}
            JoinOrder::IndexedFirst => {
                let indexed: Vec<FieldPath> = spec
                    .where_clause()
                    .cloned()
                    .map(Condition::clauses)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|c| c.index_lookups())
                    .filter(|(path, _)| catalog.priority(path).is_some())
                    .map(|(path, _)| path.root())
                    .collect();
                positions.sort_by_key(|&p| !indexed.contains(&roots[p]));
            }
            JoinOrder::JoinPreference => {
                let weight = |p: usize| -> u32 {
                    spec.join()
                        .iter()
                        .filter(|cmp| cmp.aligned_to(&roots[p]).is_some())
                        .map(|cmp| cmp.op.preference() as u32)
                        .sum()
                };
                positions.sort_by_key(|&p| weight(p));
            }
        }
        Ok(positions)
    }
}

impl fmt::Display for JoinOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinOrder::Fixed(order) => {
                let order: Vec<String> = order.iter().map(usize::to_string).collect();
                write!(f, "fixed:{}", order.join(","))
            }
            JoinOrder::DeclarationOrder => f.write_str("declaration_order"),
            JoinOrder::IndexedFirst => f.write_str("indexed_first"),
            JoinOrder::JoinPreference => f.write_str("join_preference"),
        }
    }
}

impl FromStr for JoinOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "declaration_order" => Ok(JoinOrder::DeclarationOrder),
            "indexed_first" => Ok(JoinOrder::IndexedFirst),
            "join_preference" => Ok(JoinOrder::JoinPreference),
            other => match other.strip_prefix("fixed:") {
                Some(list) => list
                    .split(',')
                    .map(|p| p.trim().parse::<usize>())
                    .collect::<Result<Vec<_>, _>>()
                    .map(JoinOrder::Fixed)
                    .map_err(|e| QueryError::invalid_expression(format!("invalid fixed join order '{list}': {e}"))),
                None => Err(QueryError::invalid_expression(format!("unknown join order '{other}'"))),
            },
        }
    }
}

/// Index paths available per record type, in priority order
#[derive(Debug, Clone, Default)]
pub struct IndexCatalog {
    paths: HashMap<RecordTypeId, Vec<FieldPath>>,
}

impl IndexCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an index path. Paths are dealiased; repeats keep their first
    /// priority.
    pub fn register(&mut self, path: &FieldPath) {
        let path = path.dealiased();
        let paths = self.paths.entry(path.type_id()).or_default();
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    pub fn paths_for(&self, type_id: RecordTypeId) -> &[FieldPath] {
        self.paths.get(&type_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Priority of the index over `path` (lower wins), ignoring aliases
    pub fn priority(&self, path: &FieldPath) -> Option<usize> {
        let path = path.dealiased();
        self.paths_for(path.type_id()).iter().position(|p| *p == path)
    }
}

impl<'p> FromIterator<&'p FieldPath> for IndexCatalog {
    fn from_iter<I: IntoIterator<Item = &'p FieldPath>>(iter: I) -> Self {
        let mut catalog = Self::new();
        iter.into_iter().for_each(|path| catalog.register(path));
        catalog
    }
}

/// One `op operand` lookup of an index key
#[derive(Debug, Clone, PartialEq)]
pub struct IndexLookup {
    pub op: ComparisonOp,
    pub operand: Operand,
}

impl IndexLookup {
    /// The bound lookup value.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnboundPlaceholder`] if the plan was not bound.
    pub fn value(&self) -> QueryResult<&Value> {
        match &self.operand {
            Operand::Value(value) => Ok(value),
            Operand::Placeholder(ph) => Err(QueryError::unbound_placeholder(ph)),
            Operand::Path(path) => Err(QueryError::invalid_expression(format!(
                "index key compares against field path '{path}'"
            ))),
        }
    }
}

/// A pre-join filter answered by an index on `path`: the union of its
/// lookups, one per disjunct of the filter clause
#[derive(Debug, Clone, PartialEq)]
pub struct IndexKey {
    pub path: FieldPath,
    pub lookups: Vec<IndexLookup>,
    /// Priority of the serving index
    pub priority: usize,
}

impl IndexKey {
    /// Weakest operator preference among the lookups
    fn preference(&self) -> JoinPreference {
        self.lookups.iter().map(|l| l.op.preference()).min().unwrap_or(JoinPreference::Low)
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, lookup) in self.lookups.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{} {} {}", self.path, lookup.op, lookup.operand)?;
        }
        write!(f, " [index {}]", self.priority)
    }
}

/// A join comparison answered by an index on this stage's root:
/// `path op other`, where `other` belongs to an earlier stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKey {
    pub path: FieldPath,
    pub op: ComparisonOp,
    pub other: FieldPath,
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.path, self.op, self.other)
    }
}

/// One root of a plan
#[derive(Debug, Clone, PartialEq)]
pub struct JoinStage {
    root: FieldPath,
    position: usize,
    input_signature: Vec<FieldPath>,
    prejoin_key: Option<IndexKey>,
    prejoin_residual: Condition,
    join_key: Option<JoinKey>,
    join_residual: Condition,
}

impl JoinStage {
    pub fn root(&self) -> &FieldPath {
        &self.root
    }

    /// Position of the root among the declared roots
    pub fn position(&self) -> usize {
        self.position
    }

    /// Roots bound once this stage has run, in join order
    pub fn input_signature(&self) -> &[FieldPath] {
        &self.input_signature
    }

    pub fn prejoin_key(&self) -> Option<&IndexKey> {
        self.prejoin_key.as_ref()
    }

    /// Filter over this root alone
    pub fn prejoin_residual(&self) -> &Condition {
        &self.prejoin_residual
    }

    pub fn join_key(&self) -> Option<&JoinKey> {
        self.join_key.as_ref()
    }

    /// Filter over the roots bound so far
    pub fn join_residual(&self) -> &Condition {
        &self.join_residual
    }

    fn bind(&self, bindings: &Bindings) -> QueryResult<JoinStage> {
        let prejoin_key = match &self.prejoin_key {
            Some(key) => {
                let lookups = key
                    .lookups
                    .iter()
                    .map(|lookup| {
                        let operand = match &lookup.operand {
                            Operand::Placeholder(ph) => Operand::Value(bindings.resolve(ph)?),
                            other => other.clone(),
                        };
                        Ok(IndexLookup { op: lookup.op, operand })
                    })
                    .collect::<QueryResult<_>>()?;
                Some(IndexKey { lookups, ..key.clone() })
            }
            None => None,
        };
        Ok(JoinStage {
            prejoin_key,
            prejoin_residual: self.prejoin_residual.bind(bindings)?.simplify(),
            join_residual: self.join_residual.bind(bindings)?.simplify(),
            ..self.clone()
        })
    }
}

/// An executable query plan
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    roots: Vec<FieldPath>,
    stages: Vec<JoinStage>,
    placeholders: Vec<Placeholder>,
}

impl QueryPlan {
    /// Plan `spec` against the indexes in `catalog`. The spec's own join order
    /// wins over `default_order`.
    #[instrument(skip_all, fields(roots = spec.roots().len()))]
    pub fn build(spec: &QuerySpec, catalog: &IndexCatalog, default_order: &JoinOrder) -> QueryResult<Self> {
        let roots = spec.roots();
        if roots.len() > 1 && !spec.has_join() {
            return Err(QueryError::invalid_clause(
                "join",
                "a query over several roots needs a join clause connecting them",
            ));
        }
        let heuristic = spec.join_order().unwrap_or(default_order);
        let order = heuristic.order(spec, catalog)?;
        debug!(heuristic = %heuristic, order = ?order, "Chose join order");

        let mut filters: Vec<Option<Condition>> =
            spec.where_clause().cloned().map(Condition::clauses).unwrap_or_default().into_iter().map(Some).collect();
        let mut joins: Vec<Option<Comparison>> = spec.join().iter().cloned().map(Some).collect();
        let mut bound: Vec<FieldPath> = Vec::with_capacity(roots.len());
        let mut stages = Vec::with_capacity(roots.len());

        for &position in &order {
            let root = roots[position].clone();
            bound.push(root.clone());

            let mut local = Vec::new();
            let mut cross = Vec::new();
            for slot in &mut filters {
                let ready = slot.as_ref().is_some_and(|c| c.roots().iter().all(|r| bound.contains(r)));
                if !ready {
                    continue;
                }
                if let Some(cond) = slot.take() {
                    if cond.roots().iter().all(|r| *r == root) { local.push(cond) } else { cross.push(cond) }
                }
            }

            let prejoin_key = local
                .iter()
                .enumerate()
                .filter_map(|(i, c)| {
                    let (path, lookups) = c.index_lookups()?;
                    let key = IndexKey {
                        path: path.clone(),
                        lookups: lookups
                            .into_iter()
                            .map(|(op, operand)| IndexLookup { op, operand: operand.clone() })
                            .collect(),
                        priority: catalog.priority(path)?,
                    };
                    Some((i, key))
                })
                .min_by(|(_, a), (_, b)| a.priority.cmp(&b.priority).then(b.preference().cmp(&a.preference())))
                .map(|(i, key)| {
                    local.remove(i);
                    key
                });

            let mut aligned = Vec::new();
            for slot in &mut joins {
                let ready = slot.as_ref().is_some_and(|cmp| {
                    Condition::Compare(cmp.clone()).roots().iter().all(|r| bound.contains(r))
                });
                if !ready {
                    continue;
                }
                if let Some(cmp) = slot.take() {
                    match cmp.aligned_to(&root) {
                        Some(cmp) => aligned.push(cmp),
                        None => cross.push(Condition::Compare(cmp)),
                    }
                }
            }

            let join_key = if prejoin_key.is_none() {
                aligned
                    .iter()
                    .enumerate()
                    .filter(|(_, cmp)| cmp.left.as_path().is_some_and(|p| catalog.priority(p).is_some()))
                    .min_by_key(|(_, cmp)| Reverse(cmp.op.preference()))
                    .map(|(i, _)| i)
                    .and_then(|i| {
                        let cmp = aligned.remove(i);
                        Some(JoinKey { path: cmp.left.as_path()?.clone(), op: cmp.op, other: cmp.right.as_path()?.clone() })
                    })
            } else {
                None
            };
            cross.extend(aligned.into_iter().map(Condition::Compare));

            debug!(
                root = %root,
                prejoin_key = prejoin_key.as_ref().map(ToString::to_string),
                join_key = join_key.as_ref().map(ToString::to_string),
                "Planned stage"
            );
            stages.push(JoinStage {
                root,
                position,
                input_signature: bound.clone(),
                prejoin_key,
                prejoin_residual: and_(local).simplify(),
                join_key,
                join_residual: and_(cross).simplify(),
            });
        }

        Ok(Self { roots: roots.to_vec(), stages, placeholders: spec.placeholders() })
    }

    /// Substitute placeholder values into every key and filter.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnboundPlaceholder`] when a placeholder has no
    /// value and no default.
    pub fn bind(&self, bindings: &Bindings) -> QueryResult<QueryPlan> {
        Ok(QueryPlan {
            stages: self.stages.iter().map(|s| s.bind(bindings)).collect::<QueryResult<_>>()?,
            placeholders: Vec::new(),
            roots: self.roots.clone(),
        })
    }

    /// Declared roots
    pub fn roots(&self) -> &[FieldPath] {
        &self.roots
    }

    /// Stages in join order
    pub fn stages(&self) -> &[JoinStage] {
        &self.stages
    }

    /// Placeholders still waiting for a value
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    fn stage_for(&self, root: &FieldPath) -> Option<&JoinStage> {
        self.stages.iter().find(|s| s.root == *root)
    }

    /// Pre-join key chosen for a declared root
    pub fn prejoin_key(&self, root: &FieldPath) -> Option<&IndexKey> {
        self.stage_for(root).and_then(JoinStage::prejoin_key)
    }

    /// Join key chosen for a declared root
    pub fn join_key(&self, root: &FieldPath) -> Option<&JoinKey> {
        self.stage_for(root).and_then(JoinStage::join_key)
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "QueryPlan:")?;
        for (i, stage) in self.stages.iter().enumerate() {
            let signature: Vec<String> = stage.input_signature.iter().map(ToString::to_string).collect();
            writeln!(f, "  Stage {}: {} (root {})", i + 1, stage.root, stage.position + 1)?;
            writeln!(f, "    input signature: ({})", signature.join(", "))?;
            match &stage.prejoin_key {
                Some(key) => writeln!(f, "    prejoin key: {key}")?,
                None => writeln!(f, "    prejoin key: none (full scan)")?,
            }
            writeln!(f, "    prejoin filter: {}", stage.prejoin_residual)?;
            if i > 0 {
                match &stage.join_key {
                    Some(key) => writeln!(f, "    join key: {key}")?,
                    None => writeln!(f, "    join key: none")?,
                }
                writeln!(f, "    join filter: {}", stage.join_residual)?;
            }
        }
        if !self.placeholders.is_empty() {
            let placeholders: Vec<String> = self.placeholders.iter().map(ToString::to_string).collect();
            writeln!(f, "  placeholders: {}", placeholders.join(", "))?;
        }
        Ok(())
    }
}
