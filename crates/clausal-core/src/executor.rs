//! Query execution
//!
//! [`JoinRows`] runs a bound [`QueryPlan`] as a lazy nested-loop join: one
//! cursor per stage, advanced depth first, with each candidate checked against
//! the stage's join filter before the next stage is opened. The remaining
//! helpers implement the ordering, grouping, projection and uniqueness steps
//! applied to the joined rows.

use crate::condition::{ComparisonOp, Condition, RowSource, TupleRow, same_root};
use crate::error::{QueryError, QueryResult};
use crate::fact_map::FactMap;
use crate::fact_set::FactSet;
use crate::planner::{JoinKey, QueryPlan};
use crate::query_spec::OrderBy;
use clausal_types::{FieldPath, Record, Value};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::iter::Peekable;
use std::rc::Rc;
use tracing::trace;

/// One query result: a single value, or a tuple of values for joins and
/// multi-path projections
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Output {
    Single(Value),
    Tuple(Vec<Value>),
}

impl Output {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Output::Single(value) => Some(value),
            Output::Tuple(_) => None,
        }
    }

    /// The record of a single-record result
    pub fn as_record(&self) -> Option<&Record> {
        self.as_value().and_then(Value::as_record)
    }

    /// All values, a single result counting as a one-element tuple
    pub fn values(&self) -> &[Value] {
        match self {
            Output::Single(value) => std::slice::from_ref(value),
            Output::Tuple(values) => values,
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        match self {
            Output::Single(value) => vec![value],
            Output::Tuple(values) => values,
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Single(value) => write!(f, "{value}"),
            Output::Tuple(values) => {
                f.write_str("(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<Record> for Output {
    fn from(record: Record) -> Self {
        Output::Single(Value::Record(record))
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Output::Single(value)
    }
}

impl From<Vec<Value>> for Output {
    fn from(values: Vec<Value>) -> Self {
        Output::Tuple(values)
    }
}

type Candidates<'a> = Box<dyn Iterator<Item = Record> + 'a>;

struct StageCursor<'a> {
    map: Option<&'a FactMap>,
    prejoin_key: Option<(FieldPath, Vec<(ComparisonOp, Value)>)>,
    prejoin_residual: Rc<Condition>,
    join_key: Option<JoinKey>,
    join_residual: Condition,
    /// Pre-join candidates of an inner stage, shared by every outer row
    cached: Option<Rc<[Record]>>,
}

impl<'a> StageCursor<'a> {
    /// Candidates independent of the outer row: the pre-join key lookup or a
    /// full scan, filtered by the pre-join residual
    fn prejoined(&self) -> Candidates<'a> {
        let Some(map) = self.map else {
            return Box::new(std::iter::empty());
        };
        let residual = Rc::clone(&self.prejoin_residual);
        match &self.prejoin_key {
            Some((path, lookups)) => {
                let found: Option<FactSet> = lookups
                    .iter()
                    .map(|(op, value)| map.find(path, *op, value))
                    .collect::<Option<Vec<FactSet>>>()
                    .map(|sets| sets.into_iter().flatten().collect());
                match found {
                    Some(found) => Box::new(found.into_iter().filter(move |r| residual.evaluate(r))),
                    None => {
                        let (path, lookups) = (path.clone(), lookups.clone());
                        Box::new(
                            map.iter()
                                .filter(move |r| {
                                    path.resolve(r).is_ok_and(|v| lookups.iter().any(|(op, value)| op.compare(&v, value)))
                                        && residual.evaluate(*r)
                                })
                                .cloned(),
                        )
                    }
                }
            }
            None => Box::new(map.iter().filter(move |r| residual.evaluate(*r)).cloned()),
        }
    }

    /// Candidates matching `key` for the bound value of its outer path
    fn joined(&self, key: &JoinKey, outer: &dyn RowSource) -> Candidates<'a> {
        let (Some(map), Some(value)) = (self.map, outer.value(&key.other)) else {
            return Box::new(std::iter::empty());
        };
        let residual = Rc::clone(&self.prejoin_residual);
        match map.find(&key.path, key.op, &value) {
            Some(found) => Box::new(found.into_iter().filter(move |r| residual.evaluate(r))),
            None => {
                let (path, op) = (key.path.clone(), key.op);
                Box::new(
                    map.iter()
                        .filter(move |r| path.resolve(r).is_ok_and(|v| op.compare(&v, &value)) && residual.evaluate(*r))
                        .cloned(),
                )
            }
        }
    }
}

/// Lazy nested-loop join over the stages of a bound plan. Yields one record
/// per declared root, in declaration order.
pub struct JoinRows<'a> {
    stages: Vec<StageCursor<'a>>,
    /// Stage roots in join order
    roots: Vec<FieldPath>,
    /// Declared position -> stage
    declared: Vec<usize>,
    cursors: Vec<Candidates<'a>>,
    row: Vec<Record>,
    started: bool,
}

impl<'a> JoinRows<'a> {
    /// Prepare a bound plan. `maps` holds the fact map of each declared root,
    /// `None` for types with no facts.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnboundPlaceholder`] if the plan still contains
    /// placeholders.
    pub fn new(plan: &QueryPlan, maps: &[Option<&'a FactMap>]) -> QueryResult<Self> {
        let mut stages = Vec::with_capacity(plan.stages().len());
        let mut declared = vec![0; plan.stages().len()];
        for (i, stage) in plan.stages().iter().enumerate() {
            let prejoin_key = match stage.prejoin_key() {
                Some(key) => Some((
                    key.path.clone(),
                    key.lookups
                        .iter()
                        .map(|lookup| Ok((lookup.op, lookup.value()?.clone())))
                        .collect::<QueryResult<Vec<_>>>()?,
                )),
                None => None,
            };
            if let Some(ph) = stage.prejoin_residual().placeholders().first() {
                return Err(QueryError::unbound_placeholder(ph));
            }
            if let Some(ph) = stage.join_residual().placeholders().first() {
                return Err(QueryError::unbound_placeholder(ph));
            }
            stages.push(StageCursor {
                map: maps.get(stage.position()).copied().flatten(),
                prejoin_key,
                prejoin_residual: Rc::new(stage.prejoin_residual().clone()),
                join_key: stage.join_key().cloned(),
                join_residual: stage.join_residual().clone(),
                cached: None,
            });
            if let Some(slot) = declared.get_mut(stage.position()) {
                *slot = i;
            }
        }
        Ok(Self {
            stages,
            roots: plan.stages().iter().map(|s| s.root().clone()).collect(),
            declared,
            cursors: Vec::new(),
            row: Vec::new(),
            started: false,
        })
    }

    fn open(&mut self, level: usize) -> Candidates<'a> {
        let stage = &mut self.stages[level];
        if let Some(key) = &stage.join_key {
            let outer = TupleRow::new(&self.roots[..level], &self.row);
            return stage.joined(key, &outer);
        }
        if level == 0 {
            return stage.prejoined();
        }
        let cached = match &stage.cached {
            Some(cached) => Rc::clone(cached),
            None => {
                let cached: Rc<[Record]> = stage.prejoined().collect();
                trace!(level, candidates = cached.len(), "Cached inner stage candidates");
                stage.cached = Some(Rc::clone(&cached));
                cached
            }
        };
        Box::new((0..cached.len()).map(move |i| cached[i].clone()))
    }

    fn emit(&self) -> Vec<Record> {
        self.declared.iter().map(|&i| self.row[i].clone()).collect()
    }
}

impl Iterator for JoinRows<'_> {
    type Item = Vec<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stages.is_empty() {
            return None;
        }
        if !self.started {
            self.started = true;
            let cursor = self.open(0);
            self.cursors.push(cursor);
        }
        while !self.cursors.is_empty() {
            let level = self.cursors.len() - 1;
            let Some(candidate) = self.cursors[level].next() else {
                self.cursors.pop();
                self.row.pop();
                continue;
            };
            self.row.push(candidate);
            let row = TupleRow::new(&self.roots[..=level], &self.row);
            if !self.stages[level].join_residual.evaluate(&row) {
                self.row.pop();
                continue;
            }
            if level + 1 == self.stages.len() {
                let out = self.emit();
                self.row.pop();
                return Some(out);
            }
            let cursor = self.open(level + 1);
            self.cursors.push(cursor);
        }
        None
    }
}

/// Resolve `path` against the record bound to its root
pub(crate) fn resolve_in_row(row: &[Record], roots: &[FieldPath], path: &FieldPath) -> QueryResult<Value> {
    let record = roots
        .iter()
        .position(|root| same_root(root, path))
        .and_then(|p| row.get(p))
        .ok_or_else(|| QueryError::invalid_expression(format!("'{path}' does not belong to any query root")))?;
    Ok(path.resolve(record)?)
}

/// A joined row with its ordering keys
pub(crate) type KeyedRow = (Vec<Value>, Vec<Record>);

/// Stable sort by the ordering keys; rows equal on every key keep their order
pub(crate) fn sort_rows(
    rows: impl Iterator<Item = Vec<Record>>,
    roots: &[FieldPath],
    order_by: &[OrderBy],
) -> QueryResult<Vec<KeyedRow>> {
    let mut keyed = rows
        .map(|row| {
            let keys = order_by.iter().map(|o| resolve_in_row(&row, roots, &o.path)).collect::<QueryResult<_>>()?;
            Ok((keys, row))
        })
        .collect::<QueryResult<Vec<KeyedRow>>>()?;
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, order_by));
    Ok(keyed)
}

fn compare_keys(a: &[Value], b: &[Value], order_by: &[OrderBy]) -> Ordering {
    for ((x, y), ordering) in a.iter().zip(b).zip(order_by) {
        let ord = if ordering.ascending { x.cmp(y) } else { y.cmp(x) };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Apply the projection to a joined row
pub(crate) fn project(
    row: &[Record],
    roots: &[FieldPath],
    projection: Option<&[FieldPath]>,
    tuple: bool,
) -> QueryResult<Output> {
    let mut values: Vec<Value> = match projection {
        Some(paths) => paths.iter().map(|p| resolve_in_row(row, roots, p)).collect::<QueryResult<_>>()?,
        None => row.iter().map(Value::from).collect(),
    };
    if values.len() == 1 && !tuple {
        if let Some(value) = values.pop() {
            return Ok(Output::Single(value));
        }
    }
    Ok(Output::Tuple(values))
}

/// Drops items equal to the item just before them
pub(crate) struct Dedup<I: Iterator> {
    inner: I,
    last: Option<I::Item>,
}

impl<I: Iterator> Dedup<I> {
    pub(crate) fn new(inner: I) -> Self {
        Self { inner, last: None }
    }
}

impl<I> Iterator for Dedup<I>
where
    I: Iterator,
    I::Item: PartialEq + Clone,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = self.inner.next()?;
            if self.last.as_ref() != Some(&item) {
                self.last = Some(item.clone());
                return Some(item);
            }
        }
    }
}

/// Members of one group
pub type Group = std::vec::IntoIter<Output>;

/// Consecutive runs of sorted rows sharing their leading ordering keys
pub struct Groups {
    rows: Peekable<std::vec::IntoIter<(Vec<Value>, Output)>>,
    depth: usize,
    unique: bool,
}

impl Groups {
    pub(crate) fn new(rows: Vec<(Vec<Value>, Output)>, depth: usize, unique: bool) -> Self {
        Self { rows: rows.into_iter().peekable(), depth, unique }
    }
}

impl Iterator for Groups {
    type Item = (Vec<Value>, Group);

    fn next(&mut self) -> Option<Self::Item> {
        let (mut key, first) = self.rows.next()?;
        key.truncate(self.depth);
        let mut members = vec![first];
        while let Some((next_key, _)) = self.rows.peek() {
            if next_key.get(..self.depth) != Some(key.as_slice()) {
                break;
            }
            if let Some((_, output)) = self.rows.next() {
                members.push(output);
            }
        }
        if self.unique {
            members.dedup();
        }
        Some((key, members.into_iter()))
    }
}
