//! Query builders
//!
//! [`Select`] and [`Delete`] pair a [`QuerySpec`] with the fact base it runs
//! against. Clause methods validate eagerly and return a new builder, so a
//! partially built `Select` can be kept and extended in several directions.
//! Terminal methods plan the query against the fact base's current indexes,
//! bind placeholders and execute.

use crate::condition::Condition;
use crate::error::{QueryError, QueryResult};
use crate::executor::{Dedup, Groups, JoinRows, Output, project, sort_rows};
use crate::fact_base::FactBase;
use crate::fact_set::FactSet;
use crate::placeholder::Bindings;
use crate::planner::{JoinOrder, QueryPlan};
use crate::query_spec::{OrderBy, QuerySpec};
use clausal_types::{FieldPath, Value};
use tracing::{debug, info, instrument};

/// Lazy query results. A row that cannot be projected is an error item.
pub struct Rows<'a> {
    inner: Box<dyn Iterator<Item = QueryResult<Output>> + 'a>,
}

impl Iterator for Rows<'_> {
    type Item = QueryResult<Output>;

    fn next(&mut self) -> Option<QueryResult<Output>> {
        self.inner.next()
    }
}

fn plan_for(base: &FactBase, spec: &QuerySpec) -> QueryResult<QueryPlan> {
    QueryPlan::build(spec, &base.catalog(), &base.config().join_order)
}

/// Joined rows of a query, in declared root order
fn joined_rows<'a>(base: &'a FactBase, spec: &QuerySpec) -> QueryResult<JoinRows<'a>> {
    let plan = plan_for(base, spec)?.bind(spec.bindings())?;
    debug!(plan = %plan, "Executing query plan");
    JoinRows::new(&plan, &base.maps_for(spec.roots()))
}

/// A select query over a fact base
#[derive(Clone)]
pub struct Select<'a> {
    base: &'a FactBase,
    spec: QuerySpec,
}

impl<'a> Select<'a> {
    pub(crate) fn new(base: &'a FactBase, spec: QuerySpec) -> Self {
        Self { base, spec }
    }

    fn with_spec(&self, spec: QuerySpec) -> Self {
        Self { base: self.base, spec }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Release the fact base borrow, keeping the query. Pass the result to
    /// [`FactBase::delete_matching`] to remove what this query selects.
    pub fn into_spec(self) -> QuerySpec {
        self.spec
    }

    /// Join the roots with conjunctions of cross-root comparisons
    pub fn join(&self, conditions: impl IntoIterator<Item = Condition>) -> QueryResult<Self> {
        Ok(self.with_spec(self.spec.with_join(conditions)?))
    }

    /// Filter the results
    pub fn where_(&self, condition: Condition) -> QueryResult<Self> {
        Ok(self.with_spec(self.spec.with_where(condition)?))
    }

    pub fn order_by<I, O>(&self, orderings: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = O>,
        O: Into<OrderBy>,
    {
        Ok(self.with_spec(self.spec.with_order_by(orderings)?))
    }

    /// Group sorted results by their first `n` ordering keys
    pub fn group_by(&self, n: usize) -> QueryResult<GroupedSelect<'a>> {
        Ok(GroupedSelect { select: self.with_spec(self.spec.with_group_by(n)?) })
    }

    /// Project each result onto `paths`
    pub fn select(&self, paths: impl IntoIterator<Item = FieldPath>) -> QueryResult<Self> {
        Ok(self.with_spec(self.spec.with_select(paths)?))
    }

    /// Drop consecutive duplicate results
    pub fn unique(&self) -> Self {
        self.with_spec(self.spec.with_unique())
    }

    /// Return single values as one-element tuples
    pub fn tuple(&self) -> Self {
        self.with_spec(self.spec.with_tuple())
    }

    /// Bind placeholder values
    pub fn bind(&self, bindings: Bindings) -> QueryResult<Self> {
        Ok(self.with_spec(self.spec.with_bindings(&bindings)?))
    }

    /// Override the configured join-order heuristic
    pub fn join_order(&self, order: JoinOrder) -> QueryResult<Self> {
        Ok(self.with_spec(self.spec.with_join_order(order)?))
    }

    /// The plan the query would run with, before placeholder binding
    pub fn query_plan(&self) -> QueryResult<QueryPlan> {
        plan_for(self.base, &self.spec)
    }

    /// Every result, lazily unless the query is ordered
    #[instrument(skip(self), fields(roots = self.spec.roots().len()))]
    pub fn all(&self) -> QueryResult<Rows<'a>> {
        let rows = joined_rows(self.base, &self.spec)?;
        let roots = self.spec.roots().to_vec();
        let projection = self.spec.projection().map(<[FieldPath]>::to_vec);
        let tuple = self.spec.is_tuple();

        let outputs: Box<dyn Iterator<Item = QueryResult<Output>> + 'a> = if self.spec.order_by().is_empty() {
            Box::new(rows.map(move |row| project(&row, &roots, projection.as_deref(), tuple)))
        } else {
            let sorted = sort_rows(rows, &roots, self.spec.order_by())?;
            Box::new(sorted.into_iter().map(move |(_, row)| project(&row, &roots, projection.as_deref(), tuple)))
        };
        let inner: Box<dyn Iterator<Item = QueryResult<Output>> + 'a> =
            if self.spec.is_unique() { Box::new(Dedup::new(outputs)) } else { outputs };
        Ok(Rows { inner })
    }

    /// The only result.
    ///
    /// # Errors
    ///
    /// [`QueryError::EmptyResult`] without results and
    /// [`QueryError::AmbiguousResult`] with more than one.
    pub fn singleton(&self) -> QueryResult<Output> {
        let mut rows = self.all()?;
        match (rows.next().transpose()?, rows.next().transpose()?) {
            (Some(only), None) => Ok(only),
            (None, _) => Err(QueryError::EmptyResult),
            (Some(_), Some(_)) => Err(QueryError::AmbiguousResult),
        }
    }

    pub fn count(&self) -> QueryResult<usize> {
        self.all()?.try_fold(0, |n, row| row.map(|_| n + 1))
    }

    /// The first result.
    ///
    /// # Errors
    ///
    /// [`QueryError::EmptyResult`] when there are no results.
    pub fn first(&self) -> QueryResult<Output> {
        self.all()?.next().unwrap_or(Err(QueryError::EmptyResult))
    }
}

/// A select query whose sorted results are grouped
#[derive(Clone)]
pub struct GroupedSelect<'a> {
    select: Select<'a>,
}

impl<'a> GroupedSelect<'a> {
    fn map_spec(&self, f: impl FnOnce(&QuerySpec) -> QueryResult<QuerySpec>) -> QueryResult<Self> {
        Ok(Self { select: self.select.with_spec(f(&self.select.spec)?) })
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.select.spec
    }

    /// Project each group member onto `paths`
    pub fn select(&self, paths: impl IntoIterator<Item = FieldPath>) -> QueryResult<Self> {
        self.map_spec(|spec| spec.with_select(paths))
    }

    /// Drop consecutive duplicates within each group
    pub fn unique(&self) -> Self {
        Self { select: self.select.unique() }
    }

    pub fn tuple(&self) -> Self {
        Self { select: self.select.tuple() }
    }

    pub fn bind(&self, bindings: Bindings) -> QueryResult<Self> {
        self.map_spec(|spec| spec.with_bindings(&bindings))
    }

    pub fn query_plan(&self) -> QueryResult<QueryPlan> {
        self.select.query_plan()
    }

    /// Groups as `(key, members)` pairs, in sorted order
    #[instrument(skip(self), fields(roots = self.spec().roots().len()))]
    pub fn all(&self) -> QueryResult<Groups> {
        let spec = &self.select.spec;
        let depth = spec.group_by().unwrap_or(1);
        let roots = spec.roots();
        let rows = sort_rows(joined_rows(self.select.base, spec)?, roots, spec.order_by())?
            .into_iter()
            .map(|(keys, row)| Ok((keys, project(&row, roots, spec.projection(), spec.is_tuple())?)))
            .collect::<QueryResult<Vec<(Vec<Value>, Output)>>>()?;
        Ok(Groups::new(rows, depth, spec.is_unique()))
    }

    /// Number of groups
    pub fn count(&self) -> QueryResult<usize> {
        Ok(self.all()?.count())
    }
}

/// A deletion over a fact base
pub struct Delete<'a> {
    base: &'a mut FactBase,
    spec: QuerySpec,
}

impl<'a> Delete<'a> {
    pub(crate) fn new(base: &'a mut FactBase, spec: QuerySpec) -> Self {
        Self { base, spec }
    }

    pub fn join(self, conditions: impl IntoIterator<Item = Condition>) -> QueryResult<Self> {
        let spec = self.spec.with_join(conditions)?;
        Ok(Self { spec, ..self })
    }

    pub fn where_(self, condition: Condition) -> QueryResult<Self> {
        let spec = self.spec.with_where(condition)?;
        Ok(Self { spec, ..self })
    }

    pub fn bind(self, bindings: Bindings) -> QueryResult<Self> {
        let spec = self.spec.with_bindings(&bindings)?;
        Ok(Self { spec, ..self })
    }

    /// The plan the deletion would match with, before placeholder binding
    pub fn query_plan(&self) -> QueryResult<QueryPlan> {
        plan_for(&*self.base, &self.spec)
    }

    /// Remove every record taking part in a match and return how many were
    /// removed. For a join every matched root record is removed. Without a
    /// filter or join the root's type is cleared.
    #[instrument(skip(self), fields(roots = self.spec.roots().len()))]
    pub fn execute(self) -> QueryResult<usize> {
        let roots = self.spec.roots();
        if let [root] = roots {
            if self.spec.where_clause().is_none() {
                let removed = match self.base.map_mut(root.type_id()) {
                    Some(map) => {
                        let n = map.len();
                        map.clear();
                        n
                    }
                    None => 0,
                };
                info!(removed, "Deleted all records of type");
                return Ok(removed);
            }
        }

        let mut doomed: Vec<FactSet> = vec![FactSet::new(); roots.len()];
        for row in joined_rows(self.base, &self.spec)? {
            for (set, record) in doomed.iter_mut().zip(row) {
                set.insert(record);
            }
        }

        let mut removed = 0;
        for record in doomed.iter().flat_map(FactSet::iter) {
            removed += usize::from(self.base.discard(record)?);
        }
        info!(removed, "Deleted matching records");
        Ok(removed)
    }
}
