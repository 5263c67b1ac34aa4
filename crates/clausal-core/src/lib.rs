#![allow(missing_docs)]
//! Core functionality for the Clausal fact base.
//!
//! This crate stores typed records grouped by record type, maintains ordered
//! field indexes over them, and answers declarative queries: filtered
//! selection, multi-type joins, ordering, grouping, projection and deletion.
//! Queries are planned against the available indexes and executed as lazy
//! nested-loop joins.

use tracing::{debug, instrument};

/// Condition trees for filters and joins
pub mod condition;
/// Engine configuration
pub mod config;
/// Error types for fact base and query operations
pub mod error;
/// Query execution: joins, ordering, grouping and projection
pub mod executor;
/// The fact base container and its set API
pub mod fact_base;
/// Ordered field indexes
pub mod fact_index;
/// Per-type record containers with indexes
pub mod fact_map;
/// Insertion-ordered record sets
pub mod fact_set;
/// Query placeholders and bindings
pub mod placeholder;
/// Join-order heuristics and query plans
pub mod planner;
/// Select, grouped select and delete builders
pub mod query;
/// Declarative query specifications
pub mod query_spec;
/// Fact text and JSON output
pub mod serialization;

pub use condition::{
    Comparison, ComparisonOp, Condition, Operand, and_, eq, func, ge, gt, le, lt, ne, not_, or_,
};
pub use config::{EngineConfig, FactTextConfig};
pub use error::{ErrorSeverity, QueryError, QueryResult, ResultExt};
pub use executor::{Group, Groups, JoinRows, Output};
pub use fact_base::{FactBase, FactBaseStats};
pub use fact_index::{FactIndex, FactIndexStats};
pub use fact_map::{FactMap, FactMapStats};
pub use fact_set::FactSet;
pub use placeholder::{Bindings, PH1, PH2, PH3, PH4, Placeholder, ph, ph_named, ph_named_default};
pub use planner::{IndexCatalog, IndexKey, IndexLookup, JoinKey, JoinOrder, JoinStage, QueryPlan};
pub use query::{Delete, GroupedSelect, Rows, Select};
pub use query_spec::{OrderBy, QuerySpec, asc, desc};

/// Initialize the core engine components
#[instrument]
pub fn init() -> anyhow::Result<()> {
    debug!("Initializing Clausal core");
    Ok(())
}
