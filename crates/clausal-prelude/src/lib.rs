//! Clausal Prelude
//!
//! This crate re-exports the most frequently used public items from the
//! Clausal workspace (currently `clausal-core` and `clausal-types`).
//! Applications can depend on `clausal-prelude` to avoid long import lists and
//! to stay insulated from internal module reshuffles.

#![deny(missing_docs)]

// Schema boundary -----------------------------------------------------------------------------

pub use clausal_types::{
    // Solver values
    Term, Value,
    // Record types and records
    Schema, RecordType, RecordTypeId, Record, FieldPath,
    // Field codecs
    TermCodec, IntegerCodec, StringCodec, ConstantCodec, RawCodec, ComplexCodec,
    SchemaError,
};

// Fact storage --------------------------------------------------------------------------------

pub use clausal_core::{EngineConfig, FactBase, FactMap, FactSet};

// Queries -------------------------------------------------------------------------------------

pub use clausal_core::{
    // Condition builders
    Condition, and_, eq, func, ge, gt, le, lt, ne, not_, or_,
    // Placeholders
    Bindings, PH1, PH2, PH3, PH4, ph, ph_named, ph_named_default,
    // Ordering and planning
    asc, desc, JoinOrder, QueryPlan,
    // Results and errors
    Output, QueryError, QueryResult,
};

// When new crates expose stable public APIs, add re-exports here in a backwards-compatible
// manner.
