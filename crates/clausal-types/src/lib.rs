//! Clausal Types
//!
//! This crate defines the schema boundary of the Clausal fact base: solver
//! terms, record types and their registry, field codecs, typed records and the
//! field paths used to address them. `clausal-core` builds its containers and
//! query engine on these types only.

#![warn(missing_docs)]

mod codec;
mod error;
mod path;
mod record;
mod schema;
mod term;
mod value;

pub use codec::{ComplexCodec, ConstantCodec, IntegerCodec, RawCodec, StringCodec, TermCodec};
pub use error::SchemaError;
pub use path::FieldPath;
pub use record::Record;
pub use schema::{FieldDef, RecordType, RecordTypeBuilder, RecordTypeId, Schema};
pub use term::Term;
pub use value::Value;
